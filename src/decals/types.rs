//! Shared identifiers and the persisted decal record.
use std::fmt;

use bevy::prelude::*;

use super::errors::ValidationError;

pub const DEFAULT_DECAL_DEPTH: i32 = 12;
pub const DEFAULT_DECAL_WIDTH: f32 = 128.0;
pub const DEFAULT_DECAL_HEIGHT: f32 = 128.0;

/// Store-assigned identifier of a placed decal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecalId(i64);

impl DecalId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DecalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable player identity as reported by the host (e.g. a SteamID64 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pitch/yaw/roll in degrees, Z-up, positive pitch looks down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl EulerAngles {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// World rotation for an entity facing along these angles.
    pub fn to_quat(self) -> Quat {
        Quat::from_euler(
            EulerRot::ZYX,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

/// Dimension that can be adjusted from the edit menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecalDimension {
    Width,
    Height,
    Depth,
}

impl DecalDimension {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Depth => "depth",
        }
    }

    /// Preset values offered to players for this dimension.
    pub const fn presets(&self) -> &'static [f32] {
        match self {
            Self::Width | Self::Height => &[64.0, 128.0, 256.0, 512.0],
            Self::Depth => &[4.0, 8.0, 12.0, 16.0, 24.0],
        }
    }
}

impl fmt::Display for DecalDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decal placed on a map, as persisted in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalRecord {
    /// `None` until the store has assigned an id on insert.
    pub id: Option<DecalId>,
    pub map: String,
    pub decal_type_id: String,
    pub name: String,
    pub position: Vec3,
    pub angles: EulerAngles,
    pub depth: i32,
    pub width: f32,
    pub height: f32,
    pub force_on_vip: bool,
    pub is_active: bool,
}

impl DecalRecord {
    /// Fresh record with default dimensions and flags, not yet persisted.
    pub fn new(
        map: impl Into<String>,
        decal_type_id: impl Into<String>,
        name: impl Into<String>,
        position: Vec3,
        angles: EulerAngles,
    ) -> Self {
        Self {
            id: None,
            map: map.into(),
            decal_type_id: decal_type_id.into(),
            name: name.into(),
            position,
            angles,
            depth: DEFAULT_DECAL_DEPTH,
            width: DEFAULT_DECAL_WIDTH,
            height: DEFAULT_DECAL_HEIGHT,
            force_on_vip: false,
            is_active: true,
        }
    }

    pub fn with_id(mut self, id: DecalId) -> Self {
        self.id = Some(id);
        self
    }

    /// Applies a dimension change. Depth is stored as an integer and truncates.
    pub fn set_dimension(&mut self, dimension: DecalDimension, value: f32) {
        match dimension {
            DecalDimension::Width => self.width = value,
            DecalDimension::Height => self.height = value,
            DecalDimension::Depth => self.depth = value.trunc() as i32,
        }
    }
}

/// Encodes a triple as the space separated `"x y z"` column format.
pub fn encode_triple(values: [f32; 3]) -> String {
    format!("{} {} {}", values[0], values[1], values[2])
}

/// Parses the `"x y z"` column format, rejecting partial or non-finite triples.
pub fn parse_triple(field: &'static str, raw: &str) -> Result<[f32; 3], ValidationError> {
    let malformed = || ValidationError::MalformedVector {
        field,
        raw: raw.to_string(),
    };

    let mut parts = raw.split_whitespace();
    let mut values = [0.0_f32; 3];
    for slot in values.iter_mut() {
        let part = parts.next().ok_or_else(malformed)?;
        let value = part.parse::<f32>().map_err(|_| malformed())?;
        if !value.is_finite() {
            return Err(malformed());
        }
        *slot = value;
    }

    if parts.next().is_some() {
        return Err(malformed());
    }

    Ok(values)
}

pub fn encode_position(position: Vec3) -> String {
    encode_triple(position.to_array())
}

pub fn encode_angles(angles: EulerAngles) -> String {
    encode_triple([angles.pitch, angles.yaw, angles.roll])
}

pub fn parse_position(raw: &str) -> Result<Vec3, ValidationError> {
    parse_triple("position", raw).map(Vec3::from_array)
}

pub fn parse_angles(raw: &str) -> Result<EulerAngles, ValidationError> {
    parse_triple("angles", raw).map(|[pitch, yaw, roll]| EulerAngles::new(pitch, yaw, roll))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triples_survive_the_column_format() {
        let position = Vec3::new(98.58579, 198.60728, 50.347296);
        let encoded = encode_position(position);
        assert_eq!(parse_position(&encoded).unwrap(), position);

        let angles = EulerAngles::new(100.0, 45.0, 0.0);
        assert_eq!(encode_angles(angles), "100 45 0");
        assert_eq!(parse_angles("100 45 0").unwrap(), angles);
    }

    #[test]
    fn rejects_partial_and_non_finite_triples() {
        for raw in ["", "1 2", "1 2 3 4", "1 two 3", "NaN 0 0", "inf 0 0"] {
            let error = parse_position(raw).expect_err("triple should be rejected");
            assert!(matches!(
                error,
                ValidationError::MalformedVector {
                    field: "position",
                    ..
                }
            ));
        }
    }

    #[test]
    fn depth_truncates_fractional_presets() {
        let mut record = DecalRecord::new(
            "de_dust2",
            "poster",
            "Poster",
            Vec3::ZERO,
            EulerAngles::ZERO,
        );
        record.set_dimension(DecalDimension::Depth, 16.9);
        assert_eq!(record.depth, 16);

        record.set_dimension(DecalDimension::Width, 256.5);
        assert_eq!(record.width, 256.5);
    }

    #[test]
    fn new_records_use_defaults() {
        let record = DecalRecord::new("de_inferno", "poster", "Poster", Vec3::ONE, EulerAngles::ZERO);
        assert_eq!(record.id, None);
        assert_eq!(record.depth, DEFAULT_DECAL_DEPTH);
        assert_eq!(record.width, 128.0);
        assert_eq!(record.height, 128.0);
        assert!(!record.force_on_vip);
        assert!(record.is_active);
    }
}
