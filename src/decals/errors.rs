//! Error taxonomy for decal lifecycle operations.
use std::fmt;

use bevy::prelude::Entity;

use crate::store::StoreError;

use super::types::{DecalId, PlayerId};

/// Request problems that abort a single operation and are reported to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    UnknownDecalType { decal_type_id: String },
    DecalNotFound { id: DecalId },
    MalformedVector { field: &'static str, raw: String },
    PlayerUnavailable { player: PlayerId },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDecalType { decal_type_id } => {
                write!(f, "unknown decal type '{}'", decal_type_id)
            }
            Self::DecalNotFound { id } => write!(f, "decal {} not found", id),
            Self::MalformedVector { field, raw } => {
                write!(f, "malformed {} '{}'", field, raw)
            }
            Self::PlayerUnavailable { player } => {
                write!(f, "player {} is not connected", player)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failures reported by the host engine when creating or removing entities.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    SpawnRejected { id: Option<DecalId>, reason: String },
    EntityMissing { entity: Entity },
}

impl HostError {
    pub fn spawn_rejected(id: Option<DecalId>, reason: impl Into<String>) -> Self {
        Self::SpawnRejected {
            id,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnRejected { id: Some(id), reason } => {
                write!(f, "host rejected spawn of decal {}: {}", id, reason)
            }
            Self::SpawnRejected { id: None, reason } => {
                write!(f, "host rejected decal spawn: {}", reason)
            }
            Self::EntityMissing { entity } => write!(f, "entity {:?} no longer exists", entity),
        }
    }
}

impl std::error::Error for HostError {}

/// Any failure raised while driving the decal lifecycle.
#[derive(Debug, Clone)]
pub enum DecalError {
    Validation(ValidationError),
    Persistence(StoreError),
    HostInterop(HostError),
}

impl DecalError {
    /// Chat line shown to the player who triggered the failing operation.
    pub fn player_message(&self, failed_action: &str) -> String {
        match self {
            Self::Validation(ValidationError::UnknownDecalType { .. }) => {
                "Invalid decal configuration.".to_string()
            }
            Self::Validation(ValidationError::DecalNotFound { .. }) => {
                "Decal not found.".to_string()
            }
            Self::Validation(_) | Self::Persistence(_) | Self::HostInterop(_) => {
                format!("Error {}. Please try again.", failed_action)
            }
        }
    }
}

impl fmt::Display for DecalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(error) => write!(f, "validation error: {}", error),
            Self::Persistence(error) => write!(f, "persistence error: {}", error),
            Self::HostInterop(error) => write!(f, "host error: {}", error),
        }
    }
}

impl std::error::Error for DecalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(error) => Some(error),
            Self::Persistence(error) => Some(error),
            Self::HostInterop(error) => Some(error),
        }
    }
}

impl From<ValidationError> for DecalError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for DecalError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

impl From<HostError> for DecalError {
    fn from(value: HostError) -> Self {
        Self::HostInterop(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreOperation;

    #[test]
    fn lookup_failures_get_specific_messages() {
        let unknown: DecalError = ValidationError::UnknownDecalType {
            decal_type_id: "ghost".into(),
        }
        .into();
        assert_eq!(unknown.player_message("placing decal"), "Invalid decal configuration.");

        let missing: DecalError = ValidationError::DecalNotFound {
            id: DecalId::new(4),
        }
        .into();
        assert_eq!(missing.player_message("repositioning decal"), "Decal not found.");
        assert!(missing.to_string().contains("#4"));
    }

    #[test]
    fn persistence_failures_suggest_retry() {
        let error: DecalError = StoreError::new(StoreOperation::Insert, "disk full").into();
        assert_eq!(
            error.player_message("placing decal"),
            "Error placing decal. Please try again."
        );
        assert!(error.to_string().contains("disk full"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn host_failures_are_generic_to_players() {
        let error: DecalError =
            HostError::spawn_rejected(Some(DecalId::new(3)), "precache missing").into();
        assert!(matches!(error, DecalError::HostInterop(_)));
        assert_eq!(
            error.player_message("updating decal"),
            "Error updating decal. Please try again."
        );
        assert_eq!(
            error.to_string(),
            "host error: host rejected spawn of decal #3: precache missing"
        );
    }
}
