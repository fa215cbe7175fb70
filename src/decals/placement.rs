//! Converts a ping location and the viewer's aim into a decal transform.
use bevy::prelude::Vec3;

use super::types::EulerAngles;

/// Distance the decal is pulled back from the pinged point towards the viewer.
pub const PING_BACKOFF_UNITS: f32 = 2.0;

/// Forward vectors steeper than this (looking down) place the decal flat on the floor.
pub const FLOOR_FORWARD_Z_THRESHOLD: f32 = -0.90;

/// Unit vector the viewer is looking along.
pub fn forward_vector(viewer: EulerAngles) -> Vec3 {
    let pitch = viewer.pitch.to_radians();
    let yaw = viewer.yaw.to_radians();
    Vec3::new(yaw.cos() * pitch.cos(), yaw.sin() * pitch.cos(), -pitch.sin())
}

/// Returns the decal position and orientation for a ping seen from `viewer`.
pub fn compute_placement(ping: Vec3, viewer: EulerAngles) -> (Vec3, EulerAngles) {
    let forward = forward_vector(viewer);
    let position = ping - forward * PING_BACKOFF_UNITS;

    let angles = if forward.z < FLOOR_FORWARD_Z_THRESHOLD {
        EulerAngles::new(0.0, viewer.yaw, 0.0)
    } else {
        EulerAngles::new(viewer.pitch + 90.0, viewer.yaw, 0.0)
    };

    (position, angles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_orientations() -> Vec<EulerAngles> {
        let mut samples = Vec::new();
        for pitch in (-89..=89).step_by(7) {
            for yaw in (-180..=180).step_by(30) {
                samples.push(EulerAngles::new(pitch as f32, yaw as f32, 15.0));
            }
        }
        samples
    }

    #[test]
    fn steep_downward_aim_lays_decal_on_floor() {
        for viewer in sample_orientations() {
            if forward_vector(viewer).z >= FLOOR_FORWARD_Z_THRESHOLD {
                continue;
            }
            let (_, angles) = compute_placement(Vec3::ZERO, viewer);
            assert_eq!(angles, EulerAngles::new(0.0, viewer.yaw, 0.0));
        }
    }

    #[test]
    fn other_aims_stand_decal_against_wall() {
        for viewer in sample_orientations() {
            if forward_vector(viewer).z < FLOOR_FORWARD_Z_THRESHOLD {
                continue;
            }
            let (_, angles) = compute_placement(Vec3::ZERO, viewer);
            assert_eq!(angles.pitch, viewer.pitch + 90.0);
            assert_eq!(angles.yaw, viewer.yaw);
            assert_eq!(angles.roll, 0.0);
        }
    }

    #[test]
    fn position_backs_off_along_forward() {
        let ping = Vec3::new(-512.25, 1024.5, 64.0);
        for viewer in sample_orientations() {
            let (position, _) = compute_placement(ping, viewer);
            assert_eq!(position, ping - forward_vector(viewer) * 2.0);
        }
    }

    #[test]
    fn threshold_boundary_is_treated_as_wall() {
        // sin(64.158°) ≈ 0.9; pick angles either side of it.
        let (_, wall) = compute_placement(Vec3::ZERO, EulerAngles::new(60.0, 10.0, 0.0));
        assert_eq!(wall.pitch, 150.0);

        let (_, floor) = compute_placement(Vec3::ZERO, EulerAngles::new(70.0, 10.0, 0.0));
        assert_eq!(floor, EulerAngles::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn poster_scenario_lands_against_wall() {
        let ping = Vec3::new(100.0, 200.0, 50.0);
        let viewer = EulerAngles::new(10.0, 45.0, 0.0);
        let (position, angles) = compute_placement(ping, viewer);

        assert_eq!(angles, EulerAngles::new(100.0, 45.0, 0.0));
        assert!((position.x - 98.607).abs() < 1e-3);
        assert!((position.y - 198.607).abs() < 1e-3);
        assert!((position.z - 50.347).abs() < 1e-3);
    }
}
