//! Per-player interaction mode: what the next ping from a player means.
use std::collections::HashMap;

use super::types::{DecalId, PlayerId};

/// Pending action for a player's next ping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    AwaitingPlacement { decal_type_id: String },
    AwaitingReposition { decal_id: DecalId },
}

/// Tracks at most one pending mode per connected player.
#[derive(Debug, Default)]
pub struct PlayerModeTracker {
    modes: HashMap<PlayerId, InteractionMode>,
}

impl PlayerModeTracker {
    /// Replaces any pending mode with a placement of `decal_type_id`.
    pub fn set_placement(&mut self, player: &PlayerId, decal_type_id: impl Into<String>) {
        self.modes.insert(
            player.clone(),
            InteractionMode::AwaitingPlacement {
                decal_type_id: decal_type_id.into(),
            },
        );
    }

    /// Replaces any pending mode with a reposition of `decal_id`.
    pub fn set_reposition(&mut self, player: &PlayerId, decal_id: DecalId) {
        self.modes
            .insert(player.clone(), InteractionMode::AwaitingReposition { decal_id });
    }

    /// Returns the pending mode and resets the player to idle.
    pub fn consume(&mut self, player: &PlayerId) -> InteractionMode {
        self.modes.remove(player).unwrap_or_default()
    }

    pub fn peek(&self, player: &PlayerId) -> Option<&InteractionMode> {
        self.modes.get(player)
    }

    pub fn clear(&mut self, player: &PlayerId) {
        self.modes.remove(player);
    }

    pub fn clear_all(&mut self) {
        self.modes.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.modes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_mode_wins() {
        let mut tracker = PlayerModeTracker::default();
        let player = PlayerId::new("1");
        tracker.set_placement(&player, "poster");
        tracker.set_reposition(&player, DecalId::new(9));

        assert_eq!(
            tracker.consume(&player),
            InteractionMode::AwaitingReposition {
                decal_id: DecalId::new(9)
            }
        );
        assert_eq!(tracker.consume(&player), InteractionMode::Idle);
    }

    #[test]
    fn modes_are_per_player_and_cleared_on_disconnect() {
        let mut tracker = PlayerModeTracker::default();
        let first = PlayerId::new("1");
        let second = PlayerId::new("2");
        tracker.set_placement(&first, "poster");
        tracker.set_placement(&second, "banner");
        assert_eq!(tracker.pending_count(), 2);

        tracker.clear(&first);
        assert_eq!(tracker.consume(&first), InteractionMode::Idle);
        assert_eq!(
            tracker.peek(&second),
            Some(&InteractionMode::AwaitingPlacement {
                decal_type_id: "banner".into()
            })
        );

        tracker.clear_all();
        assert_eq!(tracker.pending_count(), 0);
    }
}
