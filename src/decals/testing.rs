//! Test doubles shared by the decal module tests.
use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::config::{DecalCatalog, DecalTypeConfig};

use super::{
    errors::HostError,
    host::{DecalHost, DecalSpawn, PlayerState},
    menu::DecalMenu,
    types::{DecalId, DecalRecord, EulerAngles, PlayerId},
};

pub fn catalog() -> DecalCatalog {
    DecalCatalog::new(vec![
        DecalTypeConfig {
            id: "poster".into(),
            name: "Poster".into(),
            material: "materials/decals/poster.vmat".into(),
            show_permission: String::new(),
        },
        DecalTypeConfig {
            id: "vip_banner".into(),
            name: "VIP Banner".into(),
            material: "materials/decals/vip.vmat".into(),
            show_permission: "@css/vip".into(),
        },
    ])
}

pub fn record(id: i64, map: &str) -> DecalRecord {
    DecalRecord::new(
        map,
        "poster",
        "Poster",
        Vec3::new(id as f32, 0.0, 0.0),
        EulerAngles::ZERO,
    )
    .with_id(DecalId::new(id))
}

/// Host that mints entities from a private world and records every call.
#[derive(Default)]
pub struct RecordingHost {
    pub(crate) world: World,
    pub(crate) live: HashSet<Entity>,
    pub spawned: Vec<(DecalId, Entity)>,
    pub removed: Vec<Entity>,
    pub players: HashMap<PlayerId, (PlayerState, HashSet<String>)>,
    pub messages: Vec<(PlayerId, String)>,
    pub menus: Vec<(PlayerId, DecalMenu)>,
    pub reject_spawns: bool,
}

impl RecordingHost {
    pub fn with_player(
        mut self,
        player: &PlayerId,
        alive: bool,
        eye_angles: EulerAngles,
        permissions: &[&str],
    ) -> Self {
        self.players.insert(
            player.clone(),
            (
                PlayerState {
                    alive,
                    eye_angles: Some(eye_angles),
                },
                permissions.iter().map(|flag| flag.to_string()).collect(),
            ),
        );
        self
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn texts_for(&self, player: &PlayerId) -> Vec<String> {
        self.messages
            .iter()
            .filter(|(to, _)| to == player)
            .map(|(_, text)| text.trim_start().trim_start_matches("[MapDecals] ").to_string())
            .collect()
    }

    pub fn last_text(&self, player: &PlayerId) -> Option<String> {
        self.texts_for(player).pop()
    }

    pub fn last_menu(&self, player: &PlayerId) -> Option<&DecalMenu> {
        self.menus
            .iter()
            .rev()
            .find(|(to, _)| to == player)
            .map(|(_, menu)| menu)
    }
}

impl DecalHost for RecordingHost {
    fn spawn_decal(&mut self, spawn: &DecalSpawn<'_>) -> Result<Entity, HostError> {
        if self.reject_spawns {
            return Err(HostError::spawn_rejected(Some(spawn.id), "rejected by test host"));
        }
        let entity = self.world.spawn_empty().id();
        self.live.insert(entity);
        self.spawned.push((spawn.id, entity));
        Ok(entity)
    }

    fn remove_decal(&mut self, entity: Entity) -> Result<(), HostError> {
        if self.live.remove(&entity) {
            self.removed.push(entity);
            Ok(())
        } else {
            Err(HostError::EntityMissing { entity })
        }
    }

    fn player_state(&self, player: &PlayerId) -> Option<PlayerState> {
        self.players.get(player).map(|(state, _)| *state)
    }

    fn has_permission(&self, player: &PlayerId, permission: &str) -> bool {
        self.players
            .get(player)
            .is_some_and(|(_, flags)| flags.contains(permission) || flags.contains("@css/root"))
    }

    fn send_message(&mut self, player: &PlayerId, text: String) {
        self.messages.push((player.clone(), text));
    }

    fn open_menu(&mut self, player: &PlayerId, menu: DecalMenu) {
        self.menus.push((player.clone(), menu));
    }
}
