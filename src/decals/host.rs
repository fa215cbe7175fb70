//! Host engine seam: entity spawning, player lookups, and chat/menu output.
use std::collections::HashSet;

use bevy::{ecs::system::SystemParam, prelude::*};

use super::{
    errors::HostError,
    events::{DecalChatMessage, OpenDecalMenu},
    menu::DecalMenu,
    types::{DecalId, EulerAngles, PlayerId},
};

/// Permission flag that implies every other flag.
pub const ROOT_PERMISSION: &str = "@css/root";

/// Chat prefix shared by every message this plugin prints.
pub const CHAT_PREFIX: &str = " [MapDecals] ";

/// Everything the host needs to create one decal entity.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalSpawn<'a> {
    pub id: DecalId,
    pub material: &'a str,
    pub position: Vec3,
    pub angles: EulerAngles,
    pub width: f32,
    pub height: f32,
    pub depth: i32,
}

/// Live state of a connected player as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub alive: bool,
    pub eye_angles: Option<EulerAngles>,
}

/// Operations the decal lifecycle consumes from the host engine.
pub trait DecalHost {
    fn spawn_decal(&mut self, spawn: &DecalSpawn<'_>) -> Result<Entity, HostError>;

    fn remove_decal(&mut self, entity: Entity) -> Result<(), HostError>;

    fn player_state(&self, player: &PlayerId) -> Option<PlayerState>;

    fn has_permission(&self, player: &PlayerId, permission: &str) -> bool;

    fn send_message(&mut self, player: &PlayerId, text: String);

    fn open_menu(&mut self, player: &PlayerId, menu: DecalMenu);

    /// Empty permissions are unrestricted.
    fn allows(&self, player: &PlayerId, permission: &str) -> bool {
        permission.is_empty() || self.has_permission(player, permission)
    }

    fn notify(&mut self, player: &PlayerId, text: impl AsRef<str>)
    where
        Self: Sized,
    {
        self.send_message(player, format!("{CHAT_PREFIX}{}", text.as_ref()));
    }
}

/// Identifies the connected player an entity represents.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity(pub PlayerId);

/// Marker for players whose pawn is alive.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Alive;

/// Current view angles of the player's pawn.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct EyeAngles(pub EulerAngles);

/// Admin flags granted to a player.
#[derive(Component, Debug, Clone, Default)]
pub struct PlayerPermissions {
    flags: HashSet<String>,
}

impl PlayerPermissions {
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn grants(&self, permission: &str) -> bool {
        self.flags.contains(permission) || self.flags.contains(ROOT_PERMISSION)
    }
}

/// Marks an entity spawned for a stored decal.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDecalEntity {
    pub id: DecalId,
}

/// Projection parameters the renderer applies to a decal entity.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct DecalProjection {
    pub material: String,
    pub width: f32,
    pub height: f32,
    pub depth: i32,
}

/// `DecalHost` backed by the Bevy world the plugin runs in.
#[derive(SystemParam)]
pub struct BevyDecalHost<'w, 's> {
    commands: Commands<'w, 's>,
    players: Query<
        'w,
        's,
        (
            &'static PlayerIdentity,
            Has<Alive>,
            Option<&'static EyeAngles>,
            Option<&'static PlayerPermissions>,
        ),
    >,
    chat: MessageWriter<'w, DecalChatMessage>,
    menus: MessageWriter<'w, OpenDecalMenu>,
}

impl BevyDecalHost<'_, '_> {
    pub fn connected_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .map(|(identity, ..)| identity.0.clone())
            .collect()
    }
}

impl DecalHost for BevyDecalHost<'_, '_> {
    fn spawn_decal(&mut self, spawn: &DecalSpawn<'_>) -> Result<Entity, HostError> {
        if spawn.material.is_empty() {
            return Err(HostError::spawn_rejected(Some(spawn.id), "no material"));
        }
        if !spawn.position.is_finite() || !spawn.angles.is_finite() {
            return Err(HostError::spawn_rejected(
                Some(spawn.id),
                "non-finite transform",
            ));
        }

        let entity = self
            .commands
            .spawn((
                Name::new(format!("Map decal {}", spawn.id)),
                MapDecalEntity { id: spawn.id },
                DecalProjection {
                    material: spawn.material.to_string(),
                    width: spawn.width,
                    height: spawn.height,
                    depth: spawn.depth,
                },
                Transform::from_translation(spawn.position).with_rotation(spawn.angles.to_quat()),
                Visibility::Visible,
            ))
            .id();
        Ok(entity)
    }

    fn remove_decal(&mut self, entity: Entity) -> Result<(), HostError> {
        match self.commands.get_entity(entity) {
            Ok(mut entity_commands) => {
                entity_commands.despawn();
                Ok(())
            }
            Err(_) => Err(HostError::EntityMissing { entity }),
        }
    }

    fn player_state(&self, player: &PlayerId) -> Option<PlayerState> {
        self.players
            .iter()
            .find(|(identity, ..)| identity.0 == *player)
            .map(|(_, alive, eye_angles, _)| PlayerState {
                alive,
                eye_angles: eye_angles.map(|angles| angles.0),
            })
    }

    fn has_permission(&self, player: &PlayerId, permission: &str) -> bool {
        self.players
            .iter()
            .find(|(identity, ..)| identity.0 == *player)
            .and_then(|(.., permissions)| permissions)
            .is_some_and(|permissions| permissions.grants(permission))
    }

    fn send_message(&mut self, player: &PlayerId, text: String) {
        self.chat.write(DecalChatMessage {
            player: player.clone(),
            text,
        });
    }

    fn open_menu(&mut self, player: &PlayerId, menu: DecalMenu) {
        self.menus.write(OpenDecalMenu {
            player: player.clone(),
            menu,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_flag_grants_everything() {
        let root = PlayerPermissions::new([ROOT_PERMISSION]);
        assert!(root.grants("@css/vip"));

        let vip = PlayerPermissions::new(["@css/vip"]);
        assert!(vip.grants("@css/vip"));
        assert!(!vip.grants("@css/generic"));
    }

    #[derive(Resource, Default)]
    struct Probe {
        spawned: Option<Entity>,
        rejected: Option<HostError>,
        state: Option<PlayerState>,
        allowed: Vec<bool>,
    }

    fn exercise_host(mut host: BevyDecalHost, mut probe: ResMut<Probe>) {
        let player = PlayerId::new("76561198000000010");
        probe.state = host.player_state(&player);
        probe.allowed = vec![
            host.allows(&player, ""),
            host.allows(&player, "@css/vip"),
            host.allows(&player, "@css/root"),
        ];

        let spawn = DecalSpawn {
            id: DecalId::new(3),
            material: "materials/decals/poster.vmat",
            position: Vec3::new(1.0, 2.0, 3.0),
            angles: EulerAngles::new(100.0, 45.0, 0.0),
            width: 128.0,
            height: 64.0,
            depth: 12,
        };
        probe.spawned = host.spawn_decal(&spawn).ok();
        probe.rejected = host
            .spawn_decal(&DecalSpawn {
                material: "",
                ..spawn
            })
            .err();
        host.notify(&player, "hello");
    }

    #[test]
    fn bevy_host_spawns_entities_and_reads_players() {
        let mut app = App::new();
        app.add_message::<DecalChatMessage>()
            .add_message::<OpenDecalMenu>()
            .init_resource::<Probe>()
            .add_systems(Update, exercise_host);
        app.world_mut().spawn((
            PlayerIdentity(PlayerId::new("76561198000000010")),
            Alive,
            EyeAngles(EulerAngles::new(10.0, 45.0, 0.0)),
            PlayerPermissions::new(["@css/vip"]),
        ));

        app.update();

        let probe = app.world().resource::<Probe>();
        assert_eq!(
            probe.state,
            Some(PlayerState {
                alive: true,
                eye_angles: Some(EulerAngles::new(10.0, 45.0, 0.0)),
            })
        );
        assert_eq!(probe.allowed, vec![true, true, false]);
        assert!(matches!(
            probe.rejected,
            Some(HostError::SpawnRejected { .. })
        ));

        let entity = probe.spawned.expect("decal entity spawned");
        let world = app.world();
        assert_eq!(
            world.get::<MapDecalEntity>(entity),
            Some(&MapDecalEntity {
                id: DecalId::new(3)
            })
        );
        assert_eq!(world.get::<DecalProjection>(entity).unwrap().height, 64.0);
        assert_eq!(
            world.get::<Transform>(entity).unwrap().translation,
            Vec3::new(1.0, 2.0, 3.0)
        );
    }
}
