//! Decals plugin wiring configuration, store, lifecycle resources, and systems.
use bevy::prelude::*;

use crate::{config::MapDecalsConfig, store::ActiveDecalStore};

use super::{
    controller::DecalLifecycleController,
    events::{
        DecalChatMessage, DecalMenuSelected, MapChanged, OpenDecalMenu, PlayerChatCommand,
        PlayerConnected, PlayerDisconnected, PlayerPinged, RoundStarted,
    },
    systems::{
        handle_chat_commands, handle_map_changes, handle_menu_selections, handle_pings,
        handle_player_connections, handle_round_starts, initialize_decal_store,
        process_store_jobs, shutdown_on_exit,
    },
    telemetry::{flush_decal_audit_log, DecalAuditLog},
    visibility::{refresh_decal_visibility, DecalVisibility},
};

/// Registers decal resources and systems. Config and store resources inserted
/// before the plugin are kept.
pub struct DecalsPlugin;

impl Plugin for DecalsPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<MapDecalsConfig>() {
            app.insert_resource(MapDecalsConfig::load_or_default());
        }
        let config = app.world().resource::<MapDecalsConfig>().clone();

        if !app.world().contains_resource::<ActiveDecalStore>() {
            app.insert_resource(ActiveDecalStore::from_config(&config.database));
        }
        if let Some(path) = &config.audit_log_path {
            if !app.world().contains_resource::<DecalAuditLog>() {
                app.insert_resource(DecalAuditLog::new(path));
            }
        }

        app.init_resource::<DecalLifecycleController>()
            .init_resource::<DecalVisibility>()
            .add_message::<RoundStarted>()
            .add_message::<MapChanged>()
            .add_message::<PlayerConnected>()
            .add_message::<PlayerDisconnected>()
            .add_message::<PlayerPinged>()
            .add_message::<PlayerChatCommand>()
            .add_message::<DecalMenuSelected>()
            .add_message::<DecalChatMessage>()
            .add_message::<OpenDecalMenu>()
            .add_systems(Startup, (initialize_decal_store, log_decal_catalog))
            .add_systems(
                Update,
                (
                    process_store_jobs,
                    handle_map_changes,
                    handle_round_starts,
                    handle_player_connections,
                    handle_chat_commands,
                    handle_menu_selections,
                    handle_pings,
                    refresh_decal_visibility,
                )
                    .chain(),
            )
            .add_systems(Last, (shutdown_on_exit, flush_decal_audit_log).chain());

        #[cfg(feature = "decals_debug")]
        {
            app.add_systems(PostUpdate, super::systems::log_decal_queue);
        }
    }
}

fn log_decal_catalog(config: Res<MapDecalsConfig>) {
    info!(
        target: "decals",
        "DecalsPlugin initialised with {} decal types (place: {}, toggle: {})",
        config.catalog.len(),
        config.commands.place.command,
        config.commands.toggle.command
    );
}
