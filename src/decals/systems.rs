//! Systems bridging host messages into the decal lifecycle.
use bevy::prelude::*;

use crate::{config::MapDecalsConfig, store::ActiveDecalStore};

use super::{
    controller::DecalLifecycleController,
    events::{
        DecalMenuSelected, MapChanged, PlayerChatCommand, PlayerConnected, PlayerDisconnected,
        PlayerPinged, RoundStarted,
    },
    host::BevyDecalHost,
    telemetry::DecalAuditLog,
};

pub fn initialize_decal_store(store: Res<ActiveDecalStore>) {
    match store.store().initialize_schema() {
        Ok(()) => info!(
            target: "decals",
            "Decal store ready (backend: {})",
            store.backend_name()
        ),
        Err(err) => error!(target: "decals", "Failed to initialise decal schema: {}", err),
    }
}

/// Runs store jobs queued during the previous tick and applies their outcomes.
pub fn process_store_jobs(
    mut controller: ResMut<DecalLifecycleController>,
    store: Res<ActiveDecalStore>,
    config: Res<MapDecalsConfig>,
    mut host: BevyDecalHost,
    time: Option<Res<Time>>,
    audit_log: Option<ResMut<DecalAuditLog>>,
) {
    if controller.pending_jobs() == 0 {
        return;
    }

    let audit = controller.process_jobs(store.store(), &mut host, &config.catalog);
    if let Some(mut log) = audit_log {
        let now = time.map_or(0.0, |time| time.elapsed_secs_f64());
        for entry in audit {
            log.push(now, entry);
        }
    }
}

pub fn handle_map_changes(
    mut events: MessageReader<MapChanged>,
    mut controller: ResMut<DecalLifecycleController>,
    mut host: BevyDecalHost,
) {
    for event in events.read() {
        controller.on_map_change(&event.map_name, &mut host);
    }
}

pub fn handle_round_starts(
    mut events: MessageReader<RoundStarted>,
    mut controller: ResMut<DecalLifecycleController>,
    config: Res<MapDecalsConfig>,
    mut host: BevyDecalHost,
) {
    // Several round starts in one frame collapse into one respawn.
    if events.read().count() == 0 {
        return;
    }
    controller.on_round_start(&mut host, &config.catalog);
}

pub fn handle_player_connections(
    mut connected: MessageReader<PlayerConnected>,
    mut disconnected: MessageReader<PlayerDisconnected>,
    mut controller: ResMut<DecalLifecycleController>,
) {
    for event in connected.read() {
        controller.on_player_connected(&event.player, event.is_bot);
    }
    for event in disconnected.read() {
        controller.on_player_disconnected(&event.player);
    }
}

pub fn handle_chat_commands(
    mut events: MessageReader<PlayerChatCommand>,
    mut controller: ResMut<DecalLifecycleController>,
    config: Res<MapDecalsConfig>,
    mut host: BevyDecalHost,
) {
    for event in events.read() {
        controller.handle_chat_command(&event.player, &event.command, &mut host, &config);
    }
}

pub fn handle_menu_selections(
    mut events: MessageReader<DecalMenuSelected>,
    mut controller: ResMut<DecalLifecycleController>,
    config: Res<MapDecalsConfig>,
    mut host: BevyDecalHost,
) {
    for event in events.read() {
        controller.handle_menu_action(&event.player, event.action.clone(), &mut host, &config);
    }
}

pub fn handle_pings(
    mut events: MessageReader<PlayerPinged>,
    mut controller: ResMut<DecalLifecycleController>,
    config: Res<MapDecalsConfig>,
    mut host: BevyDecalHost,
) {
    for event in events.read() {
        controller.on_ping(&event.player, event.position, &mut host, &config.catalog);
    }
}

/// Despawns every decal once the app is asked to exit.
pub fn shutdown_on_exit(
    mut exits: MessageReader<AppExit>,
    mut controller: ResMut<DecalLifecycleController>,
    mut host: BevyDecalHost,
) {
    if exits.read().count() == 0 {
        return;
    }
    controller.shutdown(&mut host);
}

#[cfg(feature = "decals_debug")]
pub fn log_decal_queue(controller: Res<DecalLifecycleController>) {
    if !controller.is_changed() {
        return;
    }
    let metrics = controller.job_queue().metrics();
    info!(
        target: "decals_debug",
        "map: {:?} | decals: {} | spawned: {} | jobs queued: {} done: {} failed: {}",
        controller.current_map(),
        controller.registry().records().len(),
        controller.registry().spawned_count(),
        metrics.enqueued,
        metrics.completed,
        metrics.failed,
    );
}
