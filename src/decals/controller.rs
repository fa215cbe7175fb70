//! Orchestrates placement, edits, and map loads across the store, the
//! registry, and the host.
//!
//! Handlers validate and enqueue owned [`StoreJob`]s. [`process_jobs`] runs them
//! on the next tick and applies each outcome, so the registry only changes once
//! the store call has succeeded.
//!
//! [`process_jobs`]: DecalLifecycleController::process_jobs
use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::{
    config::{DecalCatalog, MapDecalsConfig},
    store::DecalStore,
};

use super::{
    errors::{DecalError, ValidationError},
    host::DecalHost,
    jobs::{execute, DecalEdit, StoreJob, StoreJobQueue, StoreOutcome},
    menu::{self, DecalMenuAction},
    mode::{InteractionMode, PlayerModeTracker},
    placement::compute_placement,
    registry::ActiveDecalRegistry,
    telemetry::{DecalAuditAction, DecalAuditEntry},
    types::{DecalDimension, DecalId, DecalRecord, EulerAngles, PlayerId},
};

const NO_PERMISSION: &str = "You don't have permission to use this command.";
const MUST_BE_ALIVE: &str = "You must be alive to place decals.";
const DECAL_NOT_FOUND: &str = "Decal not found.";

#[derive(Resource, Debug, Default)]
pub struct DecalLifecycleController {
    registry: ActiveDecalRegistry,
    modes: PlayerModeTracker,
    preferences: HashMap<PlayerId, bool>,
    awaiting_preference: HashSet<PlayerId>,
    current_map: Option<String>,
    jobs: StoreJobQueue,
}

impl DecalLifecycleController {
    pub fn current_map(&self) -> Option<&str> {
        self.current_map.as_deref()
    }

    pub fn registry(&self) -> &ActiveDecalRegistry {
        &self.registry
    }

    pub fn mode(&self, player: &PlayerId) -> Option<&InteractionMode> {
        self.modes.peek(player)
    }

    /// Cached visibility preference, enabled unless the player turned decals off.
    pub fn preference(&self, player: &PlayerId) -> bool {
        self.preferences.get(player).copied().unwrap_or(true)
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.queue_depth()
    }

    pub fn job_queue(&self) -> &StoreJobQueue {
        &self.jobs
    }

    /// Dispatches a chat command. Returns `false` when it is not one of ours.
    pub fn handle_chat_command<H: DecalHost>(
        &mut self,
        player: &PlayerId,
        command: &str,
        host: &mut H,
        config: &MapDecalsConfig,
    ) -> bool {
        let commands = &config.commands;
        if commands.place.matches(command) {
            if !host.allows(player, &commands.place.permission) {
                host.notify(player, NO_PERMISSION);
            } else if require_alive(host, player) {
                host.open_menu(player, menu::main_menu());
            }
            true
        } else if commands.toggle.matches(command) {
            if host.allows(player, &commands.toggle.permission) {
                self.toggle_preference(player);
            } else {
                host.notify(player, NO_PERMISSION);
            }
            true
        } else {
            false
        }
    }

    /// Routes a menu selection. Every menu action needs the place permission.
    pub fn handle_menu_action<H: DecalHost>(
        &mut self,
        player: &PlayerId,
        action: DecalMenuAction,
        host: &mut H,
        config: &MapDecalsConfig,
    ) {
        if !host.allows(player, &config.commands.place.permission) {
            host.notify(player, NO_PERMISSION);
            return;
        }

        match action {
            DecalMenuAction::OpenMainMenu => host.open_menu(player, menu::main_menu()),
            DecalMenuAction::OpenPlaceMenu => {
                let place = menu::place_menu(&config.catalog, |permission| {
                    host.has_permission(player, permission)
                });
                host.open_menu(player, place);
            }
            DecalMenuAction::OpenEditList => self.open_edit_list(player, host),
            DecalMenuAction::OpenEditDecal(id) => self.open_edit_menu(player, id, host),
            DecalMenuAction::SelectDecalType(decal_type_id) => {
                self.request_placement(player, &decal_type_id, host, config)
            }
            DecalMenuAction::Reposition(id) => self.request_reposition(player, id, host),
            DecalMenuAction::OpenDimension(id, dimension) => {
                if self.registry.get(id).is_some() {
                    host.open_menu(player, menu::dimension_menu(id, dimension));
                } else {
                    host.notify(player, DECAL_NOT_FOUND);
                }
            }
            DecalMenuAction::SetDimension(id, dimension, value) => {
                self.set_dimension(player, id, dimension, value, host)
            }
            DecalMenuAction::ToggleForceOnVip(id) => self.toggle_force_on_vip(player, id, host),
            DecalMenuAction::ToggleActive(id) => self.toggle_active(player, id, host),
            DecalMenuAction::Delete(id) => self.delete(player, id, host),
        }
    }

    /// Arms placement of `decal_type_id` at the player's next ping.
    pub fn request_placement<H: DecalHost>(
        &mut self,
        player: &PlayerId,
        decal_type_id: &str,
        host: &mut H,
        config: &MapDecalsConfig,
    ) {
        if !host.allows(player, &config.commands.place.permission) {
            host.notify(player, NO_PERMISSION);
            return;
        }
        if !require_alive(host, player) {
            return;
        }

        self.modes.set_placement(player, decal_type_id);
        host.notify(player, "Ping where you want to place the decal.");
    }

    /// Arms a move of decal `id` to the player's next ping.
    pub fn request_reposition<H: DecalHost>(&mut self, player: &PlayerId, id: DecalId, host: &mut H) {
        if self.registry.get(id).is_none() {
            host.notify(player, DECAL_NOT_FOUND);
            return;
        }
        self.modes.set_reposition(player, id);
        host.notify(player, "Ping the new location for the decal.");
    }

    /// Consumes the player's pending mode and acts on the pinged location.
    pub fn on_ping<H: DecalHost>(
        &mut self,
        player: &PlayerId,
        ping: Vec3,
        host: &mut H,
        catalog: &DecalCatalog,
    ) {
        match self.modes.consume(player) {
            InteractionMode::Idle => {}
            InteractionMode::AwaitingPlacement { decal_type_id } => {
                self.place_at(player, &decal_type_id, ping, host, catalog)
            }
            InteractionMode::AwaitingReposition { decal_id } => {
                self.reposition_to(player, decal_id, ping, host)
            }
        }
    }

    fn place_at<H: DecalHost>(
        &mut self,
        player: &PlayerId,
        decal_type_id: &str,
        ping: Vec3,
        host: &mut H,
        catalog: &DecalCatalog,
    ) {
        let Some(decal_type) = catalog.get(decal_type_id) else {
            let error = DecalError::from(ValidationError::UnknownDecalType {
                decal_type_id: decal_type_id.to_string(),
            });
            warn!(target: "decals", "Placement by {} aborted: {}", player, error);
            host.notify(player, error.player_message("placing decal"));
            return;
        };
        let Some(map) = self.current_map.clone() else {
            warn!(target: "decals", "Placement by {} before any map was loaded", player);
            host.notify(player, "Error placing decal. Please try again.");
            return;
        };

        let (position, angles) = compute_placement(ping, eye_angles(host, player));
        let record = DecalRecord::new(map, &decal_type.id, &decal_type.name, position, angles);
        self.jobs.enqueue(StoreJob::Insert {
            record,
            requested_by: player.clone(),
        });
    }

    fn reposition_to<H: DecalHost>(&mut self, player: &PlayerId, id: DecalId, ping: Vec3, host: &mut H) {
        if self.registry.get(id).is_none() {
            host.notify(player, DECAL_NOT_FOUND);
            return;
        }

        let (position, angles) = compute_placement(ping, eye_angles(host, player));
        self.enqueue_update(player, id, DecalEdit::Reposition { position, angles });
    }

    pub fn set_dimension<H: DecalHost>(
        &mut self,
        player: &PlayerId,
        id: DecalId,
        dimension: DecalDimension,
        value: f32,
        host: &mut H,
    ) {
        self.edit(player, id, host, DecalEdit::Resize { dimension, value });
    }

    pub fn toggle_force_on_vip<H: DecalHost>(&mut self, player: &PlayerId, id: DecalId, host: &mut H) {
        self.edit(player, id, host, DecalEdit::ToggleForceOnVip);
    }

    pub fn toggle_active<H: DecalHost>(&mut self, player: &PlayerId, id: DecalId, host: &mut H) {
        self.edit(player, id, host, DecalEdit::ToggleActive);
    }

    fn edit<H: DecalHost>(
        &mut self,
        player: &PlayerId,
        id: DecalId,
        host: &mut H,
        edit: DecalEdit,
    ) {
        if self.registry.get(id).is_none() {
            host.notify(player, DECAL_NOT_FOUND);
            return;
        }
        self.enqueue_update(player, id, edit);
    }

    fn enqueue_update(&mut self, player: &PlayerId, id: DecalId, edit: DecalEdit) {
        self.jobs.enqueue(StoreJob::Update {
            id,
            edit,
            requested_by: player.clone(),
        });
    }

    pub fn delete<H: DecalHost>(&mut self, player: &PlayerId, id: DecalId, host: &mut H) {
        if self.registry.get(id).is_none() {
            host.notify(player, DECAL_NOT_FOUND);
            return;
        }
        self.jobs.enqueue(StoreJob::Delete {
            id,
            requested_by: player.clone(),
        });
    }

    /// Respawns every active decal after the host reset its entities.
    pub fn on_round_start<H: DecalHost>(&mut self, host: &mut H, catalog: &DecalCatalog) {
        self.registry.respawn_all(host, catalog);
        debug!(
            target: "decals",
            "Round start: {} decals spawned",
            self.registry.spawned_count()
        );
    }

    /// Switches the current map now; its records arrive with the next store tick.
    pub fn on_map_change<H: DecalHost>(&mut self, map: &str, host: &mut H) {
        info!(target: "decals", "Map changed to {}", map);
        self.registry.clear(host);
        self.modes.clear_all();
        self.current_map = Some(map.to_string());
        self.jobs.enqueue(StoreJob::LoadMap {
            map: map.to_string(),
        });
    }

    pub fn on_player_connected(&mut self, player: &PlayerId, is_bot: bool) {
        if is_bot {
            return;
        }
        self.awaiting_preference.insert(player.clone());
        self.jobs.enqueue(StoreJob::LoadPreference {
            player: player.clone(),
        });
    }

    pub fn on_player_disconnected(&mut self, player: &PlayerId) {
        self.modes.clear(player);
        self.preferences.remove(player);
        self.awaiting_preference.remove(player);
    }

    pub fn toggle_preference(&mut self, player: &PlayerId) {
        self.jobs.enqueue(StoreJob::TogglePreference {
            player: player.clone(),
        });
    }

    /// Releases every entity and forgets per-player state.
    pub fn shutdown<H: DecalHost>(&mut self, host: &mut H) {
        let dropped = self.jobs.queue_depth();
        if dropped > 0 {
            warn!(target: "decals", "Dropping {} store jobs at shutdown", dropped);
        }
        self.jobs.clear();
        self.registry.clear(host);
        self.modes.clear_all();
        self.preferences.clear();
        self.awaiting_preference.clear();
        info!(target: "decals", "Decal lifecycle shut down");
    }

    /// Runs the jobs queued before this call and applies their outcomes.
    pub fn process_jobs<H: DecalHost>(
        &mut self,
        store: &dyn DecalStore,
        host: &mut H,
        catalog: &DecalCatalog,
    ) -> Vec<DecalAuditEntry> {
        let mut audit = Vec::new();
        for job in self.jobs.take_all() {
            let outcome = execute(job, store);
            self.jobs.record(&outcome);
            audit.extend(self.apply_outcome(outcome, host, catalog));
        }
        audit
    }

    pub fn apply_outcome<H: DecalHost>(
        &mut self,
        outcome: StoreOutcome,
        host: &mut H,
        catalog: &DecalCatalog,
    ) -> Option<DecalAuditEntry> {
        match outcome {
            StoreOutcome::MapLoaded { map, records } => {
                if self.current_map.as_deref() == Some(map.as_str()) {
                    self.registry.load_for_map(&map, records, host, catalog);
                } else {
                    debug!(target: "decals", "Dropping stale decal load for map {}", map);
                }
                None
            }
            StoreOutcome::Inserted {
                record,
                requested_by,
            } => self.commit_insert(record, &requested_by, host, catalog),
            StoreOutcome::Updated {
                record,
                edit,
                requested_by,
            } => self.commit_update(record, edit, &requested_by, host, catalog),
            StoreOutcome::Deleted { id, requested_by } => {
                let removed = self.registry.remove(id, host);
                host.notify(&requested_by, "Decal deleted!");
                self.open_edit_list(&requested_by, host);
                removed.map(|record| DecalAuditEntry {
                    action: DecalAuditAction::Deleted,
                    decal_id: id,
                    map: record.map,
                    player: requested_by,
                })
            }
            StoreOutcome::PreferenceLoaded { player, enabled } => {
                if self.awaiting_preference.remove(&player) {
                    self.preferences.insert(player, enabled);
                }
                None
            }
            StoreOutcome::PreferenceToggled { player, enabled } => {
                self.preferences.insert(player.clone(), enabled);
                let status = if enabled { "enabled" } else { "disabled" };
                host.notify(&player, format!("Decals are now {}.", status));
                None
            }
            StoreOutcome::Failed { job, error } => {
                self.report_failure(job, error, host);
                None
            }
        }
    }

    fn commit_insert<H: DecalHost>(
        &mut self,
        record: DecalRecord,
        player: &PlayerId,
        host: &mut H,
        catalog: &DecalCatalog,
    ) -> Option<DecalAuditEntry> {
        let id = record.id?;
        info!(
            target: "decals",
            "Decal {} ({}) placed on {} by {}",
            id,
            record.decal_type_id,
            record.map,
            player
        );

        let map = record.map.clone();
        if self.current_map.as_deref() == Some(map.as_str()) {
            let edit = menu::edit_menu(id, &record);
            self.registry.add(record, host, catalog);
            host.notify(player, "Decal placed successfully!");
            host.open_menu(player, edit);
        } else {
            host.notify(player, "Decal placed successfully!");
        }

        Some(DecalAuditEntry {
            action: DecalAuditAction::Placed,
            decal_id: id,
            map,
            player: player.clone(),
        })
    }

    fn commit_update<H: DecalHost>(
        &mut self,
        record: DecalRecord,
        edit: DecalEdit,
        player: &PlayerId,
        host: &mut H,
        catalog: &DecalCatalog,
    ) -> Option<DecalAuditEntry> {
        let id = record.id?;
        if !self.registry.replace(record.clone()) {
            host.notify(player, DECAL_NOT_FOUND);
            return None;
        }

        let action = match edit {
            DecalEdit::Reposition { .. } => {
                self.registry.respawn(id, host, catalog);
                host.notify(player, "Decal repositioned successfully!");
                DecalAuditAction::Repositioned
            }
            DecalEdit::Resize { dimension, value } => {
                self.registry.respawn(id, host, catalog);
                host.notify(player, format!("Decal {} updated to {}!", dimension, value));
                DecalAuditAction::Resized { dimension, value }
            }
            DecalEdit::ToggleForceOnVip => {
                let status = if record.force_on_vip { "ON" } else { "OFF" };
                host.notify(player, format!("Force on VIP set to {}!", status));
                DecalAuditAction::ForceOnVipToggled {
                    enabled: record.force_on_vip,
                }
            }
            DecalEdit::ToggleActive => {
                if record.is_active {
                    self.registry.respawn(id, host, catalog);
                    host.notify(player, "Decal enabled!");
                } else {
                    self.registry.despawn(id, host);
                    host.notify(player, "Decal disabled!");
                }
                DecalAuditAction::ActiveToggled {
                    enabled: record.is_active,
                }
            }
        };

        host.open_menu(player, menu::edit_menu(id, &record));
        Some(DecalAuditEntry {
            action,
            decal_id: id,
            map: record.map,
            player: player.clone(),
        })
    }

    fn report_failure<H: DecalHost>(&mut self, job: StoreJob, error: DecalError, host: &mut H) {
        match job {
            StoreJob::LoadMap { map } => {
                error!(target: "decals", "Failed to load decals for map {}: {}", map, error);
            }
            StoreJob::LoadPreference { player } => {
                self.awaiting_preference.remove(&player);
                error!(
                    target: "decals",
                    "Failed to load decal preference for {}: {}",
                    player,
                    error
                );
            }
            StoreJob::Insert {
                record,
                requested_by,
            } => {
                error!(
                    target: "decals",
                    "Failed to save decal {} on {} for {}: {}",
                    record.decal_type_id,
                    record.map,
                    requested_by,
                    error
                );
                host.notify(&requested_by, error.player_message("placing decal"));
            }
            StoreJob::Update {
                id,
                edit,
                requested_by,
            } => {
                error!(
                    target: "decals",
                    "Failed to update decal {} ({:?}) for {}: {}",
                    id,
                    edit,
                    requested_by,
                    error
                );
                host.notify(&requested_by, error.player_message(edit.failed_action()));
            }
            StoreJob::Delete { id, requested_by } => {
                error!(
                    target: "decals",
                    "Failed to delete decal {} for {}: {}",
                    id,
                    requested_by,
                    error
                );
                host.notify(&requested_by, error.player_message("deleting decal"));
            }
            StoreJob::TogglePreference { player } => {
                error!(
                    target: "decals",
                    "Failed to toggle decal preference for {}: {}",
                    player,
                    error
                );
                host.notify(&player, error.player_message("toggling decals"));
            }
        }
    }

    fn open_edit_list<H: DecalHost>(&self, player: &PlayerId, host: &mut H) {
        match menu::edit_list_menu(self.registry.records()) {
            Some(list) => host.open_menu(player, list),
            None => host.notify(player, "No decals found on this map."),
        }
    }

    fn open_edit_menu<H: DecalHost>(&self, player: &PlayerId, id: DecalId, host: &mut H) {
        match self.registry.get(id) {
            Some(record) => host.open_menu(player, menu::edit_menu(id, record)),
            None => host.notify(player, DECAL_NOT_FOUND),
        }
    }
}

/// Tells dead players why they were refused. Players the host no longer knows are ignored.
fn require_alive<H: DecalHost>(host: &mut H, player: &PlayerId) -> bool {
    match host.player_state(player) {
        Some(state) if state.alive => true,
        Some(_) => {
            host.notify(player, MUST_BE_ALIVE);
            false
        }
        None => {
            let error = ValidationError::PlayerUnavailable {
                player: player.clone(),
            };
            debug!(target: "decals", "Ignoring decal request: {}", error);
            false
        }
    }
}

/// The player's view angles, zero when the host cannot report them.
fn eye_angles<H: DecalHost>(host: &H, player: &PlayerId) -> EulerAngles {
    host.player_state(player)
        .and_then(|state| state.eye_angles)
        .unwrap_or(EulerAngles::ZERO)
}
