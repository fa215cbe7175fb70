//! Records for the current map and the entities spawned for them.
use std::collections::HashMap;

use bevy::prelude::*;

use crate::config::DecalCatalog;

use super::{
    errors::DecalError,
    host::{DecalHost, DecalSpawn},
    types::{DecalId, DecalRecord},
};

/// Ordered decal records for the loaded map plus the live entity of each spawned one.
///
/// Every id in the entity map belongs to an active record in `records`.
#[derive(Debug, Default)]
pub struct ActiveDecalRegistry {
    records: Vec<DecalRecord>,
    entities: HashMap<DecalId, Entity>,
}

impl ActiveDecalRegistry {
    /// Discards everything and installs `records`, spawning the active ones.
    pub fn load_for_map<H: DecalHost>(
        &mut self,
        map: &str,
        records: Vec<DecalRecord>,
        host: &mut H,
        catalog: &DecalCatalog,
    ) {
        self.despawn_all(host);
        self.records.clear();

        for record in records {
            if record.map != map {
                warn!(
                    target: "decals",
                    "Skipping decal {:?} stored for map {} while loading {}",
                    record.id,
                    record.map,
                    map
                );
                continue;
            }
            self.insert_record(record);
        }

        self.respawn_all(host, catalog);

        info!(
            target: "decals",
            "Loaded {} decals for map {} ({} spawned)",
            self.records.len(),
            map,
            self.entities.len()
        );
    }

    /// Adds a persisted record and spawns it when active.
    pub fn add<H: DecalHost>(&mut self, record: DecalRecord, host: &mut H, catalog: &DecalCatalog) {
        let Some(id) = record.id else {
            warn!(target: "decals", "Refusing to track a decal without a store id");
            return;
        };
        self.remove(id, host);
        self.insert_record(record);
        self.spawn_at(self.records.len() - 1, host, catalog);
    }

    /// Releases the current entity, then spawns again if the record is active.
    pub fn respawn<H: DecalHost>(&mut self, id: DecalId, host: &mut H, catalog: &DecalCatalog) {
        self.despawn(id, host);
        if let Some(index) = self.index_of(id) {
            self.spawn_at(index, host, catalog);
        }
    }

    /// Despawns the decal if spawned and forgets its record.
    pub fn remove<H: DecalHost>(&mut self, id: DecalId, host: &mut H) -> Option<DecalRecord> {
        self.despawn(id, host);
        self.index_of(id).map(|index| self.records.remove(index))
    }

    /// Releases the entity of one decal, keeping its record.
    pub fn despawn<H: DecalHost>(&mut self, id: DecalId, host: &mut H) {
        if let Some(entity) = self.entities.remove(&id) {
            match host.remove_decal(entity) {
                Ok(()) => debug!(target: "decals", "Despawned decal {}", id),
                Err(err) => warn!(
                    target: "decals",
                    "Failed to despawn decal {}: {}",
                    id,
                    DecalError::from(err)
                ),
            }
        }
    }

    /// Releases every handle and spawns each active record exactly once.
    pub fn respawn_all<H: DecalHost>(&mut self, host: &mut H, catalog: &DecalCatalog) {
        self.despawn_all(host);
        for index in 0..self.records.len() {
            self.spawn_at(index, host, catalog);
        }
    }

    /// Releases every entity handle, keeping the records.
    pub fn despawn_all<H: DecalHost>(&mut self, host: &mut H) {
        let ids: Vec<DecalId> = self.entities.keys().copied().collect();
        for id in ids {
            self.despawn(id, host);
        }
    }

    /// Swaps in a record after its update was committed. Returns `false` when untracked.
    pub fn replace(&mut self, record: DecalRecord) -> bool {
        let Some(index) = record.id.and_then(|id| self.index_of(id)) else {
            return false;
        };
        self.records[index] = record;
        true
    }

    pub fn get(&self, id: DecalId) -> Option<&DecalRecord> {
        self.records.iter().find(|record| record.id == Some(id))
    }

    pub fn list_all(&self) -> Vec<DecalRecord> {
        self.records.clone()
    }

    pub fn records(&self) -> &[DecalRecord] {
        &self.records
    }

    pub fn entity(&self, id: DecalId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn spawned_count(&self) -> usize {
        self.entities.len()
    }

    pub fn clear<H: DecalHost>(&mut self, host: &mut H) {
        self.despawn_all(host);
        self.records.clear();
    }

    fn insert_record(&mut self, record: DecalRecord) {
        match record.id.and_then(|id| self.index_of(id)) {
            Some(index) => self.records[index] = record,
            None => self.records.push(record),
        }
    }

    fn index_of(&self, id: DecalId) -> Option<usize> {
        self.records.iter().position(|record| record.id == Some(id))
    }

    fn spawn_at<H: DecalHost>(&mut self, index: usize, host: &mut H, catalog: &DecalCatalog) {
        let record = &self.records[index];
        let Some(id) = record.id else {
            return;
        };
        if !record.is_active {
            return;
        }
        if self.entities.contains_key(&id) {
            return;
        }

        let Some(decal_type) = catalog.get(&record.decal_type_id) else {
            warn!(
                target: "decals",
                "Decal {} uses unknown type '{}'; not spawning",
                id,
                record.decal_type_id
            );
            return;
        };

        let spawn = DecalSpawn {
            id,
            material: &decal_type.material,
            position: record.position,
            angles: record.angles,
            width: record.width,
            height: record.height,
            depth: record.depth,
        };
        match host.spawn_decal(&spawn) {
            Ok(entity) => {
                debug!(target: "decals", "Spawned decal {} as {:?}", id, entity);
                self.entities.insert(id, entity);
            }
            Err(err) => error!(
                target: "decals",
                "Failed to spawn decal {}: {}",
                id,
                DecalError::from(err)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decals::testing::{catalog, record, RecordingHost};

    #[test]
    fn load_for_map_twice_is_a_clean_reload() {
        let mut host = RecordingHost::default();
        let catalog = catalog();
        let mut registry = ActiveDecalRegistry::default();
        let mut inactive = record(2, "de_dust2");
        inactive.is_active = false;
        let stored = vec![record(1, "de_dust2"), inactive, record(3, "de_dust2")];

        registry.load_for_map("de_dust2", stored.clone(), &mut host, &catalog);
        let first: Vec<_> = registry.list_all();
        registry.load_for_map("de_dust2", stored, &mut host, &catalog);

        assert_eq!(registry.list_all(), first);
        assert_eq!(registry.spawned_count(), 2);
        assert_eq!(host.live_count(), 2);
        assert!(registry.entity(DecalId::new(2)).is_none());
    }

    #[test]
    fn respawn_keeps_one_entity_per_active_decal() {
        let mut host = RecordingHost::default();
        let catalog = catalog();
        let mut registry = ActiveDecalRegistry::default();
        registry.add(record(5, "de_dust2"), &mut host, &catalog);
        let before = registry.entity(DecalId::new(5)).unwrap();

        registry.respawn(DecalId::new(5), &mut host, &catalog);
        let after = registry.entity(DecalId::new(5)).unwrap();

        assert_ne!(before, after);
        assert_eq!(host.live_count(), 1);
    }

    #[test]
    fn spawn_failures_are_logged_and_skipped() {
        let mut host = RecordingHost {
            reject_spawns: true,
            ..Default::default()
        };
        let catalog = catalog();
        let mut registry = ActiveDecalRegistry::default();
        registry.add(record(1, "de_dust2"), &mut host, &catalog);

        assert!(registry.get(DecalId::new(1)).is_some());
        assert_eq!(registry.spawned_count(), 0);
    }

    #[test]
    fn removing_a_never_spawned_decal_is_quiet() {
        let mut host = RecordingHost::default();
        let catalog = catalog();
        let mut registry = ActiveDecalRegistry::default();
        let mut hidden = record(4, "de_dust2");
        hidden.is_active = false;
        registry.add(hidden, &mut host, &catalog);

        assert!(registry.remove(DecalId::new(4), &mut host).is_some());
        assert!(registry.get(DecalId::new(4)).is_none());
        assert!(host.removed.is_empty());
    }

    #[test]
    fn despawn_all_keeps_records() {
        let mut host = RecordingHost::default();
        let catalog = catalog();
        let mut registry = ActiveDecalRegistry::default();
        registry.add(record(1, "de_dust2"), &mut host, &catalog);
        registry.add(record(2, "de_dust2"), &mut host, &catalog);

        registry.despawn_all(&mut host);

        assert_eq!(registry.records().len(), 2);
        assert_eq!(registry.spawned_count(), 0);
        assert_eq!(host.live_count(), 0);
    }
}
