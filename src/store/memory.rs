//! In-process store used when no database is configured and in tests.
use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use crate::decals::types::{DecalId, DecalRecord, PlayerId};

use super::{DecalStore, StoreError, StoreOperation};

#[derive(Debug, Default)]
struct MemoryTables {
    decals: BTreeMap<DecalId, DecalRecord>,
    preferences: HashMap<PlayerId, bool>,
    next_id: i64,
}

/// Volatile store with the same id and default semantics as the SQL backend.
#[derive(Debug, Default)]
pub struct MemoryDecalStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryDecalStore {
    fn with_tables<T>(
        &self,
        operation: StoreOperation,
        action: impl FnOnce(&mut MemoryTables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| StoreError::new(operation, "memory store mutex poisoned"))?;
        action(&mut tables)
    }

    /// Number of stored preference rows.
    pub fn preference_rows(&self) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.preferences.len())
            .unwrap_or_default()
    }
}

impl DecalStore for MemoryDecalStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn list_by_map(&self, map: &str) -> Result<Vec<DecalRecord>, StoreError> {
        self.with_tables(StoreOperation::ListByMap, |tables| {
            Ok(tables
                .decals
                .values()
                .filter(|record| record.map == map)
                .cloned()
                .collect())
        })
    }

    fn get_by_id(&self, id: DecalId) -> Result<Option<DecalRecord>, StoreError> {
        self.with_tables(StoreOperation::GetById, |tables| {
            Ok(tables.decals.get(&id).cloned())
        })
    }

    fn insert(&self, record: &DecalRecord) -> Result<DecalId, StoreError> {
        self.with_tables(StoreOperation::Insert, |tables| {
            tables.next_id += 1;
            let id = DecalId::new(tables.next_id);
            tables.decals.insert(id, record.clone().with_id(id));
            Ok(id)
        })
    }

    fn update(&self, record: &DecalRecord) -> Result<(), StoreError> {
        let Some(id) = record.id else {
            return Err(StoreError::new(
                StoreOperation::Update,
                "record has not been inserted",
            ));
        };

        self.with_tables(StoreOperation::Update, |tables| {
            if let Some(stored) = tables.decals.get_mut(&id) {
                // Map, type and name are fixed at insert time.
                stored.position = record.position;
                stored.angles = record.angles;
                stored.depth = record.depth;
                stored.width = record.width;
                stored.height = record.height;
                stored.force_on_vip = record.force_on_vip;
                stored.is_active = record.is_active;
            }
            Ok(())
        })
    }

    fn delete(&self, id: DecalId) -> Result<(), StoreError> {
        self.with_tables(StoreOperation::Delete, |tables| {
            tables.decals.remove(&id);
            Ok(())
        })
    }

    fn get_preference(&self, player: &PlayerId) -> Result<bool, StoreError> {
        self.with_tables(StoreOperation::GetPreference, |tables| {
            Ok(tables.preferences.get(player).copied().unwrap_or(true))
        })
    }

    fn set_preference(&self, player: &PlayerId, enabled: bool) -> Result<(), StoreError> {
        self.with_tables(StoreOperation::SetPreference, |tables| {
            tables.preferences.insert(player.clone(), enabled);
            Ok(())
        })
    }
}
