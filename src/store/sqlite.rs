//! SQLite-backed store driven by a private single-threaded tokio runtime.
use std::{future::Future, str::FromStr};

use bevy::log::warn;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, Pool, Sqlite,
};
use tokio::runtime::{Builder, Runtime};

use crate::decals::{
    errors::ValidationError,
    types::{
        encode_angles, encode_position, parse_angles, parse_position, DecalId, DecalRecord,
        PlayerId,
    },
};

use super::{DecalStore, StoreError, StoreOperation};

const CREATE_DECALS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS decals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        map TEXT NOT NULL,
        decal_type_id TEXT NOT NULL,
        decal_name TEXT NOT NULL,
        position TEXT NOT NULL,
        angles TEXT NOT NULL,
        depth INTEGER NOT NULL DEFAULT 12,
        width REAL NOT NULL DEFAULT 128,
        height REAL NOT NULL DEFAULT 128,
        force_on_vip INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1
    )
"#;

const CREATE_DECALS_MAP_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_decals_map ON decals(map)";

const CREATE_PREFERENCES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS preferences (
        player_id TEXT PRIMARY KEY,
        decals_enabled INTEGER NOT NULL DEFAULT 1
    )
"#;

const SELECT_DECAL_COLUMNS: &str = "SELECT id, map, decal_type_id, decal_name, position, angles, \
     depth, width, height, force_on_vip, is_active FROM decals";

/// Store persisting decals in a SQLite database file.
pub struct SqliteDecalStore {
    runtime: Runtime,
    pool: Pool<Sqlite>,
}

impl SqliteDecalStore {
    /// Connects to `url` (e.g. `sqlite://map_decals.db`), creating the file if needed.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| StoreError::new(StoreOperation::Connect, err.to_string()))?;

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|err| StoreError::new(StoreOperation::Connect, err.to_string()))?
            .create_if_missing(true);

        // A single long-lived connection keeps `sqlite::memory:` databases alive.
        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options),
            )
            .map_err(|err| StoreError::new(StoreOperation::Connect, err.to_string()))?;

        Ok(Self { runtime, pool })
    }

    fn run<T>(
        &self,
        operation: StoreOperation,
        future: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, StoreError> {
        self.runtime
            .block_on(future)
            .map_err(|err| StoreError::new(operation, err.to_string()))
    }
}

#[derive(Debug, FromRow)]
struct DecalRow {
    id: i64,
    map: String,
    decal_type_id: String,
    decal_name: String,
    position: String,
    angles: String,
    depth: i64,
    width: f64,
    height: f64,
    force_on_vip: i64,
    is_active: i64,
}

impl TryFrom<DecalRow> for DecalRecord {
    type Error = ValidationError;

    fn try_from(row: DecalRow) -> Result<Self, Self::Error> {
        let position = parse_position(&row.position)?;
        let angles = parse_angles(&row.angles)?;
        Ok(Self {
            id: Some(DecalId::new(row.id)),
            map: row.map,
            decal_type_id: row.decal_type_id,
            name: row.decal_name,
            position,
            angles,
            depth: row.depth as i32,
            width: row.width as f32,
            height: row.height as f32,
            force_on_vip: row.force_on_vip != 0,
            is_active: row.is_active != 0,
        })
    }
}

impl DecalStore for SqliteDecalStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.run(StoreOperation::InitializeSchema, async {
            for statement in [
                CREATE_DECALS_TABLE,
                CREATE_DECALS_MAP_INDEX,
                CREATE_PREFERENCES_TABLE,
            ] {
                sqlx::query(statement).execute(&self.pool).await?;
            }
            Ok(())
        })
    }

    fn list_by_map(&self, map: &str) -> Result<Vec<DecalRecord>, StoreError> {
        let query = format!("{SELECT_DECAL_COLUMNS} WHERE map = ? ORDER BY id");
        let rows = self.run(
            StoreOperation::ListByMap,
            sqlx::query_as::<_, DecalRow>(&query)
                .bind(map)
                .fetch_all(&self.pool),
        )?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match DecalRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    target: "decals",
                    "Skipping stored decal #{} on {}: {}",
                    id,
                    map,
                    err
                ),
            }
        }
        Ok(records)
    }

    fn get_by_id(&self, id: DecalId) -> Result<Option<DecalRecord>, StoreError> {
        let query = format!("{SELECT_DECAL_COLUMNS} WHERE id = ?");
        let row = self.run(
            StoreOperation::GetById,
            sqlx::query_as::<_, DecalRow>(&query)
                .bind(id.value())
                .fetch_optional(&self.pool),
        )?;

        row.map(DecalRecord::try_from)
            .transpose()
            .map_err(|err| StoreError::new(StoreOperation::GetById, err.to_string()))
    }

    fn insert(&self, record: &DecalRecord) -> Result<DecalId, StoreError> {
        let result = self.run(
            StoreOperation::Insert,
            sqlx::query(
                "INSERT INTO decals (map, decal_type_id, decal_name, position, angles, depth, \
                 width, height, force_on_vip, is_active) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(record.map.as_str())
            .bind(record.decal_type_id.as_str())
            .bind(record.name.as_str())
            .bind(encode_position(record.position))
            .bind(encode_angles(record.angles))
            .bind(i64::from(record.depth))
            .bind(f64::from(record.width))
            .bind(f64::from(record.height))
            .bind(record.force_on_vip)
            .bind(record.is_active)
            .execute(&self.pool),
        )?;

        Ok(DecalId::new(result.last_insert_rowid()))
    }

    fn update(&self, record: &DecalRecord) -> Result<(), StoreError> {
        let Some(id) = record.id else {
            return Err(StoreError::new(
                StoreOperation::Update,
                "record has not been inserted",
            ));
        };

        self.run(
            StoreOperation::Update,
            sqlx::query(
                "UPDATE decals SET position = ?, angles = ?, depth = ?, width = ?, height = ?, \
                 force_on_vip = ?, is_active = ? WHERE id = ?",
            )
            .bind(encode_position(record.position))
            .bind(encode_angles(record.angles))
            .bind(i64::from(record.depth))
            .bind(f64::from(record.width))
            .bind(f64::from(record.height))
            .bind(record.force_on_vip)
            .bind(record.is_active)
            .bind(id.value())
            .execute(&self.pool),
        )?;
        Ok(())
    }

    fn delete(&self, id: DecalId) -> Result<(), StoreError> {
        self.run(
            StoreOperation::Delete,
            sqlx::query("DELETE FROM decals WHERE id = ?")
                .bind(id.value())
                .execute(&self.pool),
        )?;
        Ok(())
    }

    fn get_preference(&self, player: &PlayerId) -> Result<bool, StoreError> {
        let stored = self.run(
            StoreOperation::GetPreference,
            sqlx::query_scalar::<_, i64>(
                "SELECT decals_enabled FROM preferences WHERE player_id = ?",
            )
            .bind(player.as_str())
            .fetch_optional(&self.pool),
        )?;

        Ok(stored.is_none_or(|value| value != 0))
    }

    fn set_preference(&self, player: &PlayerId, enabled: bool) -> Result<(), StoreError> {
        self.run(
            StoreOperation::SetPreference,
            sqlx::query(
                "INSERT INTO preferences (player_id, decals_enabled) VALUES (?, ?) \
                 ON CONFLICT(player_id) DO UPDATE SET decals_enabled = excluded.decals_enabled",
            )
            .bind(player.as_str())
            .bind(enabled)
            .execute(&self.pool),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::Vec3;

    use super::*;
    use crate::decals::types::EulerAngles;

    fn open_memory_store() -> SqliteDecalStore {
        let store = SqliteDecalStore::connect("sqlite::memory:").expect("in-memory sqlite");
        store.initialize_schema().expect("schema");
        store
    }

    fn poster(map: &str) -> DecalRecord {
        DecalRecord::new(
            map,
            "poster",
            "Poster",
            Vec3::new(98.58579, 198.60728, 50.347296),
            EulerAngles::new(100.0, 45.0, 0.0),
        )
    }

    #[test]
    fn schema_initialisation_is_repeatable() {
        let store = open_memory_store();
        store.initialize_schema().expect("second init");
    }

    #[test]
    fn insert_then_list_round_trips_every_field() {
        let store = open_memory_store();
        let record = poster("de_dust2");
        let id = store.insert(&record).expect("insert");
        assert_eq!(id, DecalId::new(1));

        let listed = store.list_by_map("de_dust2").expect("list");
        assert_eq!(listed, vec![record.clone().with_id(id)]);

        let fetched = store.get_by_id(id).expect("get").expect("row exists");
        assert_eq!(fetched.id, Some(id));
        assert!(store.list_by_map("de_nuke").unwrap().is_empty());
    }

    #[test]
    fn update_and_delete_touch_only_the_target_row() {
        let store = open_memory_store();
        let first = store.insert(&poster("de_dust2")).unwrap();
        let second = store.insert(&poster("de_dust2")).unwrap();

        let mut changed = store.get_by_id(first).unwrap().unwrap();
        changed.width = 512.0;
        changed.depth = 24;
        changed.is_active = false;
        changed.force_on_vip = true;
        store.update(&changed).unwrap();

        let reloaded = store.get_by_id(first).unwrap().unwrap();
        assert_eq!(reloaded, changed);

        store.delete(first).unwrap();
        let remaining = store.list_by_map("de_dust2").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, Some(second));
    }

    #[test]
    fn malformed_rows_are_skipped_on_map_load() {
        let store = open_memory_store();
        store.insert(&poster("de_dust2")).unwrap();
        store
            .run(
                StoreOperation::Insert,
                sqlx::query(
                    "INSERT INTO decals (map, decal_type_id, decal_name, position, angles) \
                     VALUES ('de_dust2', 'poster', 'Broken', '1 2', '0 0 0')",
                )
                .execute(&store.pool),
            )
            .unwrap();

        let listed = store.list_by_map("de_dust2").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Poster");
    }

    #[test]
    fn preference_upsert_defaults_to_enabled() {
        let store = open_memory_store();
        let player = PlayerId::new("76561198000000002");
        assert!(store.get_preference(&player).unwrap());

        store.set_preference(&player, false).unwrap();
        assert!(!store.get_preference(&player).unwrap());

        store.set_preference(&player, true).unwrap();
        assert!(store.get_preference(&player).unwrap());
    }
}
