//! Durable storage for decal records and player visibility preferences.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryDecalStore;
pub use sqlite::SqliteDecalStore;

use std::fmt;

use bevy::prelude::*;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::decals::types::{DecalId, DecalRecord, PlayerId};

/// Store call that produced an error, kept for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Connect,
    InitializeSchema,
    ListByMap,
    GetById,
    Insert,
    Update,
    Delete,
    GetPreference,
    SetPreference,
}

impl StoreOperation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::InitializeSchema => "initialize_schema",
            Self::ListByMap => "list_by_map",
            Self::GetById => "get_by_id",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::GetPreference => "get_preference",
            Self::SetPreference => "set_preference",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store call that threw or could not complete.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreError {
    pub operation: StoreOperation,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store {} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for StoreError {}

/// Contract every decal persistence backend must satisfy.
pub trait DecalStore: Send + Sync + 'static {
    fn backend_name(&self) -> &'static str;

    /// Creates the `decals` and `preferences` tables when missing.
    fn initialize_schema(&self) -> Result<(), StoreError>;

    /// Every well-formed record stored for `map`, ordered by id.
    fn list_by_map(&self, map: &str) -> Result<Vec<DecalRecord>, StoreError>;

    fn get_by_id(&self, id: DecalId) -> Result<Option<DecalRecord>, StoreError>;

    /// Persists a new record and returns the id the store assigned to it.
    fn insert(&self, record: &DecalRecord) -> Result<DecalId, StoreError>;

    fn update(&self, record: &DecalRecord) -> Result<(), StoreError>;

    fn delete(&self, id: DecalId) -> Result<(), StoreError>;

    /// Stored preference, `true` when the player has no row.
    fn get_preference(&self, player: &PlayerId) -> Result<bool, StoreError>;

    fn set_preference(&self, player: &PlayerId, enabled: bool) -> Result<(), StoreError>;
}

/// Resource holding the store backend selected at startup.
#[derive(Resource)]
pub struct ActiveDecalStore {
    store: Box<dyn DecalStore>,
}

impl ActiveDecalStore {
    pub fn new(store: Box<dyn DecalStore>) -> Self {
        Self { store }
    }

    /// Opens the configured backend, falling back to memory when SQLite is unavailable.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        match config.backend {
            DatabaseBackend::Memory => Self::new(Box::new(MemoryDecalStore::default())),
            DatabaseBackend::Sqlite => match SqliteDecalStore::connect(&config.url) {
                Ok(store) => Self::new(Box::new(store)),
                Err(err) => {
                    warn!(
                        target: "decals",
                        "Could not open decal database {} ({}). Decals will not survive a restart.",
                        config.url,
                        err
                    );
                    Self::new(Box::new(MemoryDecalStore::default()))
                }
            },
        }
    }

    pub fn store(&self) -> &dyn DecalStore {
        self.store.as_ref()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
