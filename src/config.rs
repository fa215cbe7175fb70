//! Plugin configuration loaded from `config/map_decals.toml`.
use std::{env, fs, path::Path};

use bevy::prelude::*;
use serde::Deserialize;

const CONFIG_PATH: &str = "config/map_decals.toml";
const DATABASE_URL_ENV: &str = "MAP_DECALS_DATABASE_URL";
const DEFAULT_DATABASE_URL: &str = "sqlite://map_decals.db";
const DEFAULT_PLACE_COMMAND: &str = "decals";
const DEFAULT_TOGGLE_COMMAND: &str = "toggledecals";
const COMMAND_PREFIX: &str = "css_";

#[derive(Debug, Clone, Deserialize, Default)]
struct RawMapDecalsConfig {
    #[serde(default)]
    database: RawDatabase,
    #[serde(default)]
    commands: RawCommands,
    #[serde(default)]
    decals: Vec<RawDecalType>,
    #[serde(default)]
    audit: RawAudit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawDatabase {
    backend: String,
    url: String,
}

impl Default for RawDatabase {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawCommands {
    place: RawCommand,
    toggle: RawCommand,
}

impl Default for RawCommands {
    fn default() -> Self {
        Self {
            place: RawCommand::named(DEFAULT_PLACE_COMMAND),
            toggle: RawCommand::named(DEFAULT_TOGGLE_COMMAND),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCommand {
    command: String,
    aliases: Vec<String>,
    permission: String,
}

impl RawCommand {
    fn named(command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDecalType {
    id: String,
    name: String,
    material: String,
    show_permission: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAudit {
    log_path: String,
}

/// Storage backend selected in `[database]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
}

/// A chat command with its aliases and the permission needed to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandConfig {
    pub command: String,
    pub aliases: Vec<String>,
    /// Empty means anyone may run the command.
    pub permission: String,
}

impl CommandConfig {
    /// True when `input` names this command or an alias, with or without the `css_` prefix.
    pub fn matches(&self, input: &str) -> bool {
        let trimmed = input.trim();
        let name = trimmed
            .get(..COMMAND_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(COMMAND_PREFIX))
            .map_or(trimmed, |_| &trimmed[COMMAND_PREFIX.len()..]);

        !name.is_empty()
            && std::iter::once(&self.command)
                .chain(self.aliases.iter())
                .any(|candidate| candidate.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone)]
pub struct CommandsConfig {
    pub place: CommandConfig,
    pub toggle: CommandConfig,
}

/// A decal type players can choose from the placement menu.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalTypeConfig {
    pub id: String,
    pub name: String,
    pub material: String,
    /// Empty means every player can see decals of this type.
    pub show_permission: String,
}

/// Configured decal types, in menu order.
#[derive(Debug, Clone, Default)]
pub struct DecalCatalog {
    types: Vec<DecalTypeConfig>,
}

impl DecalCatalog {
    pub fn new(types: Vec<DecalTypeConfig>) -> Self {
        let mut catalog = Self::default();
        for decal_type in types {
            catalog.register(decal_type);
        }
        catalog
    }

    fn register(&mut self, decal_type: DecalTypeConfig) {
        if decal_type.id.is_empty() {
            warn!(target: "decals", "Ignoring decal type without an id ({})", decal_type.name);
            return;
        }
        if self.get(&decal_type.id).is_some() {
            warn!(
                target: "decals",
                "Duplicate decal type '{}' in configuration; keeping the first entry",
                decal_type.id
            );
            return;
        }
        self.types.push(decal_type);
    }

    pub fn get(&self, decal_type_id: &str) -> Option<&DecalTypeConfig> {
        self.types.iter().find(|entry| entry.id == decal_type_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecalTypeConfig> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Runtime configuration derived from `config/map_decals.toml`.
#[derive(Resource, Debug, Clone)]
pub struct MapDecalsConfig {
    pub database: DatabaseConfig,
    pub commands: CommandsConfig,
    pub catalog: DecalCatalog,
    /// JSON lines audit log; `None` disables it.
    pub audit_log_path: Option<String>,
}

impl MapDecalsConfig {
    pub fn load_or_default() -> Self {
        let mut config = Self::load_from(Path::new(CONFIG_PATH));
        config.apply_env_overrides();
        config.report();
        config
    }

    fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw).unwrap_or_else(|err| {
                warn!(
                    target: "decals",
                    "Failed to parse {} ({}). Falling back to defaults.",
                    path.display(),
                    err
                );
                Self::default()
            }),
            Err(err) => {
                warn!(
                    target: "decals",
                    "Could not read {} ({}). Using default decal configuration.",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<RawMapDecalsConfig>(raw).map(Self::from)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(DATABASE_URL_ENV) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.database.url = trimmed.to_string();
            }
        }
    }

    fn report(&self) {
        if self.database.url.trim().is_empty() {
            error!(target: "decals", "Database connection string is not configured!");
        }
        if self.catalog.is_empty() {
            warn!(target: "decals", "No decals configured in the configuration file!");
        }
    }
}

impl Default for MapDecalsConfig {
    fn default() -> Self {
        RawMapDecalsConfig::default().into()
    }
}

impl From<RawMapDecalsConfig> for MapDecalsConfig {
    fn from(value: RawMapDecalsConfig) -> Self {
        let backend = match value.database.backend.trim().to_ascii_lowercase().as_str() {
            "memory" => DatabaseBackend::Memory,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                warn!(
                    target: "decals",
                    "Unsupported database backend '{}'; using sqlite",
                    other
                );
                DatabaseBackend::Sqlite
            }
        };

        let catalog = DecalCatalog::new(
            value
                .decals
                .into_iter()
                .map(|raw| DecalTypeConfig {
                    id: raw.id.trim().to_string(),
                    name: raw.name.trim().to_string(),
                    material: raw.material.trim().to_string(),
                    show_permission: raw.show_permission.trim().to_string(),
                })
                .collect(),
        );

        let audit_log_path = Some(value.audit.log_path.trim().to_string())
            .filter(|path| !path.is_empty());

        Self {
            database: DatabaseConfig {
                backend,
                url: value.database.url.trim().to_string(),
            },
            commands: CommandsConfig {
                place: normalise_command(value.commands.place, DEFAULT_PLACE_COMMAND),
                toggle: normalise_command(value.commands.toggle, DEFAULT_TOGGLE_COMMAND),
            },
            catalog,
            audit_log_path,
        }
    }
}

fn normalise_command(raw: RawCommand, fallback: &str) -> CommandConfig {
    let command = Some(raw.command.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback.to_string());

    CommandConfig {
        command,
        aliases: raw
            .aliases
            .iter()
            .map(|alias| alias.trim().to_string())
            .filter(|alias| !alias.is_empty())
            .collect(),
        permission: raw.permission.trim().to_string(),
    }
}
