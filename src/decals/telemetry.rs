//! JSON lines audit trail of committed decal edits.
use std::{
    fs::{create_dir_all, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use bevy::{log::warn, prelude::*};
use serde::Serialize;

use super::types::{DecalDimension, DecalId, PlayerId};

/// Edit that was committed to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum DecalAuditAction {
    Placed,
    Repositioned,
    Resized { dimension: DecalDimension, value: f32 },
    ForceOnVipToggled { enabled: bool },
    ActiveToggled { enabled: bool },
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecalAuditEntry {
    pub action: DecalAuditAction,
    pub decal_id: DecalId,
    pub map: String,
    pub player: PlayerId,
}

/// Pending audit entries, appended to `output_path` once per frame.
#[derive(Resource, Debug)]
pub struct DecalAuditLog {
    output_path: PathBuf,
    pending: Vec<SerializableAuditRecord>,
}

impl DecalAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: path.into(),
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, occurred_at_seconds: f64, entry: DecalAuditEntry) {
        self.pending.push(SerializableAuditRecord {
            occurred_at_seconds,
            decal_id: entry.decal_id.value(),
            map: entry.map,
            player: entry.player.to_string(),
            action: entry.action.into(),
        });
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.output_path.parent() {
            create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)?;

        for record in self.pending.drain(..) {
            serde_json::to_writer(&mut file, &record)?;
            file.write_all(b"\n")?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.output_path
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Flushes pending audit entries, warning when the file cannot be written.
pub fn flush_decal_audit_log(log: Option<ResMut<DecalAuditLog>>) {
    let Some(mut log) = log else {
        return;
    };
    if let Err(err) = log.flush() {
        warn!(
            target: "decals",
            "Failed to persist decal audit log to {:?}: {}",
            log.path(),
            err
        );
    }
}

#[derive(Debug, Serialize)]
struct SerializableAuditRecord {
    occurred_at_seconds: f64,
    decal_id: i64,
    map: String,
    player: String,
    action: SerializableAuditAction,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum SerializableAuditAction {
    Placed,
    Repositioned,
    Resized { dimension: String, value: f32 },
    ForceOnVipToggled { enabled: bool },
    ActiveToggled { enabled: bool },
    Deleted,
}

impl From<DecalAuditAction> for SerializableAuditAction {
    fn from(value: DecalAuditAction) -> Self {
        match value {
            DecalAuditAction::Placed => Self::Placed,
            DecalAuditAction::Repositioned => Self::Repositioned,
            DecalAuditAction::Resized { dimension, value } => Self::Resized {
                dimension: dimension.to_string(),
                value,
            },
            DecalAuditAction::ForceOnVipToggled { enabled } => Self::ForceOnVipToggled { enabled },
            DecalAuditAction::ActiveToggled { enabled } => Self::ActiveToggled { enabled },
            DecalAuditAction::Deleted => Self::Deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::{env, fs, time::SystemTime};

    #[test]
    fn audit_log_appends_json_lines() {
        let unique_suffix = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = env::temp_dir().join(format!("decal_audit_test_{}.jsonl", unique_suffix));

        let mut log = DecalAuditLog::new(&path);
        log.push(
            1.5,
            DecalAuditEntry {
                action: DecalAuditAction::Resized {
                    dimension: DecalDimension::Width,
                    value: 256.0,
                },
                decal_id: DecalId::new(3),
                map: "de_dust2".into(),
                player: PlayerId::new("76561198000000001"),
            },
        );
        log.flush().expect("audit log should flush");
        log.push(
            2.0,
            DecalAuditEntry {
                action: DecalAuditAction::Deleted,
                decal_id: DecalId::new(3),
                map: "de_dust2".into(),
                player: PlayerId::new("76561198000000001"),
            },
        );
        log.flush().expect("audit log should flush again");
        assert_eq!(log.pending_len(), 0);

        let raw = fs::read_to_string(&path).expect("log file should exist");
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).expect("json line should parse");
        assert_eq!(first["decal_id"], 3);
        assert_eq!(first["action"]["action"], "resized");
        assert_eq!(first["action"]["dimension"], "width");

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["action"]["action"], "deleted");

        let _ = fs::remove_file(&path);
    }
}
