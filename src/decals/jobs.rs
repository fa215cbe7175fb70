//! Store work queued by the lifecycle and executed on the next tick.
use std::collections::VecDeque;

use bevy::prelude::*;

use crate::store::DecalStore;

use super::{
    errors::{DecalError, ValidationError},
    types::{DecalDimension, DecalId, DecalRecord, EulerAngles, PlayerId},
};

/// A single-field edit, applied to the stored row when the job runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecalEdit {
    Reposition { position: Vec3, angles: EulerAngles },
    Resize { dimension: DecalDimension, value: f32 },
    /// Flips the stored flag, not the cached one.
    ToggleForceOnVip,
    ToggleActive,
}

impl DecalEdit {
    pub fn apply(&self, record: &mut DecalRecord) {
        match *self {
            Self::Reposition { position, angles } => {
                record.position = position;
                record.angles = angles;
            }
            Self::Resize { dimension, value } => record.set_dimension(dimension, value),
            Self::ToggleForceOnVip => record.force_on_vip = !record.force_on_vip,
            Self::ToggleActive => record.is_active = !record.is_active,
        }
    }

    /// Wording for the generic failure message.
    pub fn failed_action(&self) -> &'static str {
        match self {
            Self::Reposition { .. } => "repositioning decal",
            Self::Resize { .. } | Self::ToggleForceOnVip | Self::ToggleActive => "updating decal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreJob {
    LoadMap {
        map: String,
    },
    Insert {
        record: DecalRecord,
        requested_by: PlayerId,
    },
    Update {
        id: DecalId,
        edit: DecalEdit,
        requested_by: PlayerId,
    },
    Delete {
        id: DecalId,
        requested_by: PlayerId,
    },
    LoadPreference {
        player: PlayerId,
    },
    TogglePreference {
        player: PlayerId,
    },
}

impl StoreJob {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoadMap { .. } => "load_map",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::LoadPreference { .. } => "load_preference",
            Self::TogglePreference { .. } => "toggle_preference",
        }
    }
}

/// Result of one executed job, applied back onto the lifecycle state.
#[derive(Debug, Clone)]
pub enum StoreOutcome {
    MapLoaded {
        map: String,
        records: Vec<DecalRecord>,
    },
    Inserted {
        record: DecalRecord,
        requested_by: PlayerId,
    },
    Updated {
        record: DecalRecord,
        edit: DecalEdit,
        requested_by: PlayerId,
    },
    Deleted {
        id: DecalId,
        requested_by: PlayerId,
    },
    PreferenceLoaded {
        player: PlayerId,
        enabled: bool,
    },
    PreferenceToggled {
        player: PlayerId,
        enabled: bool,
    },
    Failed {
        job: StoreJob,
        error: DecalError,
    },
}

#[derive(Debug, Default, Clone)]
pub struct StoreQueueMetrics {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
}

/// FIFO of pending store jobs.
#[derive(Debug, Default)]
pub struct StoreJobQueue {
    pending: VecDeque<StoreJob>,
    metrics: StoreQueueMetrics,
}

impl StoreJobQueue {
    pub fn enqueue(&mut self, job: StoreJob) {
        debug!(target: "decals", "Queued store job {}", job.kind());
        self.pending.push_back(job);
        self.metrics.enqueued += 1;
    }

    /// Takes every job queued so far; jobs enqueued while these run wait for the next tick.
    pub fn take_all(&mut self) -> Vec<StoreJob> {
        self.pending.drain(..).collect()
    }

    pub fn record(&mut self, outcome: &StoreOutcome) {
        match outcome {
            StoreOutcome::Failed { .. } => self.metrics.failed += 1,
            _ => self.metrics.completed += 1,
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.pending.len()
    }

    pub fn metrics(&self) -> &StoreQueueMetrics {
        &self.metrics
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Runs one job against the store.
pub fn execute(job: StoreJob, store: &dyn DecalStore) -> StoreOutcome {
    match run(&job, store) {
        Ok(outcome) => outcome,
        Err(error) => StoreOutcome::Failed { job, error },
    }
}

fn run(job: &StoreJob, store: &dyn DecalStore) -> Result<StoreOutcome, DecalError> {
    let outcome = match job {
        StoreJob::LoadMap { map } => StoreOutcome::MapLoaded {
            map: map.clone(),
            records: store.list_by_map(map)?,
        },
        StoreJob::Insert {
            record,
            requested_by,
        } => {
            let id = store.insert(record)?;
            StoreOutcome::Inserted {
                record: record.clone().with_id(id),
                requested_by: requested_by.clone(),
            }
        }
        StoreJob::Update {
            id,
            edit,
            requested_by,
        } => {
            let mut record = store
                .get_by_id(*id)?
                .ok_or(ValidationError::DecalNotFound { id: *id })?;
            edit.apply(&mut record);
            store.update(&record)?;
            StoreOutcome::Updated {
                record,
                edit: *edit,
                requested_by: requested_by.clone(),
            }
        }
        StoreJob::Delete { id, requested_by } => {
            store.delete(*id)?;
            StoreOutcome::Deleted {
                id: *id,
                requested_by: requested_by.clone(),
            }
        }
        StoreJob::LoadPreference { player } => StoreOutcome::PreferenceLoaded {
            player: player.clone(),
            enabled: store.get_preference(player)?,
        },
        StoreJob::TogglePreference { player } => {
            let enabled = !store.get_preference(player)?;
            store.set_preference(player, enabled)?;
            StoreOutcome::PreferenceToggled {
                player: player.clone(),
                enabled,
            }
        }
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDecalStore;

    fn fresh(map: &str) -> DecalRecord {
        DecalRecord::new(map, "poster", "Poster", Vec3::ZERO, EulerAngles::ZERO)
    }

    #[test]
    fn queue_drains_in_order() {
        let mut queue = StoreJobQueue::default();
        queue.enqueue(StoreJob::LoadMap { map: "a".into() });
        queue.enqueue(StoreJob::LoadMap { map: "b".into() });

        let jobs = queue.take_all();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0], StoreJob::LoadMap { map: "a".into() });
        assert_eq!(queue.queue_depth(), 0);
        assert_eq!(queue.metrics().enqueued, 2);
    }

    #[test]
    fn insert_assigns_the_store_id() {
        let store = MemoryDecalStore::default();
        let outcome = execute(
            StoreJob::Insert {
                record: fresh("de_dust2"),
                requested_by: PlayerId::new("1"),
            },
            &store,
        );

        let record = match outcome {
            StoreOutcome::Inserted { record, .. } => record,
            other => panic!("expected insert outcome, got {other:?}"),
        };
        assert_eq!(record.id, Some(DecalId::new(1)));
        assert_eq!(store.list_by_map("de_dust2").unwrap(), vec![record]);
    }

    #[test]
    fn update_of_deleted_decal_reports_not_found() {
        let store = MemoryDecalStore::default();
        let id = store.insert(&fresh("de_dust2")).unwrap();
        store.delete(id).unwrap();

        let outcome = execute(
            StoreJob::Update {
                id,
                edit: DecalEdit::ToggleForceOnVip,
                requested_by: PlayerId::new("1"),
            },
            &store,
        );

        assert!(matches!(
            outcome,
            StoreOutcome::Failed {
                error: DecalError::Validation(ValidationError::DecalNotFound { .. }),
                ..
            }
        ));
    }

    #[test]
    fn toggle_preference_writes_false_for_missing_row() {
        let store = MemoryDecalStore::default();
        let player = PlayerId::new("76561198000000001");

        let outcome = execute(
            StoreJob::TogglePreference {
                player: player.clone(),
            },
            &store,
        );

        assert!(matches!(
            outcome,
            StoreOutcome::PreferenceToggled { enabled: false, .. }
        ));
        assert!(!store.get_preference(&player).unwrap());
    }
}
