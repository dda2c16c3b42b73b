//! Write-behind queue and the blocking job bodies it runs.
//!
//! Edits land in the stores immediately; the matching backend writes are
//! queued here and sent one at a time, oldest first. The persisted-key set in
//! [`TileStore`] only moves when the backend confirms a write, so it always
//! reflects the order the backend applied them in.

use std::collections::VecDeque;

use bevy::log::{error, info, warn};
use bevy::prelude::*;
use hexx::Hex;

use super::api::{MapApi, MapRecord, MarkerRecord, TileRecord};
use crate::map::{Marker, MarkerId, MarkerStore, NewMarker, SaveDiff, Tile, TileStore, TileWrite};

/// One backend write.
#[derive(Clone, Debug, PartialEq)]
pub enum PersistJob {
    UpsertTile(Tile),
    DeleteTile(Hex),
    CreateMarker(NewMarker),
    DeleteMarker(MarkerId),
}

impl From<TileWrite> for PersistJob {
    fn from(write: TileWrite) -> Self {
        match write {
            TileWrite::Upsert(tile) => PersistJob::UpsertTile(tile),
            TileWrite::Delete(hex) => PersistJob::DeleteTile(hex),
        }
    }
}

/// Result of running a [`PersistJob`].
#[derive(Clone, Debug, PartialEq)]
pub enum JobOutcome {
    TileUpserted(Hex),
    TileDeleted(Hex),
    MarkerCreated(Marker),
    MarkerDeleted(MarkerId),
    Failed { job: PersistJob, error: String },
}

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Short user-facing message about a finished backend operation.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// FIFO of pending writes with at most one in flight.
#[derive(Resource, Default, Debug)]
pub struct WriteBehindQueue {
    pending: VecDeque<PersistJob>,
    in_flight: Option<PersistJob>,
}

impl WriteBehindQueue {
    pub fn push(&mut self, job: impl Into<PersistJob>) {
        self.pending.push_back(job.into());
    }

    pub fn extend<J: Into<PersistJob>>(&mut self, jobs: impl IntoIterator<Item = J>) {
        self.pending.extend(jobs.into_iter().map(Into::into));
    }

    /// Hands out the oldest job unless one is already in flight.
    pub fn start_next(&mut self) -> Option<PersistJob> {
        if self.in_flight.is_some() {
            return None;
        }
        let job = self.pending.pop_front()?;
        self.in_flight = Some(job.clone());
        Some(job)
    }

    /// The in-flight job completed, successfully or not.
    pub fn finish(&mut self) {
        self.in_flight = None;
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Nothing pending and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.pending.is_empty()
    }

    /// Whether a delete of marker `id` is queued or in flight.
    pub fn deletes_marker(&self, id: MarkerId) -> bool {
        self.in_flight
            .iter()
            .chain(&self.pending)
            .any(|job| *job == PersistJob::DeleteMarker(id))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops queued work, e.g. when another map is loaded.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Runs one job against the backend. Blocking.
pub fn execute(api: &dyn MapApi, map_id: i64, job: PersistJob) -> JobOutcome {
    let result = match &job {
        PersistJob::UpsertTile(tile) => api
            .upsert_tile(map_id, &TileRecord::from(tile))
            .into_ack()
            .map(|()| JobOutcome::TileUpserted(tile.hex)),
        PersistJob::DeleteTile(hex) => api
            .delete_tile(map_id, hex.x, hex.y)
            .into_ack()
            .map(|()| JobOutcome::TileDeleted(*hex)),
        PersistJob::CreateMarker(marker) => api
            .create_marker(map_id, &MarkerRecord::from(marker))
            .into_result()
            .map(|record| match record.into_marker() {
                Some(m) => JobOutcome::MarkerCreated(m),
                None => JobOutcome::Failed {
                    job: PersistJob::CreateMarker(marker.clone()),
                    error: "backend returned a marker without an id".to_owned(),
                },
            }),
        PersistJob::DeleteMarker(id) => api
            .delete_marker(id.0)
            .into_ack()
            .map(|()| JobOutcome::MarkerDeleted(*id)),
    };
    result.unwrap_or_else(|err| JobOutcome::Failed {
        job,
        error: err.to_string(),
    })
}

/// Applies a finished job to the stores.
///
/// Failed tile writes keep the in-memory edit and skip the bookkeeping; the
/// next full save sends the tile again.
pub fn apply_outcome(
    outcome: JobOutcome,
    tiles: &mut TileStore,
    markers: &mut MarkerStore,
) -> Option<Notice> {
    match outcome {
        JobOutcome::TileUpserted(hex) => {
            tiles.confirm_upsert(hex);
            None
        }
        JobOutcome::TileDeleted(hex) => {
            tiles.confirm_delete(hex);
            None
        }
        JobOutcome::MarkerCreated(marker) => {
            let text = format!("{} \"{}\" placed", marker.kind.label(), marker.name);
            markers.insert(marker);
            Some(Notice::success(text))
        }
        JobOutcome::MarkerDeleted(id) => {
            markers.remove(id);
            Some(Notice::success("Marker deleted"))
        }
        JobOutcome::Failed { job, error } => match job {
            PersistJob::UpsertTile(tile) => {
                warn!("saving tile {:?} failed, keeping local edit: {error}", tile.hex);
                None
            }
            PersistJob::DeleteTile(hex) => {
                warn!("deleting tile {hex:?} failed, keeping local edit: {error}");
                None
            }
            PersistJob::CreateMarker(marker) => {
                error!("placing marker at {:?} failed: {error}", marker.hex);
                Some(Notice::error(format!("Failed to place marker: {error}")))
            }
            PersistJob::DeleteMarker(id) => {
                error!("deleting marker {id:?} failed: {error}");
                Some(Notice::error(format!("Failed to delete marker: {error}")))
            }
        },
    }
}

/// Result of a full save.
#[derive(Debug, PartialEq)]
pub struct SaveReport {
    /// `Err` when the metadata or the tile batch was rejected.
    pub result: Result<usize, String>,
    /// Keys sent in the tile batch.
    pub upserted: Vec<Hex>,
    /// Deletions the backend refused; the tiles are still stored there.
    pub failed_deletes: Vec<Hex>,
}

/// Sends metadata, deletions and the full tile batch. Blocking.
///
/// Deletions are attempted one by one and never abort the save.
pub fn execute_save(api: &dyn MapApi, meta: MapRecord, diff: SaveDiff) -> SaveReport {
    let map_id = meta.map_id;
    let upserted: Vec<Hex> = diff.to_upsert.iter().map(|t| t.hex).collect();

    if let Err(err) = api.update_map(&meta).into_ack() {
        return SaveReport {
            result: Err(format!("saving map details failed: {err}")),
            upserted,
            failed_deletes: diff.to_delete,
        };
    }

    let failed_deletes: Vec<Hex> = diff
        .to_delete
        .into_iter()
        .filter(|hex| match api.delete_tile(map_id, hex.x, hex.y).into_ack() {
            Ok(()) => false,
            Err(err) => {
                warn!("deleting tile {hex:?} during save failed: {err}");
                true
            }
        })
        .collect();

    let records: Vec<TileRecord> = diff.to_upsert.iter().map(TileRecord::from).collect();
    let result = match api.batch_upsert_tiles(map_id, &records).into_ack() {
        Ok(()) => {
            info!(
                "saved map {map_id}: {} tile(s), {} deletion(s) pending",
                records.len(),
                failed_deletes.len()
            );
            Ok(records.len())
        }
        Err(err) => Err(format!("saving tiles failed: {err}")),
    };

    SaveReport {
        result,
        upserted,
        failed_deletes,
    }
}

/// Folds a finished save into the tile store.
pub fn apply_save(report: SaveReport, tiles: &mut TileStore) -> Notice {
    match report.result {
        Ok(count) => {
            tiles.mark_saved(report.upserted, report.failed_deletes);
            Notice::success(format!("Map saved ({count} tiles)"))
        }
        Err(err) => {
            error!("{err}");
            Notice::error(format!("Failed to save map: {err}"))
        }
    }
}
