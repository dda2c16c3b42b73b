//! File-backed [`MapApi`] used when no remote backend is configured.
//!
//! The whole database is one JSON document. Every mutating call rewrites it
//! with the write-rename pattern so a crash mid-write leaves the previous
//! version intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bevy::log::{debug, info};
use serde::{Deserialize, Serialize};

use super::api::{
    ApiError, ApiResponse, BatchResult, MapApi, MapRecord, MapWithTiles, MarkerRecord, TileRecord,
};

/// Id of the map created in a fresh database.
pub const SEED_MAP_ID: i64 = 1;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct LocalDb {
    maps: Vec<StoredMap>,
    #[serde(default)]
    next_marker_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredMap {
    map: MapRecord,
    #[serde(default)]
    tiles: Vec<TileRecord>,
    #[serde(default)]
    markers: Vec<MarkerRecord>,
}

impl LocalDb {
    fn seeded() -> Self {
        Self {
            maps: vec![StoredMap {
                map: MapRecord {
                    map_id: SEED_MAP_ID,
                    map_name: "New map".to_owned(),
                    map_description: None,
                    width_hexes: 20,
                    height_hexes: 20,
                    hex_size_pixels: 50.0,
                },
                tiles: Vec::new(),
                markers: Vec::new(),
            }],
            next_marker_id: 1,
        }
    }

    fn map(&self, map_id: i64) -> Result<&StoredMap, ApiError> {
        self.maps
            .iter()
            .find(|m| m.map.map_id == map_id)
            .ok_or_else(|| ApiError::Rejected(format!("map {map_id} not found")))
    }

    fn map_mut(&mut self, map_id: i64) -> Result<&mut StoredMap, ApiError> {
        self.maps
            .iter_mut()
            .find(|m| m.map.map_id == map_id)
            .ok_or_else(|| ApiError::Rejected(format!("map {map_id} not found")))
    }
}

impl StoredMap {
    fn upsert(&mut self, tile: TileRecord) {
        match self
            .tiles
            .iter_mut()
            .find(|t| t.q == tile.q && t.r == tile.r)
        {
            Some(slot) => *slot = tile,
            None => self.tiles.push(tile),
        }
    }
}

/// In-process backend, optionally mirrored to a JSON file.
pub struct LocalApi {
    db: Mutex<LocalDb>,
    path: Option<PathBuf>,
}

impl LocalApi {
    /// Opens `path`, creating it with a blank 20×20 map when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let db = if path.exists() {
            let text = fs::read_to_string(&path)?;
            let db: LocalDb = serde_json::from_str(&text)?;
            info!("loaded {} map(s) from {}", db.maps.len(), path.display());
            db
        } else {
            info!("creating map database at {}", path.display());
            let db = LocalDb::seeded();
            write_atomic(&path, &serde_json::to_vec_pretty(&db)?)?;
            db
        };
        Ok(Self {
            db: Mutex::new(db),
            path: Some(path),
        })
    }

    /// A seeded database that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            db: Mutex::new(LocalDb::seeded()),
            path: None,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LocalDb>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Unavailable("local database lock poisoned".to_owned()))
    }

    fn read<T>(&self, f: impl FnOnce(&LocalDb) -> Result<T, ApiError>) -> ApiResponse<T> {
        self.lock().and_then(|db| f(&db)).into()
    }

    /// Applies `f` to a copy of the database and swaps it in once the copy
    /// is on disk. Nothing changes when `f` or the flush fails.
    fn write<T>(&self, f: impl FnOnce(&mut LocalDb) -> Result<T, ApiError>) -> ApiResponse<T> {
        let result = self.lock().and_then(|mut db| {
            let mut next = db.clone();
            let value = f(&mut next)?;
            if let Some(path) = &self.path {
                write_atomic(path, &serde_json::to_vec_pretty(&next)?)?;
                debug!("flushed map database to {}", path.display());
            }
            *db = next;
            Ok(value)
        });
        result.into()
    }
}

impl MapApi for LocalApi {
    fn get_map(&self, map_id: i64) -> ApiResponse<MapWithTiles> {
        self.read(|db| {
            let stored = db.map(map_id)?;
            Ok(MapWithTiles {
                map: stored.map.clone(),
                tiles: stored.tiles.clone(),
            })
        })
    }

    fn list_markers(&self, map_id: i64) -> ApiResponse<Vec<MarkerRecord>> {
        self.read(|db| Ok(db.map(map_id)?.markers.clone()))
    }

    fn upsert_tile(&self, map_id: i64, tile: &TileRecord) -> ApiResponse<TileRecord> {
        self.write(|db| {
            db.map_mut(map_id)?.upsert(tile.clone());
            Ok(tile.clone())
        })
    }

    fn delete_tile(&self, map_id: i64, q: i32, r: i32) -> ApiResponse<()> {
        self.write(|db| {
            db.map_mut(map_id)?.tiles.retain(|t| t.q != q || t.r != r);
            Ok(())
        })
    }

    fn batch_upsert_tiles(&self, map_id: i64, tiles: &[TileRecord]) -> ApiResponse<BatchResult> {
        self.write(|db| {
            let stored = db.map_mut(map_id)?;
            for tile in tiles {
                stored.upsert(tile.clone());
            }
            Ok(BatchResult {
                tiles_saved: tiles.len(),
            })
        })
    }

    fn update_map(&self, map: &MapRecord) -> ApiResponse<MapRecord> {
        self.write(|db| {
            let stored = db.map_mut(map.map_id)?;
            stored.map = map.clone();
            Ok(stored.map.clone())
        })
    }

    fn create_marker(&self, map_id: i64, marker: &MarkerRecord) -> ApiResponse<MarkerRecord> {
        self.write(|db| {
            let id = db.next_marker_id.max(1);
            let stored = db.map_mut(map_id)?;
            let record = MarkerRecord {
                marker_id: Some(id),
                ..marker.clone()
            };
            stored.markers.push(record.clone());
            db.next_marker_id = id + 1;
            Ok(record)
        })
    }

    fn delete_marker(&self, marker_id: i64) -> ApiResponse<()> {
        self.write(|db| {
            let before: usize = db.maps.iter().map(|m| m.markers.len()).sum();
            for stored in &mut db.maps {
                stored.markers.retain(|m| m.marker_id != Some(marker_id));
            }
            let after: usize = db.maps.iter().map(|m| m.markers.len()).sum();
            if before == after {
                return Err(ApiError::Rejected(format!("marker {marker_id} not found")));
            }
            Ok(())
        })
    }
}

/// Writes `data` to `{path}.tmp`, syncs it, then renames it over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}
