use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task, block_on};

use super::api::{ApiError, MapApi, MapRecord, MapWithTiles, MarkerRecord};
use super::local::LocalApi;
use super::queue::{self, JobOutcome, SaveReport, WriteBehindQueue};
use super::{LoadError, MapLoaded, PersistenceConfig, SaveRequested, StatusNotice};
use crate::EditorState;
use crate::map::{MapMeta, MarkerStore, Tile, TileStore};

/// Shared handle to the backend.
#[derive(Resource, Clone)]
pub struct ApiClient(pub Arc<dyn MapApi>);

impl ApiClient {
    pub fn new(api: impl MapApi) -> Self {
        Self(Arc::new(api))
    }
}

/// Everything fetched for one map.
struct LoadedMap {
    map: MapWithTiles,
    markers: Vec<MarkerRecord>,
}

/// Fetches the map, then its markers. Either failing fails the load.
fn fetch_map(api: &dyn MapApi, map_id: i64) -> Result<LoadedMap, ApiError> {
    let map = api.get_map(map_id).into_result()?;
    let markers = api.list_markers(map_id).into_result()?;
    Ok(LoadedMap { map, markers })
}

/// Backend calls currently running on the I/O pool.
#[derive(Resource, Default)]
pub struct PendingTasks {
    load: Option<Task<Result<LoadedMap, ApiError>>>,
    job: Option<Task<JobOutcome>>,
    save: Option<Task<SaveReport>>,
    /// A save was requested while a point write was in flight.
    save_waiting: bool,
}

impl PendingTasks {
    /// True while any backend call is outstanding or a save is waiting.
    pub fn is_active(&self) -> bool {
        self.load.is_some() || self.job.is_some() || self.save.is_some() || self.save_waiting
    }

    pub fn is_saving(&self) -> bool {
        self.save.is_some() || self.save_waiting
    }
}

fn poll<T>(slot: &mut Option<Task<T>>) -> Option<T> {
    let task = slot.as_mut()?;
    let result = block_on(futures_lite::future::poll_once(task))?;
    *slot = None;
    Some(result)
}

// ── Loading ────────────────────────────────────────────────────────

/// Opens the configured backend unless one was inserted up front.
fn ensure_client(
    commands: &mut Commands,
    client: Option<&ApiClient>,
    config: &PersistenceConfig,
) -> Result<ApiClient, ApiError> {
    if let Some(client) = client {
        return Ok(client.clone());
    }
    let client = match &config.data_path {
        Some(path) => ApiClient::new(LocalApi::open(path)?),
        None => {
            warn!("no data file configured, edits will not outlive this session");
            ApiClient::new(LocalApi::in_memory())
        }
    };
    commands.insert_resource(client.clone());
    Ok(client)
}

/// Starts fetching the configured map. Runs on entering [`EditorState::Loading`].
pub fn start_load(
    mut commands: Commands,
    client: Option<Res<ApiClient>>,
    config: Res<PersistenceConfig>,
    mut tasks: ResMut<PendingTasks>,
    mut writes: ResMut<WriteBehindQueue>,
    mut next: ResMut<NextState<EditorState>>,
) {
    let client = match ensure_client(&mut commands, client.as_deref(), &config) {
        Ok(client) => client,
        Err(err) => {
            error!("opening map backend failed: {err}");
            commands.insert_resource(LoadError(err.to_string()));
            next.set(EditorState::LoadFailed);
            return;
        }
    };

    writes.clear();
    let map_id = config.map_id;
    info!("loading map {map_id}");
    let api = client.0;
    tasks.load = Some(
        IoTaskPool::get().spawn(async move { fetch_map(&*api, map_id) }),
    );
}

/// Installs the fetched map, or records why it could not be fetched.
pub fn finish_load(
    mut commands: Commands,
    mut tasks: ResMut<PendingTasks>,
    mut meta: ResMut<MapMeta>,
    mut tiles: ResMut<TileStore>,
    mut markers: ResMut<MarkerStore>,
    mut loaded: MessageWriter<MapLoaded>,
    mut next: ResMut<NextState<EditorState>>,
) {
    let Some(result) = poll(&mut tasks.load) else {
        return;
    };
    match result {
        Ok(data) => {
            *meta = MapMeta::from(data.map.map);
            tiles.load(data.map.tiles.into_iter().map(Tile::from));
            markers.load(data.markers.into_iter().filter_map(|m| m.into_marker()));
            info!(
                "map {} \"{}\" loaded: {}x{} hexes, {} tiles, {} markers",
                meta.map_id,
                meta.name,
                meta.width_hexes,
                meta.height_hexes,
                tiles.len(),
                markers.len()
            );
            commands.remove_resource::<LoadError>();
            loaded.write(MapLoaded);
            next.set(EditorState::Editing);
        }
        Err(err) => {
            error!("loading map failed: {err}");
            commands.insert_resource(LoadError(err.to_string()));
            next.set(EditorState::LoadFailed);
        }
    }
}

// ── Write-behind ───────────────────────────────────────────────────

/// Sends the next queued write once the previous one (and any save) is done.
pub fn dispatch_jobs(
    client: Option<Res<ApiClient>>,
    meta: Res<MapMeta>,
    mut tasks: ResMut<PendingTasks>,
    mut writes: ResMut<WriteBehindQueue>,
) {
    let Some(client) = client else { return };
    if tasks.job.is_some() || tasks.is_saving() {
        return;
    }
    let Some(job) = writes.start_next() else {
        return;
    };
    debug!("dispatching {job:?}");
    let api = client.0.clone();
    let map_id = meta.map_id;
    tasks.job = Some(IoTaskPool::get().spawn(async move { queue::execute(&*api, map_id, job) }));
}

/// Applies a finished write to the stores.
pub fn collect_jobs(
    mut tasks: ResMut<PendingTasks>,
    mut writes: ResMut<WriteBehindQueue>,
    mut tiles: ResMut<TileStore>,
    mut markers: ResMut<MarkerStore>,
    mut notice: ResMut<StatusNotice>,
) {
    let Some(outcome) = poll(&mut tasks.job) else {
        return;
    };
    writes.finish();
    if let Some(n) = queue::apply_outcome(outcome, &mut tiles, &mut markers) {
        notice.0 = Some(n);
    }
}

// ── Full save ──────────────────────────────────────────────────────

/// Starts a full save when requested, after any in-flight write finishes.
pub fn start_save(
    mut requests: MessageReader<SaveRequested>,
    client: Option<Res<ApiClient>>,
    meta: Res<MapMeta>,
    tiles: Res<TileStore>,
    mut tasks: ResMut<PendingTasks>,
) {
    if requests.read().count() > 0 && tasks.save.is_none() {
        tasks.save_waiting = true;
    }
    if !tasks.save_waiting || tasks.job.is_some() {
        return;
    }
    let Some(client) = client else { return };

    tasks.save_waiting = false;
    let diff = tiles.diff_for_save();
    info!(
        "saving map {}: {} upserts, {} deletions",
        meta.map_id,
        diff.to_upsert.len(),
        diff.to_delete.len()
    );
    let api = client.0.clone();
    let record = MapRecord::from(&*meta);
    tasks.save = Some(
        IoTaskPool::get().spawn(async move { queue::execute_save(&*api, record, diff) }),
    );
}

/// Folds a finished save into the tile store and reports it.
pub fn collect_save(
    mut tasks: ResMut<PendingTasks>,
    mut tiles: ResMut<TileStore>,
    mut notice: ResMut<StatusNotice>,
) {
    let Some(report) = poll(&mut tasks.save) else {
        return;
    };
    notice.0 = Some(queue::apply_save(report, &mut tiles));
}

