//! Persistence: backend API, write-behind queue and full-map save.
//!
//! Backend calls block, so every call runs on Bevy's I/O task pool and is
//! polled from `Update`. Point edits go through [`WriteBehindQueue`]; a
//! [`SaveRequested`] message triggers a full save.

pub mod api;
pub mod local;
pub mod queue;
mod systems;

pub use api::{ApiError, ApiResponse, MapApi};
pub use local::LocalApi;
pub use queue::{Notice, NoticeLevel, PersistJob, WriteBehindQueue};
pub use systems::{ApiClient, PendingTasks};

use std::path::PathBuf;

use bevy::prelude::*;

use crate::EditorState;

/// Which map to open and where the local backend keeps its data.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct PersistenceConfig {
    /// Map loaded on startup and on retry.
    pub map_id: i64,
    /// JSON database file; `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            map_id: local::SEED_MAP_ID,
            data_path: Some(PathBuf::from("hex-maps.json")),
        }
    }
}

/// Ask for a full save of metadata and tiles.
#[derive(Message, Clone, Copy, Debug, Default)]
pub struct SaveRequested;

/// A map finished loading and the stores hold its contents.
#[derive(Message, Clone, Copy, Debug, Default)]
pub struct MapLoaded;

/// Why the last load failed; present only in [`EditorState::LoadFailed`].
#[derive(Resource, Clone, Debug, Reflect)]
pub struct LoadError(pub String);

/// Latest user-facing result of a backend operation.
#[derive(Resource, Default, Clone, Debug, Reflect)]
pub struct StatusNotice(pub Option<Notice>);

/// Persistence plugin: map loading, write-behind queue, full save.
pub struct PersistencePlugin(pub PersistenceConfig);

impl Plugin for PersistencePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PersistenceConfig>()
            .register_type::<StatusNotice>()
            .insert_resource(self.0.clone())
            .init_resource::<WriteBehindQueue>()
            .init_resource::<PendingTasks>()
            .init_resource::<StatusNotice>()
            .add_message::<SaveRequested>()
            .add_message::<MapLoaded>()
            .add_systems(OnEnter(EditorState::Loading), systems::start_load)
            .add_systems(
                Update,
                systems::finish_load.run_if(in_state(EditorState::Loading)),
            )
            .add_systems(
                Update,
                (
                    systems::collect_jobs,
                    systems::collect_save,
                    systems::start_save,
                    systems::dispatch_jobs,
                )
                    .chain()
                    .run_if(in_state(EditorState::Editing).or(in_state(EditorState::Debugging))),
            );
    }
}
