//! Hex map editor for tabletop campaigns.
//!
//! Paints terrain, borders, roads and markers onto an axial hex grid and
//! keeps a backend in sync through a write-behind queue plus an explicit
//! full save. The pieces are Bevy plugins so the binary only wires them up.

pub mod editor;
pub mod map;
pub mod math;
pub mod persistence;
pub mod render;

use bevy::prelude::*;

/// Application flow, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum EditorState {
    /// Fetching the configured map from the backend.
    #[default]
    Loading,
    /// Normal editing.
    Editing,
    /// The map could not be fetched; the reason is shown with a retry button.
    LoadFailed,
    /// Editing with the world inspector open (Tab to toggle).
    Debugging,
}
