//! Interactive editing: tools, pan and zoom, the egui side panel and the map
//! canvas.

mod controller;
mod entities;
mod systems;

pub use controller::{Session, center_view};
pub use entities::{
    EditorRes, EditorViewState, MarkerPrompt, PanOrigin, PendingPrompt, PointerButton,
    PointerEvent, PointerState, Reaction, Tool, ToolKind,
};

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

use crate::EditorState;

/// Zoom limits and view defaults.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct EditorConfig {
    /// Lower zoom clamp.
    pub min_zoom: f32,
    /// Upper zoom clamp.
    pub max_zoom: f32,
    /// Factor applied by the zoom buttons.
    pub zoom_step: f32,
    /// Initial state of the coordinate overlay for each loaded map.
    pub show_coordinates: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.2,
            max_zoom: 5.0,
            zoom_step: 1.2,
            show_coordinates: false,
        }
    }
}

/// Editor plugin: view state, pointer handling and all egui panels.
pub struct EditorPlugin(pub EditorConfig);

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<EditorConfig>()
            .register_type::<EditorViewState>()
            .register_type::<PointerState>()
            .insert_resource(self.0.clone())
            .init_resource::<EditorViewState>()
            .init_resource::<PointerState>()
            .init_resource::<PendingPrompt>()
            .add_systems(Update, systems::reset_on_load)
            .add_systems(
                EguiPrimaryContextPass,
                (systems::tool_panel, systems::canvas, systems::marker_prompt)
                    .chain()
                    .run_if(in_state(EditorState::Editing).or(in_state(EditorState::Debugging))),
            )
            .add_systems(
                EguiPrimaryContextPass,
                systems::loading_screen.run_if(in_state(EditorState::Loading)),
            )
            .add_systems(
                EguiPrimaryContextPass,
                systems::load_failed_screen.run_if(in_state(EditorState::LoadFailed)),
            );
    }
}
