//! Map rendering: a pure draw-list builder plus the egui surface that
//! paints it.

mod commands;
mod surface;

pub use commands::{
    DrawCommand, Frame, Stroke, TextAnchor, TextBackdrop, hovered_edge, render,
};
pub use surface::paint;

use bevy::prelude::*;

/// Zoom thresholds for the level-of-detail rules.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct RenderConfig {
    /// Terrain glyphs appear above this zoom, at reduced size.
    pub glyph_min_zoom: f32,
    /// Above this zoom terrain glyphs are drawn at full size.
    pub glyph_full_zoom: f32,
    /// Coordinate captions need this much zoom (and the toggle).
    pub coordinates_min_zoom: f32,
    /// Marker names are hidden at or below this zoom.
    pub label_min_zoom: f32,
    /// Window clear colour behind the egui canvas.
    pub clear_color: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            glyph_min_zoom: 0.4,
            glyph_full_zoom: 0.6,
            coordinates_min_zoom: 1.5,
            label_min_zoom: 0.5,
            clear_color: Color::srgb_u8(0x1a, 0x1a, 0x1a),
        }
    }
}

/// Render plugin: installs the level-of-detail settings. Painting itself is
/// driven by the editor canvas.
pub struct RenderPlugin(pub RenderConfig);

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<RenderConfig>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(self.0.clear_color));
    }
}
