//! Map data: tiles, markers and metadata of the map being edited.
//!
//! The stores are plain resources; nothing here talks to the backend.

mod entities;
mod marker_store;
mod tile_store;

pub use entities::{
    BorderStrength, MIN_HEX_SIZE, MapMeta, Marker, MarkerId, MarkerKind, NewMarker, RiverKind,
    Terrain, Tile, TileAttributes,
};
pub use marker_store::MarkerStore;
pub use tile_store::{SaveDiff, TileStore, TileWrite};

use bevy::prelude::*;

/// Map plugin: registers the map resources.
pub struct MapPlugin;

impl Plugin for MapPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<MapMeta>()
            .register_type::<Terrain>()
            .register_type::<BorderStrength>()
            .register_type::<RiverKind>()
            .register_type::<MarkerKind>()
            .init_resource::<MapMeta>()
            .init_resource::<TileStore>()
            .init_resource::<MarkerStore>();
    }
}
