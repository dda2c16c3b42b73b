use bevy::prelude::*;
use hexx::Hex;
use serde::{Deserialize, Serialize};

use crate::math::Edge;

/// Terrain a painted hex can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Plains,
    Forest,
    Mountain,
    Water,
    Desert,
    Swamp,
    Hill,
    Road,
}

impl Terrain {
    /// Palette order.
    pub const ALL: [Terrain; 8] = [
        Terrain::Plains,
        Terrain::Forest,
        Terrain::Mountain,
        Terrain::Water,
        Terrain::Desert,
        Terrain::Swamp,
        Terrain::Hill,
        Terrain::Road,
    ];

    /// Fill colour as `0xRRGGBB`.
    pub fn color(self) -> u32 {
        match self {
            Terrain::Plains => 0x90EE90,
            Terrain::Forest => 0x228B22,
            Terrain::Mountain => 0x696969,
            Terrain::Water => 0x1E90FF,
            Terrain::Desert => 0xDEB887,
            Terrain::Swamp => 0x556B2F,
            Terrain::Hill => 0x8B7355,
            Terrain::Road => 0xF5DEB3,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Terrain::Plains => "🌾",
            Terrain::Forest => "🌲",
            Terrain::Mountain => "⛰",
            Terrain::Water => "🌊",
            Terrain::Desert => "🏜",
            Terrain::Swamp => "🐸",
            Terrain::Hill => "🗻",
            Terrain::Road => "🛤",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Terrain::Plains => "Plains",
            Terrain::Forest => "Forest",
            Terrain::Mountain => "Mountain",
            Terrain::Water => "Water",
            Terrain::Desert => "Desert",
            Terrain::Swamp => "Swamp",
            Terrain::Hill => "Hill",
            Terrain::Road => "Road",
        }
    }
}

/// Political weight of a border line; heavier borders draw wider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStrength {
    Local,
    Regional,
    National,
}

impl BorderStrength {
    pub const ALL: [BorderStrength; 3] = [
        BorderStrength::Local,
        BorderStrength::Regional,
        BorderStrength::National,
    ];

    /// Line colour as `0xRRGGBB`.
    pub fn color(self) -> u32 {
        match self {
            BorderStrength::Local => 0xFFD700,
            BorderStrength::Regional => 0x4169E1,
            BorderStrength::National => 0xB33A2B,
        }
    }

    /// Line width at zoom 1.
    pub fn width(self) -> f32 {
        match self {
            BorderStrength::Local => 2.0,
            BorderStrength::Regional => 3.0,
            BorderStrength::National => 4.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BorderStrength::Local => "Local",
            BorderStrength::Regional => "Regional",
            BorderStrength::National => "National",
        }
    }
}

/// Water course running along a hex edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiverKind {
    River,
    Stream,
}

impl RiverKind {
    pub const ALL: [RiverKind; 2] = [RiverKind::River, RiverKind::Stream];

    /// Line colour as `0xRRGGBB`.
    pub fn color(self) -> u32 {
        match self {
            RiverKind::River => 0x1E90FF,
            RiverKind::Stream => 0x87CEEB,
        }
    }

    /// Line width at zoom 1; also the peak-to-peak height of the wave.
    pub fn width(self) -> f32 {
        match self {
            RiverKind::River => 4.0,
            RiverKind::Stream => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiverKind::River => "River",
            RiverKind::Stream => "Stream",
        }
    }
}

/// Attributes carried through the editor untouched and saved back as loaded.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct TileAttributes {
    pub is_passable: bool,
    pub movement_cost: i32,
    pub elevation: i32,
    pub terrain_name: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    /// Backend fields the editor has no use for (e.g. `paths`), written back
    /// as they came.
    #[reflect(ignore)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for TileAttributes {
    fn default() -> Self {
        Self {
            is_passable: true,
            movement_cost: 1,
            elevation: 0,
            terrain_name: None,
            description: None,
            notes: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Everything stored for one hex.
///
/// A tile with no terrain, no borders, no rivers and no roads is *empty*;
/// the store never keeps empty tiles.
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct Tile {
    pub hex: Hex,
    pub terrain: Option<Terrain>,
    /// Border per edge, indexed by [`Edge::index`].
    pub borders: [Option<BorderStrength>; 6],
    /// River per edge. Unlike roads, rivers belong to one side of the edge.
    pub rivers: [Option<RiverKind>; 6],
    /// Road flag per edge, indexed by [`Edge::index`].
    pub roads: [bool; 6],
    pub attributes: TileAttributes,
}

impl Tile {
    /// A blank tile at `hex` with default attributes.
    pub fn new(hex: Hex) -> Self {
        Self {
            hex,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terrain.is_none()
            && self.borders.iter().all(Option::is_none)
            && self.rivers.iter().all(Option::is_none)
            && !self.roads.iter().any(|&r| r)
    }

    pub fn border(&self, edge: Edge) -> Option<BorderStrength> {
        self.borders[edge.index()]
    }

    pub fn river(&self, edge: Edge) -> Option<RiverKind> {
        self.rivers[edge.index()]
    }

    pub fn road(&self, edge: Edge) -> bool {
        self.roads[edge.index()]
    }

    /// Edges carrying a border, with their strength.
    pub fn border_edges(&self) -> impl Iterator<Item = (Edge, BorderStrength)> + '_ {
        Edge::ALL
            .into_iter()
            .filter_map(|e| self.border(e).map(|s| (e, s)))
    }

    pub fn river_edges(&self) -> impl Iterator<Item = (Edge, RiverKind)> + '_ {
        Edge::ALL
            .into_iter()
            .filter_map(|e| self.river(e).map(|k| (e, k)))
    }

    /// Edges carrying a road.
    pub fn road_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        Edge::ALL.into_iter().filter(|&e| self.road(e))
    }
}

/// Server-assigned marker identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub i64);

/// What a marker represents; drives its glyph and default styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Village,
    Town,
    City,
    Castle,
    Fort,
    Ruins,
    Poi,
    Encounter,
    Treasure,
    Note,
    AreaLabel,
}

impl MarkerKind {
    /// Kinds offered by the settlement tool.
    pub const SETTLEMENTS: [MarkerKind; 6] = [
        MarkerKind::Village,
        MarkerKind::Town,
        MarkerKind::City,
        MarkerKind::Castle,
        MarkerKind::Fort,
        MarkerKind::Ruins,
    ];

    /// Default colour as a CSS hex string.
    pub fn default_color(self) -> &'static str {
        match self {
            MarkerKind::Village => "#8B7355",
            MarkerKind::Town => "#9C7C38",
            MarkerKind::City => "#B08F43",
            MarkerKind::Castle => "#6B4423",
            MarkerKind::Fort => "#8B4513",
            MarkerKind::Ruins => "#696969",
            MarkerKind::AreaLabel => "#FFD700",
            _ => "#FF0000",
        }
    }

    /// Default icon class name stored with the marker.
    pub fn default_icon(self) -> &'static str {
        match self {
            MarkerKind::Village => "fa-home",
            MarkerKind::Town => "fa-city",
            MarkerKind::City => "fa-building",
            MarkerKind::Castle => "fa-chess-rook",
            MarkerKind::Fort => "fa-shield-alt",
            MarkerKind::Ruins => "fa-monument",
            MarkerKind::AreaLabel => "fa-sign",
            _ => "fa-map-marker-alt",
        }
    }

    /// Glyph drawn on the map.
    pub fn symbol(self) -> &'static str {
        match self {
            MarkerKind::Village => "🏘",
            MarkerKind::Town => "🏙",
            MarkerKind::City => "🏛",
            MarkerKind::Castle => "🏰",
            MarkerKind::Fort => "🏯",
            MarkerKind::Ruins => "🏚",
            MarkerKind::Encounter => "⚔",
            MarkerKind::Treasure => "💰",
            MarkerKind::Note => "📝",
            MarkerKind::Poi | MarkerKind::AreaLabel => "📍",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MarkerKind::Village => "Village",
            MarkerKind::Town => "Town",
            MarkerKind::City => "City",
            MarkerKind::Castle => "Castle",
            MarkerKind::Fort => "Fort",
            MarkerKind::Ruins => "Ruins",
            MarkerKind::Poi => "Point of interest",
            MarkerKind::Encounter => "Encounter",
            MarkerKind::Treasure => "Treasure",
            MarkerKind::Note => "Note",
            MarkerKind::AreaLabel => "Area label",
        }
    }

    /// Area labels are visible to players by default; everything else is not.
    pub fn visible_by_default(self) -> bool {
        self == MarkerKind::AreaLabel
    }
}

/// A named point placed on a hex, independent of the tile data.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct Marker {
    pub id: MarkerId,
    pub hex: Hex,
    pub kind: MarkerKind,
    pub name: String,
    /// CSS hex string, e.g. `#8B7355`.
    pub color: String,
    pub icon: String,
    pub visible_to_players: bool,
}

/// A marker the user asked for but the backend has not yet assigned an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMarker {
    pub hex: Hex,
    pub kind: MarkerKind,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub visible_to_players: bool,
}

impl NewMarker {
    /// A marker of `kind` with its default styling.
    pub fn with_defaults(hex: Hex, kind: MarkerKind, name: impl Into<String>) -> Self {
        Self {
            hex,
            kind,
            name: name.into(),
            color: kind.default_color().to_owned(),
            icon: kind.default_icon().to_owned(),
            visible_to_players: kind.visible_by_default(),
        }
    }

    /// Attaches the id the backend assigned.
    pub fn into_marker(self, id: MarkerId) -> Marker {
        Marker {
            id,
            hex: self.hex,
            kind: self.kind,
            name: self.name,
            color: self.color,
            icon: self.icon,
            visible_to_players: self.visible_to_players,
        }
    }
}

/// Smallest hex size accepted from map metadata.
pub const MIN_HEX_SIZE: f32 = 10.0;

/// Map metadata: identity and the bounds of the background grid.
#[derive(Resource, Clone, Debug, PartialEq, Reflect)]
pub struct MapMeta {
    pub map_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub width_hexes: u32,
    pub height_hexes: u32,
    hex_size_pixels: f32,
}

impl MapMeta {
    pub fn new(map_id: i64, name: impl Into<String>, width: u32, height: u32, hex_size: f32) -> Self {
        Self {
            map_id,
            name: name.into(),
            description: None,
            width_hexes: width,
            height_hexes: height,
            hex_size_pixels: hex_size.max(MIN_HEX_SIZE),
        }
    }

    /// Hex radius at zoom 1, never below [`MIN_HEX_SIZE`].
    pub fn hex_size(&self) -> f32 {
        self.hex_size_pixels
    }

    pub fn set_hex_size(&mut self, size: f32) {
        self.hex_size_pixels = size.max(MIN_HEX_SIZE);
    }

    /// Whether `hex` lies in the `q ∈ [−⌊w/2⌋, ⌊w/2⌋]`, `r ∈ [−⌊h/2⌋, ⌊h/2⌋]` box.
    pub fn contains(&self, hex: Hex) -> bool {
        let hw = (self.width_hexes / 2) as i32;
        let hh = (self.height_hexes / 2) as i32;
        (-hw..=hw).contains(&hex.x) && (-hh..=hh).contains(&hex.y)
    }
}

impl Default for MapMeta {
    fn default() -> Self {
        Self::new(0, "Untitled map", 20, 20, 50.0)
    }
}
