//! Backend seam: the [`MapApi`] trait, its JSON envelope and wire records.
//!
//! Records mirror the backend's JSON field names. Decoding is lenient about
//! the shapes older rows come back in; encoding always writes the canonical
//! shape.

use std::collections::BTreeMap;

use bevy::log::warn;
use hexx::Hex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::map::{
    BorderStrength, MapMeta, Marker, MarkerId, MarkerKind, NewMarker, RiverKind, Terrain, Tile,
    TileAttributes,
};
use crate::math::Edge;

/// Everything that can go wrong talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("response carried no data")]
    MissingData,
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

/// `{ "status": "success" | "error", "data": ..., "message": ... }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ApiStatus,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: ApiStatus::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Unwraps the payload of a successful response.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self.status {
            ApiStatus::Success => self.data.ok_or(ApiError::MissingData),
            ApiStatus::Error => Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "unknown error".to_owned()),
            )),
        }
    }

    /// Like [`Self::into_result`] but tolerates a missing payload.
    pub fn into_ack(self) -> Result<(), ApiError> {
        match self.status {
            ApiStatus::Success => Ok(()),
            ApiStatus::Error => Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "unknown error".to_owned()),
            )),
        }
    }
}

impl<T> From<Result<T, ApiError>> for ApiResponse<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::error(err.to_string()),
        }
    }
}

/// Operations the editor needs from the map backend.
///
/// Calls block; the persistence systems run them on the I/O task pool.
pub trait MapApi: Send + Sync + 'static {
    /// Map metadata with all tiles. Markers come from [`Self::list_markers`].
    fn get_map(&self, map_id: i64) -> ApiResponse<MapWithTiles>;
    fn list_markers(&self, map_id: i64) -> ApiResponse<Vec<MarkerRecord>>;
    fn upsert_tile(&self, map_id: i64, tile: &TileRecord) -> ApiResponse<TileRecord>;
    fn delete_tile(&self, map_id: i64, q: i32, r: i32) -> ApiResponse<()>;
    fn batch_upsert_tiles(&self, map_id: i64, tiles: &[TileRecord]) -> ApiResponse<BatchResult>;
    fn update_map(&self, map: &MapRecord) -> ApiResponse<MapRecord>;
    /// Returns the stored marker with its assigned id.
    fn create_marker(&self, map_id: i64, marker: &MarkerRecord) -> ApiResponse<MarkerRecord>;
    fn delete_marker(&self, marker_id: i64) -> ApiResponse<()>;
}

/// Payload of [`MapApi::get_map`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapWithTiles {
    pub map: MapRecord,
    #[serde(default)]
    pub tiles: Vec<TileRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub tiles_saved: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub map_id: i64,
    pub map_name: String,
    #[serde(default)]
    pub map_description: Option<String>,
    pub width_hexes: u32,
    pub height_hexes: u32,
    pub hex_size_pixels: f32,
}

impl From<&MapMeta> for MapRecord {
    fn from(meta: &MapMeta) -> Self {
        Self {
            map_id: meta.map_id,
            map_name: meta.name.clone(),
            map_description: meta.description.clone(),
            width_hexes: meta.width_hexes,
            height_hexes: meta.height_hexes,
            hex_size_pixels: meta.hex_size(),
        }
    }
}

impl From<MapRecord> for MapMeta {
    fn from(record: MapRecord) -> Self {
        let mut meta = MapMeta::new(
            record.map_id,
            record.map_name,
            record.width_hexes,
            record.height_hexes,
            record.hex_size_pixels,
        );
        meta.description = record.map_description;
        meta
    }
}

/// One row of the tile table. Fields not listed here are kept in `extra`
/// and written back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub q: i32,
    pub r: i32,
    #[serde(default, deserialize_with = "lenient_terrain")]
    pub terrain_type: Option<Terrain>,
    #[serde(default)]
    pub terrain_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub elevation: Option<i32>,
    #[serde(default = "default_passable", deserialize_with = "lenient_passable")]
    pub is_passable: bool,
    #[serde(default, deserialize_with = "lenient_int")]
    pub movement_cost: Option<i32>,
    #[serde(
        default,
        deserialize_with = "lenient_borders",
        serialize_with = "map_or_null"
    )]
    pub borders: BTreeMap<u8, BorderStrength>,
    #[serde(
        default,
        deserialize_with = "lenient_rivers",
        serialize_with = "map_or_null"
    )]
    pub rivers: BTreeMap<u8, RiverKind>,
    #[serde(
        default,
        deserialize_with = "lenient_roads",
        serialize_with = "map_or_null"
    )]
    pub roads: BTreeMap<u8, bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn default_passable() -> bool {
    true
}

impl TileRecord {
    pub fn hex(&self) -> Hex {
        Hex::new(self.q, self.r)
    }
}

impl From<&Tile> for TileRecord {
    fn from(tile: &Tile) -> Self {
        let a = &tile.attributes;
        Self {
            q: tile.hex.x,
            r: tile.hex.y,
            terrain_type: tile.terrain,
            terrain_name: a.terrain_name.clone(),
            description: a.description.clone(),
            notes: a.notes.clone(),
            elevation: Some(a.elevation),
            is_passable: a.is_passable,
            movement_cost: Some(a.movement_cost),
            borders: tile
                .border_edges()
                .map(|(e, s)| (u8::from(e), s))
                .collect(),
            rivers: tile
                .river_edges()
                .map(|(e, k)| (u8::from(e), k))
                .collect(),
            roads: tile.road_edges().map(|e| (u8::from(e), true)).collect(),
            extra: a.extra.clone(),
        }
    }
}

impl From<TileRecord> for Tile {
    fn from(record: TileRecord) -> Self {
        let defaults = TileAttributes::default();
        let mut tile = Tile::new(record.hex());
        tile.terrain = record.terrain_type;
        tile.attributes = TileAttributes {
            is_passable: record.is_passable,
            movement_cost: record.movement_cost.unwrap_or(defaults.movement_cost),
            elevation: record.elevation.unwrap_or(defaults.elevation),
            terrain_name: record.terrain_name,
            description: record.description,
            notes: record.notes,
            extra: record.extra,
        };
        for (edge, strength) in record.borders {
            if let Some(edge) = Edge::new(edge) {
                tile.borders[edge.index()] = Some(strength);
            }
        }
        for (edge, kind) in record.rivers {
            if let Some(edge) = Edge::new(edge) {
                tile.rivers[edge.index()] = Some(kind);
            }
        }
        for (edge, road) in record.roads {
            if let Some(edge) = Edge::new(edge) {
                tile.roads[edge.index()] = road;
            }
        }
        tile
    }
}

/// One row of the marker table. `marker_id` is absent on create requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_id: Option<i64>,
    pub q: i32,
    pub r: i32,
    #[serde(deserialize_with = "lenient_marker_kind")]
    pub marker_type: MarkerKind,
    #[serde(default)]
    pub marker_name: String,
    #[serde(default)]
    pub marker_icon: Option<String>,
    #[serde(default)]
    pub marker_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_visible_to_players: bool,
}

impl MarkerRecord {
    /// `None` for records the backend has not assigned an id yet.
    pub fn into_marker(self) -> Option<Marker> {
        let id = MarkerId(self.marker_id?);
        let kind = self.marker_type;
        Some(Marker {
            id,
            hex: Hex::new(self.q, self.r),
            kind,
            name: self.marker_name,
            color: self
                .marker_color
                .unwrap_or_else(|| kind.default_color().to_owned()),
            icon: self
                .marker_icon
                .unwrap_or_else(|| kind.default_icon().to_owned()),
            visible_to_players: self.is_visible_to_players,
        })
    }
}

impl From<&NewMarker> for MarkerRecord {
    fn from(marker: &NewMarker) -> Self {
        Self {
            marker_id: None,
            q: marker.hex.x,
            r: marker.hex.y,
            marker_type: marker.kind,
            marker_name: marker.name.clone(),
            marker_icon: Some(marker.icon.clone()),
            marker_color: Some(marker.color.clone()),
            is_visible_to_players: marker.visible_to_players,
        }
    }
}

impl From<&Marker> for MarkerRecord {
    fn from(marker: &Marker) -> Self {
        Self {
            marker_id: Some(marker.id.0),
            q: marker.hex.x,
            r: marker.hex.y,
            marker_type: marker.kind,
            marker_name: marker.name.clone(),
            marker_icon: Some(marker.icon.clone()),
            marker_color: Some(marker.color.clone()),
            is_visible_to_players: marker.visible_to_players,
        }
    }
}

// ── lenient decoding ──────────────────────────────────────────────

fn map_or_null<S, V>(map: &BTreeMap<u8, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    if map.is_empty() {
        serializer.serialize_none()
    } else {
        map.serialize(serializer)
    }
}

/// Accepts an object, a JSON-encoded object string, an array indexed by edge,
/// an empty string or null. Entries that fail to decode are skipped.
fn edge_map<V: DeserializeOwned>(value: Value, field: &str) -> BTreeMap<u8, V> {
    let entries: Vec<(String, Value)> = match value {
        Value::Null => return BTreeMap::new(),
        Value::String(s) if s.trim().is_empty() => return BTreeMap::new(),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::String(_)) | Err(_) => {
                warn!("discarding unparsable {field} value {s:?}");
                return BTreeMap::new();
            }
            Ok(inner) => return edge_map(inner, field),
        },
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => {
            warn!("discarding unexpected {field} value {other}");
            return BTreeMap::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|(key, v)| {
            let edge = key.trim().parse::<u8>().ok().and_then(Edge::new)?;
            let v = serde_json::from_value::<V>(v).ok()?;
            Some((u8::from(edge), v))
        })
        .collect()
}

fn lenient_borders<'de, D>(deserializer: D) -> Result<BTreeMap<u8, BorderStrength>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(edge_map(Value::deserialize(deserializer)?, "borders"))
}

fn lenient_rivers<'de, D>(deserializer: D) -> Result<BTreeMap<u8, RiverKind>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(edge_map(Value::deserialize(deserializer)?, "rivers"))
}

fn lenient_roads<'de, D>(deserializer: D) -> Result<BTreeMap<u8, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<u8, Value> = edge_map(Value::deserialize(deserializer)?, "roads");
    Ok(raw
        .into_iter()
        .filter(|(_, v)| truthy(v).unwrap_or(false))
        .map(|(edge, _)| (edge, true))
        .collect())
}

fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(truthy(&Value::deserialize(deserializer)?).unwrap_or(false))
}

fn lenient_passable<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(truthy(&Value::deserialize(deserializer)?).unwrap_or_else(default_passable))
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_terrain<'de, D>(deserializer: D) -> Result<Option<Terrain>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => {
            let terrain = serde_json::from_value(Value::String(s.clone())).ok();
            if terrain.is_none() {
                warn!("unknown terrain type {s:?}, treating tile as unpainted");
            }
            terrain
        }
        _ => None,
    })
}

fn lenient_marker_kind<'de, D>(deserializer: D) -> Result<MarkerKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or(MarkerKind::Poi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> TileRecord {
        serde_json::from_value(value).unwrap()
    }

    // ── envelope ────────────────────────────────────────────────────

    #[test]
    fn error_envelope_becomes_rejected() {
        let resp: ApiResponse<MapRecord> =
            serde_json::from_value(json!({"status": "error", "message": "no such map"})).unwrap();
        match resp.into_result() {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "no such map"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn success_without_data_is_missing_data_but_acks() {
        let resp: ApiResponse<BatchResult> =
            serde_json::from_value(json!({"status": "success"})).unwrap();
        assert!(resp.clone().into_ack().is_ok());
        assert!(matches!(resp.into_result(), Err(ApiError::MissingData)));
    }

    // ── tile records ────────────────────────────────────────────────

    #[test]
    fn borders_accept_every_stored_shape() {
        let expected: BTreeMap<u8, BorderStrength> =
            [(0, BorderStrength::Local), (3, BorderStrength::National)].into();
        let shapes = [
            json!({"0": "local", "3": "national"}),
            json!("{\"0\":\"local\",\"3\":\"national\"}"),
            json!(["local", null, null, "national"]),
        ];
        for shape in shapes {
            let rec = decode(json!({"q": 0, "r": 0, "borders": shape}));
            assert_eq!(rec.borders, expected, "shape {shape}");
        }
    }

    #[test]
    fn empty_or_broken_borders_decode_as_none() {
        for shape in [json!(null), json!(""), json!("   "), json!("{not json"), json!([]), json!({})] {
            let rec = decode(json!({"q": 1, "r": 2, "borders": shape, "roads": shape}));
            assert!(rec.borders.is_empty(), "shape {shape}");
            assert!(rec.roads.is_empty(), "shape {shape}");
        }
        let rec = decode(json!({"q": 1, "r": 2}));
        assert!(rec.borders.is_empty() && rec.roads.is_empty());
    }

    #[test]
    fn rivers_decode_like_borders_and_drop_unknown_kinds() {
        let rec = decode(json!({"q": 0, "r": 0, "rivers": "{\"1\":\"river\",\"3\":\"stream\",\"4\":\"lava\"}"}));
        assert_eq!(rec.rivers, [(1, RiverKind::River), (3, RiverKind::Stream)].into());
        let rec = decode(json!({"q": 0, "r": 0, "rivers": ""}));
        assert!(rec.rivers.is_empty());
    }

    #[test]
    fn unknown_fields_are_written_back() {
        let rec = decode(json!({
            "q": 2, "r": 0, "terrain_type": "hill",
            "paths": {"2": true}, "tile_id": 41
        }));
        let tile = Tile::from(rec);
        assert_eq!(tile.attributes.extra.get("tile_id"), Some(&json!(41)));

        let value = serde_json::to_value(TileRecord::from(&tile)).unwrap();
        assert_eq!(value["paths"], json!({"2": true}));
        assert_eq!(value["tile_id"], json!(41));
        assert_eq!(value["terrain_type"], json!("hill"));
    }

    #[test]
    fn roads_keep_truthy_edges_only() {
        let rec = decode(json!({"q": 0, "r": 0, "roads": "{\"1\":true,\"2\":false,\"4\":1,\"9\":true}"}));
        assert_eq!(rec.roads, [(1, true), (4, true)].into());
    }

    #[test]
    fn string_and_numeric_scalars_are_accepted() {
        let rec = decode(json!({
            "q": 3, "r": -1, "terrain_type": "forest",
            "is_passable": 0, "movement_cost": "3", "elevation": null
        }));
        assert_eq!(rec.terrain_type, Some(Terrain::Forest));
        assert!(!rec.is_passable);
        let tile = Tile::from(rec);
        assert_eq!(tile.attributes.movement_cost, 3);
        assert_eq!(tile.attributes.elevation, 0);
    }

    #[test]
    fn unknown_terrain_loads_unpainted() {
        let rec = decode(json!({"q": 0, "r": 0, "terrain_type": "high-mountain-peak"}));
        assert_eq!(rec.terrain_type, None);
        assert!(rec.is_passable);
    }

    #[test]
    fn empty_edge_maps_are_written_as_null() {
        let tile = Tile {
            terrain: Some(Terrain::Plains),
            ..Tile::new(Hex::new(2, 2))
        };
        let value = serde_json::to_value(TileRecord::from(&tile)).unwrap();
        assert_eq!(value["borders"], Value::Null);
        assert_eq!(value["roads"], Value::Null);
        assert_eq!(value["rivers"], Value::Null);
        assert_eq!(value["terrain_type"], json!("plains"));
    }

    #[test]
    fn tile_survives_record_conversion() {
        let mut tile = Tile::new(Hex::new(-4, 7));
        tile.terrain = Some(Terrain::Swamp);
        tile.borders[5] = Some(BorderStrength::Regional);
        tile.roads[2] = true;
        tile.rivers[0] = Some(RiverKind::Stream);
        tile.attributes.notes = Some("bog".into());
        let json = serde_json::to_string(&TileRecord::from(&tile)).unwrap();
        let back: TileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(Tile::from(back), tile);
    }

    // ── marker records ──────────────────────────────────────────────

    #[test]
    fn marker_without_styling_gets_kind_defaults() {
        let rec: MarkerRecord = serde_json::from_value(json!({
            "marker_id": 12, "q": 1, "r": 1, "marker_type": "fort",
            "marker_name": "Oakhold", "is_visible_to_players": "1"
        }))
        .unwrap();
        let marker = rec.into_marker().unwrap();
        assert_eq!(marker.color, "#8B4513");
        assert_eq!(marker.icon, "fa-shield-alt");
        assert!(marker.visible_to_players);
    }

    #[test]
    fn unknown_marker_type_falls_back_to_poi() {
        let rec: MarkerRecord = serde_json::from_value(json!({
            "q": 0, "r": 0, "marker_type": "dragon_lair"
        }))
        .unwrap();
        assert_eq!(rec.marker_type, MarkerKind::Poi);
        assert!(rec.into_marker().is_none());
    }
}
