//! Working copy of the map's tiles plus the set of keys known to persistence.
//!
//! Every mutation returns the [`TileWrite`]s the backend needs to mirror it.
//! The caller decides when to send them; the store only learns that a write
//! landed through [`TileStore::confirm_upsert`] / [`TileStore::confirm_delete`]
//! or a completed batch save ([`TileStore::mark_saved`]).

use bevy::platform::collections::{HashMap, HashSet};
use bevy::prelude::*;
use hexx::Hex;

use super::entities::{BorderStrength, RiverKind, Terrain, Tile};
use crate::math::{self, Edge};

/// One point write for the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum TileWrite {
    /// Store the full tile.
    Upsert(Tile),
    /// Remove whatever is stored at the coordinate.
    Delete(Hex),
}

/// What a batch save must send.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveDiff {
    /// Keys persisted earlier that no longer hold a tile, row-major order.
    pub to_delete: Vec<Hex>,
    /// Every current tile, row-major order.
    pub to_upsert: Vec<Tile>,
}

/// Row-major ordering key: `r` first, then `q`.
fn row_major(hex: &Hex) -> (i32, i32) {
    (hex.y, hex.x)
}

/// In-memory tile map with persisted-key bookkeeping.
#[derive(Resource, Default, Debug)]
pub struct TileStore {
    tiles: HashMap<Hex, Tile>,
    persisted: HashSet<Hex>,
}

impl TileStore {
    /// Replaces all contents with `tiles` and treats every loaded key as persisted.
    ///
    /// Empty tiles are not kept, but their keys stay in the persisted set so
    /// the next save removes them from the backend.
    pub fn load(&mut self, tiles: impl IntoIterator<Item = Tile>) {
        self.tiles.clear();
        self.persisted.clear();
        for tile in tiles {
            self.persisted.insert(tile.hex);
            if !tile.is_empty() {
                self.tiles.insert(tile.hex, tile);
            }
        }
    }

    pub fn get(&self, hex: Hex) -> Option<&Tile> {
        self.tiles.get(&hex)
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.tiles.contains_key(&hex)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Tiles in row-major order.
    pub fn sorted(&self) -> Vec<&Tile> {
        let mut tiles: Vec<&Tile> = self.tiles.values().collect();
        tiles.sort_by_key(|t| row_major(&t.hex));
        tiles
    }

    /// Whether `hex` is known to exist in the backend.
    pub fn is_persisted(&self, hex: Hex) -> bool {
        self.persisted.contains(&hex)
    }

    /// Sets the terrain of `hex`, creating the tile when needed.
    pub fn paint(&mut self, hex: Hex, terrain: Terrain) -> Vec<TileWrite> {
        let tile = self.tiles.entry(hex).or_insert_with(|| Tile::new(hex));
        tile.terrain = Some(terrain);
        vec![TileWrite::Upsert(tile.clone())]
    }

    /// Removes the tile at `hex` with everything on it.
    ///
    /// Roads on neighbouring tiles that pointed at `hex` are left alone.
    pub fn erase(&mut self, hex: Hex) -> Vec<TileWrite> {
        match self.tiles.remove(&hex) {
            Some(_) => vec![TileWrite::Delete(hex)],
            None => Vec::new(),
        }
    }

    /// Sets or clears the border on one edge of `hex`.
    ///
    /// Setting auto-creates the tile. Clearing the last feature of a tile
    /// removes it.
    pub fn set_border(
        &mut self,
        hex: Hex,
        edge: Edge,
        strength: Option<BorderStrength>,
    ) -> Vec<TileWrite> {
        if strength.is_none() && !self.contains(hex) {
            return Vec::new();
        }
        let tile = self.tiles.entry(hex).or_insert_with(|| Tile::new(hex));
        tile.borders[edge.index()] = strength;
        self.settle(hex).into_iter().collect()
    }

    /// Sets or clears the river along one edge of `hex`. Same tile rules as
    /// [`Self::set_border`]; the neighbour is not touched.
    pub fn set_river(&mut self, hex: Hex, edge: Edge, kind: Option<RiverKind>) -> Vec<TileWrite> {
        if kind.is_none() && !self.contains(hex) {
            return Vec::new();
        }
        let tile = self.tiles.entry(hex).or_insert_with(|| Tile::new(hex));
        tile.rivers[edge.index()] = kind;
        self.settle(hex).into_iter().collect()
    }

    /// Places or removes a road across `edge` of `hex`.
    ///
    /// The neighbour sharing the edge gets the mirrored flag on the opposite
    /// edge, so a road is always stored on both sides.
    pub fn set_road(&mut self, hex: Hex, edge: Edge, place: bool) -> Vec<TileWrite> {
        let neighbor = math::neighbor(hex, edge);
        [(hex, edge), (neighbor, edge.opposite())]
            .into_iter()
            .filter_map(|(h, e)| {
                if !place && !self.contains(h) {
                    return None;
                }
                let tile = self.tiles.entry(h).or_insert_with(|| Tile::new(h));
                tile.roads[e.index()] = place;
                self.settle(h)
            })
            .collect()
    }

    /// Drops `hex` if it became empty and returns the matching write.
    fn settle(&mut self, hex: Hex) -> Option<TileWrite> {
        let tile = self.tiles.get(&hex)?;
        if tile.is_empty() {
            self.tiles.remove(&hex);
            Some(TileWrite::Delete(hex))
        } else {
            Some(TileWrite::Upsert(tile.clone()))
        }
    }

    /// Everything a batch save must send to bring the backend in line.
    pub fn diff_for_save(&self) -> SaveDiff {
        let mut to_delete: Vec<Hex> = self
            .persisted
            .iter()
            .filter(|h| !self.tiles.contains_key(*h))
            .copied()
            .collect();
        to_delete.sort_by_key(row_major);
        let to_upsert = self.sorted().into_iter().cloned().collect();
        SaveDiff {
            to_delete,
            to_upsert,
        }
    }

    /// The backend acknowledged an upsert of `hex`.
    pub fn confirm_upsert(&mut self, hex: Hex) {
        self.persisted.insert(hex);
    }

    /// The backend acknowledged a delete of `hex`.
    pub fn confirm_delete(&mut self, hex: Hex) {
        self.persisted.remove(&hex);
    }

    /// A batch save succeeded: the persisted set becomes exactly the saved
    /// keys plus the keys whose deletion failed.
    pub fn mark_saved(
        &mut self,
        upserted: impl IntoIterator<Item = Hex>,
        still_present: impl IntoIterator<Item = Hex>,
    ) {
        self.persisted = upserted.into_iter().chain(still_present).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: u8) -> Edge {
        Edge::new(i).unwrap()
    }

    fn painted(q: i32, r: i32, terrain: Terrain) -> Tile {
        Tile {
            terrain: Some(terrain),
            ..Tile::new(Hex::new(q, r))
        }
    }

    fn deleted(writes: &[TileWrite]) -> Vec<Hex> {
        writes
            .iter()
            .filter_map(|w| match w {
                TileWrite::Delete(h) => Some(*h),
                TileWrite::Upsert(_) => None,
            })
            .collect()
    }

    // ── paint / erase ───────────────────────────────────────────────

    #[test]
    fn paint_creates_tile_and_emits_upsert() {
        let mut store = TileStore::default();
        let writes = store.paint(Hex::new(2, -1), Terrain::Forest);
        assert_eq!(writes, vec![TileWrite::Upsert(painted(2, -1, Terrain::Forest))]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn repaint_keeps_borders_and_roads() {
        let mut store = TileStore::default();
        store.set_border(Hex::ZERO, e(1), Some(BorderStrength::Regional));
        store.paint(Hex::ZERO, Terrain::Water);
        let tile = store.get(Hex::ZERO).unwrap();
        assert_eq!(tile.terrain, Some(Terrain::Water));
        assert_eq!(tile.border(e(1)), Some(BorderStrength::Regional));
    }

    #[test]
    fn erase_missing_tile_writes_nothing() {
        let mut store = TileStore::default();
        assert!(store.erase(Hex::new(5, 5)).is_empty());
    }

    #[test]
    fn erase_removes_borders_and_roads_too() {
        let mut store = TileStore::default();
        store.paint(Hex::ZERO, Terrain::Plains);
        store.set_border(Hex::ZERO, e(0), Some(BorderStrength::Local));
        store.set_road(Hex::ZERO, e(2), true);
        assert_eq!(store.erase(Hex::ZERO), vec![TileWrite::Delete(Hex::ZERO)]);
        assert!(!store.contains(Hex::ZERO));
        // the neighbour keeps its half of the road
        assert!(store.get(Hex::new(1, 0)).unwrap().road(e(5)));
    }

    // ── borders ─────────────────────────────────────────────────────

    #[test]
    fn border_on_blank_hex_creates_tile() {
        let mut store = TileStore::default();
        let writes = store.set_border(Hex::new(1, 1), e(4), Some(BorderStrength::National));
        assert_eq!(writes.len(), 1);
        let TileWrite::Upsert(tile) = &writes[0] else {
            panic!("expected upsert, got {writes:?}");
        };
        assert_eq!(tile.terrain, None);
        assert_eq!(tile.border(e(4)), Some(BorderStrength::National));
    }

    #[test]
    fn clearing_last_border_prunes_tile() {
        let mut store = TileStore::default();
        store.set_border(Hex::ZERO, e(3), Some(BorderStrength::Local));
        let writes = store.set_border(Hex::ZERO, e(3), None);
        assert_eq!(writes, vec![TileWrite::Delete(Hex::ZERO)]);
        assert!(store.is_empty());
    }

    #[test]
    fn clearing_border_on_missing_tile_is_noop() {
        let mut store = TileStore::default();
        assert!(store.set_border(Hex::ZERO, e(0), None).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn clearing_border_keeps_painted_tile() {
        let mut store = TileStore::default();
        store.paint(Hex::ZERO, Terrain::Hill);
        store.set_border(Hex::ZERO, e(2), Some(BorderStrength::Local));
        let writes = store.set_border(Hex::ZERO, e(2), None);
        assert_eq!(writes, vec![TileWrite::Upsert(painted(0, 0, Terrain::Hill))]);
    }

    // ── rivers ──────────────────────────────────────────────────────

    #[test]
    fn river_stays_on_its_own_hex() {
        let mut store = TileStore::default();
        let writes = store.set_river(Hex::ZERO, e(1), Some(RiverKind::Stream));
        assert_eq!(writes.len(), 1);
        assert_eq!(store.get(Hex::ZERO).unwrap().river(e(1)), Some(RiverKind::Stream));
        assert!(!store.contains(math::neighbor(Hex::ZERO, e(1))));
    }

    #[test]
    fn river_alone_keeps_tile_until_cleared() {
        let mut store = TileStore::default();
        store.set_river(Hex::new(2, 2), e(4), Some(RiverKind::River));
        store.set_border(Hex::new(2, 2), e(4), Some(BorderStrength::Local));
        store.set_border(Hex::new(2, 2), e(4), None);
        assert!(store.contains(Hex::new(2, 2)), "river keeps the tile alive");
        let writes = store.set_river(Hex::new(2, 2), e(4), None);
        assert_eq!(writes, vec![TileWrite::Delete(Hex::new(2, 2))]);
        assert!(store.set_river(Hex::new(2, 2), e(4), None).is_empty());
    }

    // ── roads ───────────────────────────────────────────────────────

    #[test]
    fn road_is_stored_on_both_sides() {
        for edge in Edge::ALL {
            let mut store = TileStore::default();
            let hex = Hex::new(3, -2);
            let writes = store.set_road(hex, edge, true);
            assert_eq!(writes.len(), 2, "edge {edge:?}");
            let neighbor = math::neighbor(hex, edge);
            assert!(store.get(hex).unwrap().road(edge));
            assert!(store.get(neighbor).unwrap().road(edge.opposite()));
        }
    }

    #[test]
    fn road_place_then_erase_restores_both_hexes() {
        let mut store = TileStore::default();
        let top = math::neighbor(Hex::ZERO, e(0));
        store.paint(Hex::ZERO, Terrain::Plains);
        let before_center = store.get(Hex::ZERO).cloned();

        store.set_road(Hex::ZERO, e(0), true);
        let writes = store.set_road(Hex::ZERO, e(0), false);

        assert_eq!(store.get(Hex::ZERO).cloned(), before_center);
        assert_eq!(store.get(top), None);
        assert_eq!(deleted(&writes), vec![top]);
    }

    #[test]
    fn road_erase_prunes_emptied_tiles_only() {
        let mut store = TileStore::default();
        store.set_road(Hex::ZERO, e(2), true);
        store.set_road(Hex::ZERO, e(3), true);
        let writes = store.set_road(Hex::ZERO, e(2), false);
        // origin still has the edge-3 road; the edge-2 neighbour is now empty
        assert_eq!(deleted(&writes), vec![Hex::new(1, 0)]);
        assert!(store.contains(Hex::ZERO));
    }

    #[test]
    fn road_erase_on_missing_tiles_is_noop() {
        let mut store = TileStore::default();
        assert!(store.set_road(Hex::ZERO, e(1), false).is_empty());
    }

    // ── save diff ───────────────────────────────────────────────────

    #[test]
    fn diff_after_paint_and_erase() {
        let mut store = TileStore::default();
        store.load([painted(0, 0, Terrain::Plains)]);
        store.paint(Hex::new(1, 0), Terrain::Forest);
        store.erase(Hex::ZERO);

        let diff = store.diff_for_save();
        assert_eq!(diff.to_delete, vec![Hex::ZERO]);
        assert_eq!(diff.to_upsert, vec![painted(1, 0, Terrain::Forest)]);
    }

    #[test]
    fn diff_deletes_exactly_vanished_keys() {
        let mut store = TileStore::default();
        store.load((0..5).map(|q| painted(q, 0, Terrain::Desert)));
        store.erase(Hex::new(1, 0));
        store.erase(Hex::new(3, 0));
        store.paint(Hex::new(9, 9), Terrain::Swamp);
        store.erase(Hex::new(9, 9));

        let diff = store.diff_for_save();
        assert_eq!(diff.to_delete, vec![Hex::new(1, 0), Hex::new(3, 0)]);
        let upserted: Vec<Hex> = diff.to_upsert.iter().map(|t| t.hex).collect();
        assert_eq!(upserted, vec![Hex::new(0, 0), Hex::new(2, 0), Hex::new(4, 0)]);
    }

    #[test]
    fn loaded_empty_tiles_are_dropped_but_deleted_on_save() {
        let mut store = TileStore::default();
        store.load([Tile::new(Hex::new(4, 4)), painted(0, 0, Terrain::Road)]);
        assert!(!store.contains(Hex::new(4, 4)));
        assert_eq!(store.diff_for_save().to_delete, vec![Hex::new(4, 4)]);
    }

    #[test]
    fn emptied_by_border_or_road_edits_deletes_on_save() {
        let mut store = TileStore::default();
        let mut border_only = Tile::new(Hex::new(-1, 2));
        border_only.borders[3] = Some(BorderStrength::National);
        let mut road_a = Tile::new(Hex::ZERO);
        road_a.roads[2] = true;
        let mut road_b = Tile::new(Hex::new(1, 0));
        road_b.roads[5] = true;
        store.load([border_only, road_a, road_b, painted(3, 3, Terrain::Hill)]);

        store.set_border(Hex::new(-1, 2), e(3), None);
        store.set_road(Hex::ZERO, e(2), false);

        let diff = store.diff_for_save();
        assert_eq!(diff.to_delete, vec![Hex::ZERO, Hex::new(1, 0), Hex::new(-1, 2)]);
        let upserted: Vec<Hex> = diff.to_upsert.iter().map(|t| t.hex).collect();
        assert_eq!(upserted, vec![Hex::new(3, 3)]);
    }

    #[test]
    fn mixed_edits_diff_matches_final_state() {
        let mut store = TileStore::default();
        store.load([painted(0, 0, Terrain::Plains), painted(0, 1, Terrain::Water)]);
        store.set_road(Hex::ZERO, e(3), true);
        store.erase(Hex::new(0, 1));
        store.set_border(Hex::new(4, 0), e(0), Some(BorderStrength::Regional));
        store.set_river(Hex::new(5, 0), e(0), Some(RiverKind::River));
        store.paint(Hex::new(5, 0), Terrain::Swamp);
        store.set_road(Hex::ZERO, e(3), false);
        store.set_border(Hex::new(4, 0), e(0), None);

        let diff = store.diff_for_save();
        // (4, 0) never reached the backend, so only the erased hex is deleted
        assert_eq!(diff.to_delete, vec![Hex::new(0, 1)]);
        let upserted: Vec<Hex> = diff.to_upsert.iter().map(|t| t.hex).collect();
        assert_eq!(upserted, vec![Hex::ZERO, Hex::new(5, 0)]);
        assert!(diff.to_upsert.iter().all(|t| !t.is_empty()));
    }

    #[test]
    fn mark_saved_resets_snapshot_and_keeps_failed_deletes() {
        let mut store = TileStore::default();
        store.load([painted(0, 0, Terrain::Plains), painted(1, 0, Terrain::Plains)]);
        store.erase(Hex::ZERO);
        store.erase(Hex::new(1, 0));
        store.paint(Hex::new(2, 0), Terrain::Water);

        let diff = store.diff_for_save();
        store.mark_saved(diff.to_upsert.iter().map(|t| t.hex), [Hex::new(1, 0)]);

        assert!(store.is_persisted(Hex::new(2, 0)));
        assert!(!store.is_persisted(Hex::ZERO));
        assert_eq!(store.diff_for_save().to_delete, vec![Hex::new(1, 0)]);
    }

    #[test]
    fn confirmations_track_point_writes() {
        let mut store = TileStore::default();
        store.paint(Hex::ZERO, Terrain::Plains);
        assert!(!store.is_persisted(Hex::ZERO));
        store.confirm_upsert(Hex::ZERO);
        store.erase(Hex::ZERO);
        assert_eq!(store.diff_for_save().to_delete, vec![Hex::ZERO]);
        store.confirm_delete(Hex::ZERO);
        assert!(store.diff_for_save().to_delete.is_empty());
    }
}
