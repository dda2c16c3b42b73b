use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use hexx::Hex;

use super::entities::{Marker, MarkerId};

/// Markers of the open map, keyed by id.
///
/// Several markers may share a hex in the backend; only one is drawn per
/// hex, the one with the lowest id.
#[derive(Resource, Default, Debug)]
pub struct MarkerStore {
    markers: HashMap<MarkerId, Marker>,
}

impl MarkerStore {
    pub fn load(&mut self, markers: impl IntoIterator<Item = Marker>) {
        self.markers = markers.into_iter().map(|m| (m.id, m)).collect();
    }

    /// Adds or replaces a marker.
    pub fn insert(&mut self, marker: Marker) {
        self.markers.insert(marker.id, marker);
    }

    pub fn remove(&mut self, id: MarkerId) -> Option<Marker> {
        self.markers.remove(&id)
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    /// The marker drawn on `hex`, if any.
    pub fn at(&self, hex: Hex) -> Option<&Marker> {
        self.markers
            .values()
            .filter(|m| m.hex == hex)
            .min_by_key(|m| m.id)
    }

    /// One marker per occupied hex, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        let mut shown: HashMap<Hex, &Marker> = HashMap::default();
        for marker in self.markers.values() {
            shown
                .entry(marker.hex)
                .and_modify(|m| {
                    if marker.id < m.id {
                        *m = marker;
                    }
                })
                .or_insert(marker);
        }
        let mut list: Vec<&Marker> = shown.into_values().collect();
        list.sort_by_key(|m| m.id);
        list.into_iter()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
