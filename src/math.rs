//! Hex geometry: axial coordinates, pixel projection and edge picking.
//!
//! Nothing here touches the ECS; inputs are plain numbers, [`Hex`] and `Vec2`.
//!
//! Hexes are pointy-top. Edge indices run clockwise from the top and are the
//! same index used by [`neighbors`], so edge `i` of a hex borders
//! `neighbors(hex)[i]`.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_6, PI, TAU};

use bevy::prelude::Vec2;
use hexx::Hex;
use serde::{Deserialize, Serialize};

const SQRT_3: f32 = 1.732_050_8;

/// Axial offsets of the six neighbours, indexed by edge.
const NEIGHBOR_OFFSETS: [Hex; 6] = [
    Hex::new(0, -1),
    Hex::new(1, -1),
    Hex::new(1, 0),
    Hex::new(0, 1),
    Hex::new(-1, 1),
    Hex::new(-1, 0),
];

/// Bisector angle of each edge, clockwise from top (canvas y points down).
pub const EDGE_ANGLES: [f32; 6] = [
    -FRAC_PI_2,
    -FRAC_PI_6,
    FRAC_PI_6,
    FRAC_PI_2,
    5.0 * FRAC_PI_6,
    7.0 * FRAC_PI_6,
];

/// Clicks closer to the centre than this fraction of the hex size pick no edge.
pub const EDGE_DEAD_ZONE: f32 = 0.4;

/// Largest accepted angular distance between a click and an edge bisector.
pub const EDGE_TOLERANCE: f32 = FRAC_PI_2;

/// One of the six sides of a hex, `0` = top, increasing clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Edge(u8);

impl Edge {
    /// All edges in index order.
    pub const ALL: [Edge; 6] = [Edge(0), Edge(1), Edge(2), Edge(3), Edge(4), Edge(5)];

    /// Returns `None` for indices outside `0..6`.
    pub fn new(index: u8) -> Option<Self> {
        (index < 6).then_some(Self(index))
    }

    /// Position of this edge in per-edge arrays.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The edge a neighbour sees when looking back across this one.
    pub fn opposite(self) -> Self {
        Self((self.0 + 3) % 6)
    }

    /// The edge following this one clockwise.
    pub fn next(self) -> Self {
        Self((self.0 + 1) % 6)
    }
}

impl TryFrom<u8> for Edge {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Edge::new(value).ok_or_else(|| format!("edge index {value} out of range 0..6"))
    }
}

impl From<Edge> for u8 {
    fn from(edge: Edge) -> Self {
        edge.0
    }
}

/// The six neighbours of `hex`, ordered by [`Edge`] index.
pub fn neighbors(hex: Hex) -> [Hex; 6] {
    NEIGHBOR_OFFSETS.map(|offset| hex + offset)
}

/// The neighbour sharing `edge` with `hex`.
pub fn neighbor(hex: Hex, edge: Edge) -> Hex {
    hex + NEIGHBOR_OFFSETS[edge.index()]
}

/// Rounds fractional axial coordinates to the nearest hex.
///
/// All three cube coordinates are rounded; the one with the largest rounding
/// error is then rebuilt from the other two so that `q + r + s == 0` holds.
/// Ties round toward positive infinity.
///
/// # Examples
/// ```
/// # use hex_map_editor::math::hex_round;
/// # use hexx::Hex;
/// assert_eq!(hex_round(0.2, 0.9), Hex::new(0, 1));
/// assert_eq!(hex_round(-1.0, 2.0), Hex::new(-1, 2));
/// ```
pub fn hex_round(q: f32, r: f32) -> Hex {
    let s = -q - r;
    let mut rq = round_half_up(q);
    let mut rr = round_half_up(r);
    let rs = round_half_up(s);

    let q_diff = (rq - q).abs();
    let r_diff = (rr - r).abs();
    let s_diff = (rs - s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        rq = -rr - rs;
    } else if r_diff > s_diff {
        rr = -rq - rs;
    }

    Hex::new(rq as i32, rr as i32)
}

fn round_half_up(v: f32) -> f32 {
    (v + 0.5).floor()
}

/// Pixel-space mapping for the current pan and zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Unzoomed hex radius (centre to corner) in pixels.
    pub hex_size: f32,
    /// Current zoom multiplier.
    pub zoom: f32,
    /// Canvas position of the hex `(0, 0)` centre.
    pub offset: Vec2,
}

impl Projection {
    /// Effective on-screen hex radius.
    pub fn size(&self) -> f32 {
        self.hex_size * self.zoom
    }

    /// Canvas position of a hex centre.
    pub fn hex_to_pixel(&self, hex: Hex) -> Vec2 {
        let size = self.size();
        let q = hex.x as f32;
        let r = hex.y as f32;
        Vec2::new(
            size * (SQRT_3 * q + SQRT_3 / 2.0 * r) + self.offset.x,
            size * (1.5 * r) + self.offset.y,
        )
    }

    /// Hex containing a canvas position.
    pub fn pixel_to_hex(&self, pos: Vec2) -> Hex {
        let size = self.size();
        let x = pos.x - self.offset.x;
        let y = pos.y - self.offset.y;
        let q = (SQRT_3 / 3.0 * x - y / 3.0) / size;
        let r = (2.0 / 3.0 * y) / size;
        hex_round(q, r)
    }

    /// The six corners of a hex, starting at the top point and going clockwise.
    pub fn corners(&self, hex: Hex) -> [Vec2; 6] {
        let center = self.hex_to_pixel(hex);
        let size = self.size();
        std::array::from_fn(|i| hex_corner(center, size, i))
    }

    /// End points of the segment drawn for `edge`.
    pub fn edge_segment(&self, hex: Hex, edge: Edge) -> (Vec2, Vec2) {
        let center = self.hex_to_pixel(hex);
        let size = self.size();
        (
            hex_corner(center, size, edge.index()),
            hex_corner(center, size, edge.next().index()),
        )
    }

    /// Picks the edge of `hex` a canvas position points at.
    ///
    /// Returns `None` inside the central dead zone or when no edge bisector
    /// lies within [`EDGE_TOLERANCE`] of the pointer angle.
    pub fn edge_at_point(&self, hex: Hex, pos: Vec2) -> Option<Edge> {
        let delta = pos - self.hex_to_pixel(hex);
        if delta.length() < self.size() * EDGE_DEAD_ZONE {
            return None;
        }

        let angle = delta.y.atan2(delta.x).rem_euclid(TAU);
        let (edge, diff) = Edge::ALL
            .iter()
            .map(|&edge| {
                (
                    edge,
                    angular_distance(angle, EDGE_ANGLES[edge.index()].rem_euclid(TAU)),
                )
            })
            .fold((Edge::ALL[0], f32::INFINITY), |best, candidate| {
                if candidate.1 < best.1 { candidate } else { best }
            });

        (diff < EDGE_TOLERANCE).then_some(edge)
    }
}

/// Corner `i` of a pointy-top hex, at angle `π/3·i − π/2`.
pub fn hex_corner(center: Vec2, size: f32, i: usize) -> Vec2 {
    let angle = PI / 3.0 * i as f32 - FRAC_PI_2;
    center + Vec2::new(angle.cos(), angle.sin()) * size
}

/// Absolute difference between two angles in `[0, 2π)`, wrapped to `[0, π]`.
fn angular_distance(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs();
    if diff > PI { TAU - diff } else { diff }
}

/// Zoom level after one wheel notch, clamped to `[min, max]`.
///
/// A positive `delta_y` (scrolling toward the user) zooms out.
pub fn wheel_zoom(current: f32, delta_y: f32, min: f32, max: f32) -> f32 {
    let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
    (current * factor).clamp(min, max)
}

/// Offset that keeps the world point under `anchor` fixed when the zoom
/// changes from `old_zoom` to `new_zoom`.
pub fn offset_for_zoom(anchor: Vec2, offset: Vec2, old_zoom: f32, new_zoom: f32) -> Vec2 {
    let world = (anchor - offset) / old_zoom;
    anchor - world * new_zoom
}
