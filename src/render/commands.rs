//! Pure scene description: turns map state into an ordered list of
//! [`DrawCommand`]s. No drawing surface is touched here.

use bevy::color::Srgba;
use bevy::platform::collections::HashSet;
use bevy::prelude::*;
use hexx::{Hex, shapes};

use super::RenderConfig;
use crate::editor::Tool;
use crate::map::{MapMeta, Marker, MarkerKind, MarkerStore, RiverKind, Tile, TileStore};
use crate::math::{self, Edge, Projection};

/// Line colour and width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: Srgba,
}

impl Stroke {
    pub fn new(width: f32, color: Srgba) -> Self {
        Self { width, color }
    }
}

/// Vertical placement of text relative to its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    Center,
    Top,
}

/// Box drawn behind a text, sized by the surface after measuring it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBackdrop {
    pub fill: Srgba,
    pub padding: f32,
}

/// One primitive, in canvas coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Diagonal gradient over the whole viewport.
    Background { from: Srgba, to: Srgba },
    Hexagon {
        corners: [Vec2; 6],
        fill: Srgba,
        stroke: Stroke,
    },
    Line { from: Vec2, to: Vec2, stroke: Stroke },
    /// Open line through `points`.
    Polyline { points: Vec<Vec2>, stroke: Stroke },
    Circle {
        center: Vec2,
        radius: f32,
        fill: Srgba,
        stroke: Option<Stroke>,
    },
    Text {
        pos: Vec2,
        text: String,
        size: f32,
        color: Srgba,
        anchor: TextAnchor,
        monospace: bool,
        /// Drawn under the fill for legibility over any terrain.
        outline: Option<Stroke>,
        backdrop: Option<TextBackdrop>,
    },
}

/// Everything one redraw needs.
pub struct Frame<'a> {
    pub tiles: &'a TileStore,
    pub markers: &'a MarkerStore,
    pub meta: &'a MapMeta,
    pub projection: Projection,
    pub tool: Tool,
    pub show_coordinates: bool,
    /// Last pointer position over the canvas.
    pub hover: Option<Vec2>,
    pub viewport: Vec2,
    pub style: &'a RenderConfig,
}

pub(crate) fn rgb(hex: u32) -> Srgba {
    Srgba::rgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const EMPTY_FILL: u32 = 0x1a1a1a;
const BACKGROUND_TO: u32 = 0x2d2d2d;
const PAINTED_STROKE: u32 = 0x333333;
const EMPTY_STROKE: u32 = 0x0a0a0a;
const ROAD_COLOR: u32 = 0x8B4513;
const AREA_LABEL_COLOR: u32 = 0xFFD700;

/// Builds the draw list for one frame.
///
/// Order: background, unpainted hexes, painted hexes, rivers, roads, markers,
/// borders, then edge hover feedback. Borders come after every hexagon and
/// marker so nothing covers them.
pub fn render(frame: &Frame) -> Vec<DrawCommand> {
    let mut out = vec![DrawCommand::Background {
        from: rgb(EMPTY_FILL),
        to: rgb(BACKGROUND_TO),
    }];

    let (painted, empty): (Vec<Hex>, Vec<Hex>) = grid_hexes(frame)
        .into_iter()
        .filter(|&h| on_screen(frame, h))
        .partition(|&h| frame.tiles.get(h).is_some_and(|t| t.terrain.is_some()));

    for hex in empty.into_iter().chain(painted) {
        draw_hex(&mut out, frame, hex, frame.tiles.get(hex));
    }

    let tiles = frame.tiles.sorted();
    for tile in &tiles {
        draw_rivers(&mut out, frame, tile);
    }
    for tile in &tiles {
        draw_roads(&mut out, frame, tile);
    }

    for marker in frame.markers.iter() {
        draw_marker(&mut out, frame, marker);
    }

    for tile in &tiles {
        draw_borders(&mut out, frame, tile);
    }

    draw_hover(&mut out, frame);
    out
}

/// Map bounding box unioned with every stored tile, row-major.
fn grid_hexes(frame: &Frame) -> Vec<Hex> {
    let hw = (frame.meta.width_hexes / 2) as i32;
    let hh = (frame.meta.height_hexes / 2) as i32;
    let mut seen: HashSet<Hex> = shapes::parallelogram(Hex::new(-hw, -hh), Hex::new(hw, hh)).collect();
    seen.extend(frame.tiles.iter().map(|t| t.hex));
    let mut hexes: Vec<Hex> = seen.into_iter().collect();
    hexes.sort_by_key(|h| (h.y, h.x));
    hexes
}

fn on_screen(frame: &Frame, hex: Hex) -> bool {
    let c = frame.projection.hex_to_pixel(hex);
    let margin = frame.projection.size();
    c.x >= -margin
        && c.y >= -margin
        && c.x <= frame.viewport.x + margin
        && c.y <= frame.viewport.y + margin
}

fn draw_hex(out: &mut Vec<DrawCommand>, frame: &Frame, hex: Hex, tile: Option<&Tile>) {
    let proj = &frame.projection;
    let zoom = proj.zoom;
    let size = proj.size();
    let terrain = tile.and_then(|t| t.terrain);

    let (fill, stroke) = match terrain {
        Some(t) => (rgb(t.color()), Stroke::new(2.0, rgb(PAINTED_STROKE))),
        None => (rgb(EMPTY_FILL), Stroke::new(0.5, rgb(EMPTY_STROKE))),
    };
    out.push(DrawCommand::Hexagon {
        corners: proj.corners(hex),
        fill,
        stroke,
    });

    let center = proj.hex_to_pixel(hex);
    if let Some(t) = terrain
        && zoom > frame.style.glyph_min_zoom
    {
        let scale = if zoom > frame.style.glyph_full_zoom { 0.5 } else { 0.3 };
        out.push(DrawCommand::Text {
            pos: center,
            text: t.glyph().to_owned(),
            size: size * scale,
            color: Srgba::WHITE,
            anchor: TextAnchor::Center,
            monospace: false,
            outline: None,
            backdrop: None,
        });
    }

    if frame.show_coordinates && zoom > frame.style.coordinates_min_zoom {
        out.push(DrawCommand::Text {
            pos: center,
            text: format!("{},{}", hex.x, hex.y),
            size: 8.0,
            color: Srgba::new(1.0, 1.0, 1.0, 0.3),
            anchor: TextAnchor::Center,
            monospace: true,
            outline: None,
            backdrop: None,
        });
    }
}

fn draw_borders(out: &mut Vec<DrawCommand>, frame: &Frame, tile: &Tile) {
    let proj = &frame.projection;
    for (edge, strength) in tile.border_edges() {
        let (from, to) = proj.edge_segment(tile.hex, edge);
        out.push(DrawCommand::Line {
            from,
            to,
            stroke: Stroke::new(strength.width() * proj.zoom, rgb(strength.color())),
        });
    }
}

/// Three sine periods along the edge, sampled about every 8 px.
fn river_wave(from: Vec2, to: Vec2, kind: RiverKind) -> Vec<Vec2> {
    let along = to - from;
    let length = along.length();
    if length <= f32::EPSILON {
        return vec![from, to];
    }
    let normal = along.perp() / length;
    let amplitude = kind.width() * 0.5;
    let segments = ((length / 8.0) as usize).max(4);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let wave = (t * std::f32::consts::PI * 3.0).sin() * amplitude;
            from + along * t + normal * wave
        })
        .collect()
}

fn draw_rivers(out: &mut Vec<DrawCommand>, frame: &Frame, tile: &Tile) {
    let proj = &frame.projection;
    for (edge, kind) in tile.river_edges() {
        let (from, to) = proj.edge_segment(tile.hex, edge);
        out.push(DrawCommand::Polyline {
            points: river_wave(from, to, kind),
            stroke: Stroke::new(kind.width() * proj.zoom, rgb(kind.color())),
        });
    }
}

/// Roads run centre to neighbour centre. A road leaving the map towards an
/// unstored hex stops at the shared edge.
fn draw_roads(out: &mut Vec<DrawCommand>, frame: &Frame, tile: &Tile) {
    let proj = &frame.projection;
    let stroke = Stroke::new((4.0 * proj.zoom).max(3.0), rgb(ROAD_COLOR));
    let center = proj.hex_to_pixel(tile.hex);
    for edge in tile.road_edges() {
        let neighbor = math::neighbor(tile.hex, edge);
        let neighbor_center = proj.hex_to_pixel(neighbor);
        let to = if frame.meta.contains(neighbor) || frame.tiles.contains(neighbor) {
            neighbor_center
        } else {
            center.lerp(neighbor_center, 0.5)
        };
        out.push(DrawCommand::Line {
            from: center,
            to,
            stroke,
        });
    }
}

fn draw_marker(out: &mut Vec<DrawCommand>, frame: &Frame, marker: &Marker) {
    let proj = &frame.projection;
    let size = proj.size();
    let center = proj.hex_to_pixel(marker.hex);

    if marker.kind == MarkerKind::AreaLabel {
        if marker.name.is_empty() {
            return;
        }
        let font = (size * 0.4).max(14.0);
        out.push(DrawCommand::Text {
            pos: center,
            text: marker.name.clone(),
            size: font,
            color: rgb(AREA_LABEL_COLOR),
            anchor: TextAnchor::Center,
            monospace: false,
            outline: Some(Stroke::new((font * 0.15).max(2.0), Srgba::BLACK)),
            backdrop: Some(TextBackdrop {
                fill: Srgba::new(0.0, 0.0, 0.0, 0.7),
                padding: font * 0.3,
            }),
        });
        return;
    }

    let icon_size = size * 0.4;
    let icon_pos = Vec2::new(center.x, center.y - size * 0.2);
    let fill = Srgba::hex(&marker.color).unwrap_or_else(|_| rgb(0xFF0000));
    out.push(DrawCommand::Circle {
        center: icon_pos,
        radius: icon_size * 0.6,
        fill,
        stroke: Some(Stroke::new(2.0, Srgba::WHITE)),
    });
    out.push(DrawCommand::Text {
        pos: icon_pos,
        text: marker.kind.symbol().to_owned(),
        size: icon_size,
        color: Srgba::WHITE,
        anchor: TextAnchor::Center,
        monospace: false,
        outline: None,
        backdrop: None,
    });

    if !marker.name.is_empty() && proj.zoom > frame.style.label_min_zoom {
        let font = (size * 0.25).max(10.0);
        out.push(DrawCommand::Text {
            pos: Vec2::new(center.x, center.y + size * 0.4),
            text: marker.name.clone(),
            size: font,
            color: Srgba::WHITE,
            anchor: TextAnchor::Top,
            monospace: false,
            outline: Some(Stroke::new((font * 0.15).max(2.0), Srgba::BLACK)),
            backdrop: None,
        });
    }
}

/// Colour of the edge highlight for `tool`, `None` for hex tools.
fn hover_color(tool: Tool) -> Option<Srgba> {
    match tool {
        Tool::EraseBorder | Tool::EraseRiver | Tool::EraseRoad => Some(Srgba::rgb_u8(255, 0, 0)),
        Tool::PlaceRoad => Some(Srgba::rgb_u8(139, 69, 19)),
        Tool::DrawBorder { .. } => Some(Srgba::rgb_u8(255, 255, 0)),
        Tool::DrawRiver { kind } => Some(rgb(kind.color())),
        _ => None,
    }
}

fn draw_hover(out: &mut Vec<DrawCommand>, frame: &Frame) {
    let Some(color) = hover_color(frame.tool) else {
        return;
    };
    let proj = &frame.projection;
    let Some((hex, edge)) = hovered_edge(proj, frame.tool, frame.hover) else {
        return;
    };
    let (from, to) = proj.edge_segment(hex, edge);
    let zoom = proj.zoom;
    out.push(DrawCommand::Line {
        from,
        to,
        stroke: Stroke::new((8.0 * zoom).max(6.0), color.with_alpha(0.35)),
    });
    out.push(DrawCommand::Line {
        from,
        to,
        stroke: Stroke::new((6.0 * zoom).max(4.0), color),
    });
}

/// Edge an edge tool would act on at `hover`; `None` for hex tools.
pub fn hovered_edge(proj: &Projection, tool: Tool, hover: Option<Vec2>) -> Option<(Hex, Edge)> {
    if !tool.targets_edge() {
        return None;
    }
    let pos = hover?;
    let hex = proj.pixel_to_hex(pos);
    proj.edge_at_point(hex, pos).map(|e| (hex, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{BorderStrength, MarkerId, NewMarker, Terrain};

    struct Fixture {
        tiles: TileStore,
        markers: MarkerStore,
        meta: MapMeta,
        style: RenderConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tiles: TileStore::default(),
                markers: MarkerStore::default(),
                meta: MapMeta::new(1, "test", 4, 4, 50.0),
                style: RenderConfig::default(),
            }
        }

        fn frame(&self, tool: Tool, hover: Option<Vec2>) -> Frame<'_> {
            Frame {
                tiles: &self.tiles,
                markers: &self.markers,
                meta: &self.meta,
                projection: Projection {
                    hex_size: 50.0,
                    zoom: 1.0,
                    offset: Vec2::new(400.0, 300.0),
                },
                tool,
                show_coordinates: false,
                hover,
                viewport: Vec2::new(800.0, 600.0),
                style: &self.style,
            }
        }
    }

    fn e(i: u8) -> Edge {
        Edge::new(i).unwrap()
    }

    fn kinds(cmds: &[DrawCommand]) -> Vec<&'static str> {
        cmds.iter()
            .map(|c| match c {
                DrawCommand::Background { .. } => "bg",
                DrawCommand::Hexagon { .. } => "hex",
                DrawCommand::Line { .. } => "line",
                DrawCommand::Polyline { .. } => "river",
                DrawCommand::Circle { .. } => "circle",
                DrawCommand::Text { .. } => "text",
            })
            .collect()
    }

    fn hexagon_fills(cmds: &[DrawCommand]) -> Vec<Srgba> {
        cmds.iter()
            .filter_map(|c| match c {
                DrawCommand::Hexagon { fill, .. } => Some(*fill),
                _ => None,
            })
            .collect()
    }

    // ── ordering ────────────────────────────────────────────────────

    #[test]
    fn empty_map_draws_background_then_grid() {
        let fx = Fixture::new();
        let cmds = render(&fx.frame(Tool::default(), None));
        assert_eq!(cmds[0], DrawCommand::Background { from: rgb(0x1a1a1a), to: rgb(0x2d2d2d) });
        // 4x4 map -> q, r in [-2, 2]
        assert_eq!(hexagon_fills(&cmds).len(), 25);
        assert!(kinds(&cmds)[1..].iter().all(|k| *k == "hex"));
    }

    #[test]
    fn painted_hexes_follow_empty_ones() {
        let mut fx = Fixture::new();
        fx.tiles.paint(Hex::new(-2, -2), Terrain::Forest);
        let cmds = render(&fx.frame(Tool::default(), None));
        let fills = hexagon_fills(&cmds);
        assert_eq!(fills.last(), Some(&rgb(0x228B22)));
        assert_eq!(fills.iter().filter(|f| **f == rgb(0x228B22)).count(), 1);
    }

    #[test]
    fn layers_are_hexes_roads_markers_hover() {
        let mut fx = Fixture::new();
        fx.tiles.paint(Hex::ZERO, Terrain::Plains);
        fx.tiles.set_road(Hex::ZERO, e(2), true);
        fx.markers.insert(
            NewMarker::with_defaults(Hex::new(1, 1), MarkerKind::Town, "Ashford").into_marker(MarkerId(1)),
        );
        let above_origin = Vec2::new(400.0, 300.0 - 40.0);
        let cmds = render(&fx.frame(Tool::PlaceRoad, Some(above_origin)));
        let k = kinds(&cmds);

        let last_hex = k.iter().rposition(|k| *k == "hex").unwrap();
        let first_circle = k.iter().position(|k| *k == "circle").unwrap();
        let road_lines: Vec<usize> = (last_hex..first_circle).filter(|&i| k[i] == "line").collect();
        // one line from each side of the road
        assert_eq!(road_lines.len(), 2, "kinds {k:?}");
        // hover glow and highlight are the final two commands
        assert_eq!(&k[k.len() - 2..], ["line", "line"]);
        assert!(first_circle < k.len() - 2);
    }

    fn is_border(cmd: &DrawCommand) -> bool {
        matches!(cmd, DrawCommand::Line { stroke, .. }
            if BorderStrength::ALL.iter().any(|b| stroke.color == rgb(b.color())))
    }

    #[test]
    fn borders_are_never_covered() {
        let mut fx = Fixture::new();
        // an unpainted hex bordered by painted neighbours drawn after it
        fx.tiles.set_border(Hex::ZERO, e(2), Some(BorderStrength::National));
        fx.tiles.paint(Hex::new(1, 0), Terrain::Forest);
        fx.tiles.paint(Hex::new(1, -1), Terrain::Forest);
        fx.tiles.set_border(Hex::new(-1, 0), e(0), Some(BorderStrength::Local));
        fx.markers.insert(
            NewMarker::with_defaults(Hex::new(1, 0), MarkerKind::Town, "Ashford").into_marker(MarkerId(1)),
        );
        let cmds = render(&fx.frame(Tool::default(), None));

        let first_border = cmds.iter().position(is_border).unwrap();
        assert_eq!(cmds.iter().filter(|c| is_border(c)).count(), 2);
        assert!(
            cmds[first_border..].iter().all(|c| {
                !matches!(c, DrawCommand::Hexagon { .. } | DrawCommand::Circle { .. } | DrawCommand::Text { .. })
            }),
            "border drawn before a hexagon or marker"
        );
    }

    #[test]
    fn border_runs_along_its_edge() {
        let mut fx = Fixture::new();
        fx.tiles.set_border(Hex::ZERO, e(0), Some(BorderStrength::National));
        let cmds = render(&fx.frame(Tool::default(), None));
        let Some(DrawCommand::Line { from, to, stroke }) = cmds.iter().find(|c| is_border(c)) else {
            panic!("no border line");
        };
        assert_eq!(stroke.width, 4.0);
        assert_eq!(stroke.color, rgb(0xB33A2B));
        // top edge runs from the top corner to the upper-right corner
        assert!((from.y - 250.0).abs() < 1e-3, "from {from:?}");
        assert!(to.x > from.x);
    }

    // ── rivers ──────────────────────────────────────────────────────

    #[test]
    fn rivers_sit_between_hexes_and_roads() {
        let mut fx = Fixture::new();
        fx.tiles.paint(Hex::ZERO, Terrain::Plains);
        fx.tiles.set_road(Hex::ZERO, e(2), true);
        fx.tiles.set_river(Hex::new(0, 1), e(1), Some(RiverKind::River));
        let k = kinds(&render(&fx.frame(Tool::default(), None)));

        let last_hex = k.iter().rposition(|k| *k == "hex").unwrap();
        let river = k.iter().position(|k| *k == "river").unwrap();
        let first_line = k.iter().position(|k| *k == "line").unwrap();
        assert!(last_hex < river && river < first_line, "kinds {k:?}");
    }

    #[test]
    fn river_wave_follows_edge_ends() {
        let mut fx = Fixture::new();
        fx.tiles.set_river(Hex::ZERO, e(3), Some(RiverKind::Stream));
        let frame = fx.frame(Tool::default(), None);
        let (from, to) = frame.projection.edge_segment(Hex::ZERO, e(3));
        let Some(DrawCommand::Polyline { points, stroke }) = render(&frame)
            .into_iter()
            .find(|c| matches!(c, DrawCommand::Polyline { .. }))
        else {
            panic!("no river drawn");
        };
        assert_eq!(stroke.color, rgb(0x87CEEB));
        assert_eq!(stroke.width, 2.0);
        assert!(points.len() >= 5);
        assert!((points[0] - from).length() < 1e-3);
        assert!((points[points.len() - 1] - to).length() < 1e-3);
        // the wave never strays further than half the stream width
        let dir = (to - from).normalize();
        for p in &points {
            let off = (*p - from).perp_dot(dir).abs();
            assert!(off <= 1.0 + 1e-3, "{p:?} is {off} off the edge");
        }
    }

    // ── hover ───────────────────────────────────────────────────────

    #[test]
    fn hover_highlight_only_for_edge_tools() {
        let fx = Fixture::new();
        let pos = Vec2::new(400.0, 260.0);
        let base = render(&fx.frame(Tool::default(), None)).len();
        for tool in [Tool::default(), Tool::Erase, Tool::Select, Tool::PlaceAreaLabel] {
            assert_eq!(render(&fx.frame(tool, Some(pos))).len(), base, "{tool:?}");
        }
        for tool in [
            Tool::DrawBorder { strength: BorderStrength::Local },
            Tool::EraseBorder,
            Tool::DrawRiver { kind: RiverKind::River },
            Tool::EraseRiver,
            Tool::PlaceRoad,
            Tool::EraseRoad,
        ] {
            assert_eq!(render(&fx.frame(tool, Some(pos))).len(), base + 2, "{tool:?}");
        }
    }

    #[test]
    fn hover_colours_follow_tool() {
        let fx = Fixture::new();
        let pos = Vec2::new(400.0, 260.0);
        let colour_of = |tool| match render(&fx.frame(tool, Some(pos))).pop() {
            Some(DrawCommand::Line { stroke, .. }) => stroke.color,
            other => panic!("expected hover line, got {other:?}"),
        };
        assert_eq!(colour_of(Tool::EraseRoad), Srgba::rgb_u8(255, 0, 0));
        assert_eq!(colour_of(Tool::PlaceRoad), Srgba::rgb_u8(139, 69, 19));
        assert_eq!(
            colour_of(Tool::DrawBorder { strength: BorderStrength::Regional }),
            Srgba::rgb_u8(255, 255, 0)
        );
        assert_eq!(colour_of(Tool::DrawRiver { kind: RiverKind::Stream }), rgb(0x87CEEB));
        assert_eq!(colour_of(Tool::EraseRiver), Srgba::rgb_u8(255, 0, 0));
    }

    #[test]
    fn hovered_edge_only_for_edge_tools() {
        let fx = Fixture::new();
        let proj = fx.frame(Tool::default(), None).projection;
        let (a, b) = proj.edge_segment(Hex::ZERO, e(1));
        // most of the way from the centre towards the middle of edge 1
        let pos = Some(proj.hex_to_pixel(Hex::ZERO).lerp(a.lerp(b, 0.5), 0.8));
        assert_eq!(hovered_edge(&proj, Tool::EraseRoad, pos), Some((Hex::ZERO, e(1))));
        assert_eq!(hovered_edge(&proj, Tool::EraseRiver, pos), Some((Hex::ZERO, e(1))));
        assert_eq!(hovered_edge(&proj, Tool::Select, pos), None);
        assert_eq!(hovered_edge(&proj, Tool::EraseRoad, None), None);
    }

    #[test]
    fn hover_in_dead_zone_draws_nothing() {
        let fx = Fixture::new();
        let base = render(&fx.frame(Tool::default(), None)).len();
        let cmds = render(&fx.frame(Tool::EraseBorder, Some(Vec2::new(405.0, 300.0))));
        assert_eq!(cmds.len(), base);
    }

    // ── markers ─────────────────────────────────────────────────────

    #[test]
    fn area_label_is_text_with_backdrop_only() {
        let mut fx = Fixture::new();
        fx.markers.insert(
            NewMarker::with_defaults(Hex::ZERO, MarkerKind::AreaLabel, "The Marches")
                .into_marker(MarkerId(3)),
        );
        let cmds = render(&fx.frame(Tool::default(), None));
        assert!(!cmds.iter().any(|c| matches!(c, DrawCommand::Circle { .. })));
        let Some(DrawCommand::Text { text, color, backdrop, size, .. }) = cmds.last() else {
            panic!("expected label text last");
        };
        assert_eq!(text, "The Marches");
        assert_eq!(*color, rgb(0xFFD700));
        assert!(backdrop.is_some());
        assert_eq!(*size, 20.0);
    }

    #[test]
    fn marker_name_hidden_when_zoomed_out() {
        let mut fx = Fixture::new();
        fx.markers.insert(
            NewMarker::with_defaults(Hex::ZERO, MarkerKind::Ruins, "Old Keep").into_marker(MarkerId(1)),
        );
        let mut frame = fx.frame(Tool::default(), None);
        let named = |cmds: &[DrawCommand]| {
            cmds.iter()
                .any(|c| matches!(c, DrawCommand::Text { text, .. } if text == "Old Keep"))
        };
        assert!(named(&render(&frame)));
        frame.projection.zoom = 0.5;
        assert!(!named(&render(&frame)));
    }

    // ── roads ───────────────────────────────────────────────────────

    #[test]
    fn road_to_unknown_hex_outside_map_stops_at_edge() {
        let mut fx = Fixture::new();
        // (2, 0) is on the map edge; its edge-2 neighbour (3, 0) lies outside.
        fx.tiles.paint(Hex::new(2, 0), Terrain::Road);
        fx.tiles.set_road(Hex::new(2, 0), e(2), true);
        fx.tiles.erase(Hex::new(3, 0));
        let frame = fx.frame(Tool::default(), None);
        let center = frame.projection.hex_to_pixel(Hex::new(2, 0));
        let far = frame.projection.hex_to_pixel(Hex::new(3, 0));
        let ends: Vec<Vec2> = render(&frame)
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Line { from, to, stroke } if stroke.color == rgb(0x8B4513) => {
                    (from == center).then_some(to)
                }
                _ => None,
            })
            .collect();
        assert_eq!(ends.len(), 1);
        assert!((ends[0] - center.lerp(far, 0.5)).length() < 1e-3);
    }

    // ── zoom thresholds ─────────────────────────────────────────────

    #[test]
    fn coordinates_need_flag_and_zoom() {
        let fx = Fixture::new();
        let has_coords = |cmds: Vec<DrawCommand>| {
            cmds.iter()
                .any(|c| matches!(c, DrawCommand::Text { monospace: true, .. }))
        };
        let mut frame = fx.frame(Tool::default(), None);
        frame.projection.zoom = 2.0;
        assert!(!has_coords(render(&frame)));
        frame.show_coordinates = true;
        assert!(has_coords(render(&frame)));
        frame.projection.zoom = 1.5;
        assert!(!has_coords(render(&frame)));
    }

    #[test]
    fn terrain_glyph_scales_with_zoom() {
        let mut fx = Fixture::new();
        fx.tiles.paint(Hex::ZERO, Terrain::Water);
        let glyph_size = |zoom: f32| {
            let mut frame = fx.frame(Tool::default(), None);
            frame.projection.zoom = zoom;
            render(&frame).into_iter().find_map(|c| match c {
                DrawCommand::Text { text, size, .. } if text == Terrain::Water.glyph() => Some(size),
                _ => None,
            })
        };
        assert_eq!(glyph_size(0.3), None);
        assert_eq!(glyph_size(0.5), Some(50.0 * 0.5 * 0.3));
        assert_eq!(glyph_size(1.0), Some(50.0 * 0.5));
    }
}
