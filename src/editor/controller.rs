//! Pointer protocol: turns canvas input into store edits, queued writes and
//! view changes. Knows nothing about egui.

use bevy::prelude::*;
use hexx::Hex;

use super::EditorConfig;
use super::entities::{
    EditorRes, EditorViewState, MarkerPrompt, PanOrigin, PointerButton, PointerEvent, PointerState,
    Reaction, Tool,
};
use crate::map::{MapMeta, MarkerKind, MarkerStore, NewMarker, TileStore};
use crate::math;
use crate::persistence::{PersistJob, WriteBehindQueue};

/// Everything one input event may touch, borrowed for the duration of the
/// event.
pub struct Session<'a> {
    pub view: &'a mut EditorViewState,
    pub pointer: &'a mut PointerState,
    pub tiles: &'a mut TileStore,
    pub markers: &'a MarkerStore,
    pub writes: &'a mut WriteBehindQueue,
    pub meta: &'a MapMeta,
    pub config: &'a EditorConfig,
}

impl EditorRes<'_> {
    pub fn session(&mut self) -> Session<'_> {
        Session {
            view: &mut self.view,
            pointer: &mut self.pointer,
            tiles: &mut self.tiles,
            markers: &self.markers,
            writes: &mut self.writes,
            meta: &self.meta,
            config: &self.config,
        }
    }
}

impl Session<'_> {
    fn projection(&self) -> math::Projection {
        self.view.projection(self.meta.hex_size())
    }

    pub fn handle(&mut self, event: PointerEvent) -> Reaction {
        match event {
            PointerEvent::Down { pos, button, shift } => {
                self.pointer.hover = Some(pos);
                match button {
                    PointerButton::Middle => self.start_pan(pos),
                    PointerButton::Primary if shift => self.start_pan(pos),
                    PointerButton::Primary => self.apply_tool(pos),
                    PointerButton::Secondary => Reaction::NONE,
                }
            }
            PointerEvent::Move { pos } => self.pointer_moved(pos),
            PointerEvent::Up => {
                self.pointer.drawing = false;
                self.pointer.pan = None;
                self.pointer.last_hex = None;
                Reaction::NONE
            }
            PointerEvent::Leave => {
                self.pointer.drawing = false;
                self.pointer.pan = None;
                self.pointer.last_hex = None;
                self.pointer.hover = None;
                Reaction::REDRAW
            }
            PointerEvent::Wheel { pos, delta_y } => {
                let zoom = math::wheel_zoom(
                    self.view.zoom,
                    delta_y,
                    self.config.min_zoom,
                    self.config.max_zoom,
                );
                self.set_zoom(zoom, pos)
            }
        }
    }

    fn start_pan(&mut self, pos: Vec2) -> Reaction {
        self.pointer.pan = Some(PanOrigin {
            pointer: pos,
            offset: self.view.offset,
        });
        Reaction::NONE
    }

    fn pointer_moved(&mut self, pos: Vec2) -> Reaction {
        self.pointer.hover = Some(pos);

        if let Some(origin) = self.pointer.pan {
            self.view.offset = origin.offset + (pos - origin.pointer);
            return Reaction::REDRAW;
        }

        let tool = self.view.tool;
        if self.pointer.drawing && tool.drags() {
            let hex = self.projection().pixel_to_hex(pos);
            if self.pointer.last_hex != Some(hex) {
                self.apply_to_hex(tool, hex);
                return Reaction::REDRAW;
            }
            return Reaction::NONE;
        }

        if tool.targets_edge() {
            Reaction::REDRAW
        } else {
            Reaction::NONE
        }
    }

    fn apply_tool(&mut self, pos: Vec2) -> Reaction {
        let proj = self.projection();
        let hex = proj.pixel_to_hex(pos);
        let tool = self.view.tool;

        match tool {
            Tool::Paint { .. } | Tool::Erase => {
                self.pointer.drawing = true;
                self.apply_to_hex(tool, hex);
                Reaction::REDRAW
            }
            Tool::Select => {
                self.pointer.selected = Some(hex);
                Reaction::REDRAW
            }
            Tool::PlaceSettlement { kind } => Reaction::prompt(MarkerPrompt { hex, kind }),
            Tool::PlaceAreaLabel => Reaction::prompt(MarkerPrompt {
                hex,
                kind: MarkerKind::AreaLabel,
            }),
            Tool::DrawBorder { .. }
            | Tool::EraseBorder
            | Tool::DrawRiver { .. }
            | Tool::EraseRiver
            | Tool::PlaceRoad
            | Tool::EraseRoad => {
                let Some(edge) = proj.edge_at_point(hex, pos) else {
                    return Reaction::NONE;
                };
                let writes = match tool {
                    Tool::DrawBorder { strength } => self.tiles.set_border(hex, edge, Some(strength)),
                    Tool::EraseBorder => self.tiles.set_border(hex, edge, None),
                    Tool::DrawRiver { kind } => self.tiles.set_river(hex, edge, Some(kind)),
                    Tool::EraseRiver => self.tiles.set_river(hex, edge, None),
                    Tool::PlaceRoad => self.tiles.set_road(hex, edge, true),
                    _ => self.tiles.set_road(hex, edge, false),
                };
                self.writes.extend(writes);
                Reaction::REDRAW
            }
        }
    }

    /// Paint or erase a single hex as part of a drag.
    fn apply_to_hex(&mut self, tool: Tool, hex: Hex) {
        self.pointer.last_hex = Some(hex);
        match tool {
            Tool::Paint { terrain } => {
                let writes = self.tiles.paint(hex, terrain);
                self.writes.extend(writes);
            }
            Tool::Erase => {
                // the marker stays in the store until the delete is confirmed
                if let Some(marker) = self.markers.at(hex)
                    && !self.writes.deletes_marker(marker.id)
                {
                    self.writes.push(PersistJob::DeleteMarker(marker.id));
                }
                let writes = self.tiles.erase(hex);
                self.writes.extend(writes);
            }
            _ => {}
        }
    }

    fn set_zoom(&mut self, zoom: f32, anchor: Vec2) -> Reaction {
        if zoom == self.view.zoom {
            return Reaction::NONE;
        }
        self.view.offset = math::offset_for_zoom(anchor, self.view.offset, self.view.zoom, zoom);
        self.view.zoom = zoom;
        Reaction::REDRAW
    }

    /// Zoom button: scales by `factor` about the viewport centre.
    pub fn zoom_by(&mut self, factor: f32, viewport: Vec2) -> Reaction {
        let zoom = (self.view.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);
        self.set_zoom(zoom, viewport / 2.0)
    }

    /// Back to zoom 1 with hex `(0, 0)` in the middle of the viewport.
    pub fn reset_view(&mut self, viewport: Vec2) -> Reaction {
        self.view.reset();
        center_view(self.view, viewport);
        Reaction::REDRAW
    }

    /// Queues the creation of a marker once the user named it. Blank names
    /// cancel the placement.
    pub fn confirm_prompt(&mut self, prompt: MarkerPrompt, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.writes.push(PersistJob::CreateMarker(NewMarker::with_defaults(
            prompt.hex,
            prompt.kind,
            name,
        )));
        true
    }
}

/// Puts hex `(0, 0)` in the middle of the viewport the first time the canvas
/// size is known.
pub fn center_view(view: &mut EditorViewState, viewport: Vec2) {
    if !view.centered {
        view.offset = viewport / 2.0;
        view.centered = true;
    }
}
