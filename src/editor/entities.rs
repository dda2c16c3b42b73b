use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use hexx::Hex;

use super::EditorConfig;
use crate::map::{BorderStrength, MapMeta, MarkerKind, MarkerStore, RiverKind, Terrain, TileStore};
use crate::math::Projection;
use crate::persistence::WriteBehindQueue;

/// Active editing tool. Variants carry their own sub-selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum Tool {
    Paint { terrain: Terrain },
    Erase,
    /// Inspect a hex without changing it.
    Select,
    PlaceSettlement { kind: MarkerKind },
    PlaceAreaLabel,
    DrawBorder { strength: BorderStrength },
    EraseBorder,
    DrawRiver { kind: RiverKind },
    EraseRiver,
    PlaceRoad,
    EraseRoad,
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Paint {
            terrain: Terrain::Plains,
        }
    }
}

impl Tool {
    pub fn kind(self) -> ToolKind {
        match self {
            Tool::Paint { .. } => ToolKind::Paint,
            Tool::Erase => ToolKind::Erase,
            Tool::Select => ToolKind::Select,
            Tool::PlaceSettlement { .. } => ToolKind::PlaceSettlement,
            Tool::PlaceAreaLabel => ToolKind::PlaceAreaLabel,
            Tool::DrawBorder { .. } => ToolKind::DrawBorder,
            Tool::EraseBorder => ToolKind::EraseBorder,
            Tool::DrawRiver { .. } => ToolKind::DrawRiver,
            Tool::EraseRiver => ToolKind::EraseRiver,
            Tool::PlaceRoad => ToolKind::PlaceRoad,
            Tool::EraseRoad => ToolKind::EraseRoad,
        }
    }

    /// Tools that act on the edge under the pointer rather than the hex.
    pub fn targets_edge(self) -> bool {
        matches!(
            self,
            Tool::DrawBorder { .. }
                | Tool::EraseBorder
                | Tool::DrawRiver { .. }
                | Tool::EraseRiver
                | Tool::PlaceRoad
                | Tool::EraseRoad
        )
    }

    /// Tools that keep applying while the primary button is held.
    pub fn drags(self) -> bool {
        matches!(self, Tool::Paint { .. } | Tool::Erase)
    }
}

/// Tool without its sub-selection, as offered by the palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum ToolKind {
    Paint,
    Erase,
    Select,
    PlaceSettlement,
    PlaceAreaLabel,
    DrawBorder,
    EraseBorder,
    DrawRiver,
    EraseRiver,
    PlaceRoad,
    EraseRoad,
}

impl ToolKind {
    pub const ALL: [ToolKind; 11] = [
        ToolKind::Paint,
        ToolKind::Erase,
        ToolKind::Select,
        ToolKind::PlaceSettlement,
        ToolKind::PlaceAreaLabel,
        ToolKind::DrawBorder,
        ToolKind::EraseBorder,
        ToolKind::DrawRiver,
        ToolKind::EraseRiver,
        ToolKind::PlaceRoad,
        ToolKind::EraseRoad,
    ];

    /// A fresh tool of this kind with the default sub-selection.
    pub fn tool(self) -> Tool {
        match self {
            ToolKind::Paint => Tool::default(),
            ToolKind::Erase => Tool::Erase,
            ToolKind::Select => Tool::Select,
            ToolKind::PlaceSettlement => Tool::PlaceSettlement {
                kind: MarkerKind::Village,
            },
            ToolKind::PlaceAreaLabel => Tool::PlaceAreaLabel,
            ToolKind::DrawBorder => Tool::DrawBorder {
                strength: BorderStrength::Local,
            },
            ToolKind::EraseBorder => Tool::EraseBorder,
            ToolKind::DrawRiver => Tool::DrawRiver {
                kind: RiverKind::River,
            },
            ToolKind::EraseRiver => Tool::EraseRiver,
            ToolKind::PlaceRoad => Tool::PlaceRoad,
            ToolKind::EraseRoad => Tool::EraseRoad,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolKind::Paint => "Paint terrain",
            ToolKind::Erase => "Erase",
            ToolKind::Select => "Select",
            ToolKind::PlaceSettlement => "Place settlement",
            ToolKind::PlaceAreaLabel => "Area label",
            ToolKind::DrawBorder => "Draw border",
            ToolKind::EraseBorder => "Erase border",
            ToolKind::DrawRiver => "Draw river",
            ToolKind::EraseRiver => "Erase river",
            ToolKind::PlaceRoad => "Place road",
            ToolKind::EraseRoad => "Erase road",
        }
    }
}

/// Pan, zoom and tool state of the editor. Not persisted.
#[derive(Resource, Clone, Debug, PartialEq, Reflect)]
pub struct EditorViewState {
    pub zoom: f32,
    /// Canvas position of hex `(0, 0)`.
    pub offset: Vec2,
    pub tool: Tool,
    pub show_coordinates: bool,
    /// Set once the offset has been centred on the canvas.
    pub centered: bool,
    /// Canvas size as of the last painted frame.
    pub viewport: Vec2,
}

impl Default for EditorViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
            tool: Tool::default(),
            show_coordinates: false,
            centered: false,
            viewport: Vec2::ZERO,
        }
    }
}

impl EditorViewState {
    pub fn projection(&self, hex_size: f32) -> Projection {
        Projection {
            hex_size,
            zoom: self.zoom,
            offset: self.offset,
        }
    }

    /// Back to zoom 1; the offset is re-centred on the next frame.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.offset = Vec2::ZERO;
        self.centered = false;
    }
}

/// Where a pan gesture started.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct PanOrigin {
    pub pointer: Vec2,
    pub offset: Vec2,
}

/// Transient pointer bookkeeping between events.
#[derive(Resource, Clone, Debug, Default, PartialEq, Reflect)]
pub struct PointerState {
    /// Paint or erase drag in progress.
    pub drawing: bool,
    pub pan: Option<PanOrigin>,
    /// Last known pointer position in canvas coordinates.
    pub hover: Option<Vec2>,
    /// Hex the drag last applied to.
    pub last_hex: Option<Hex>,
    /// Hex picked with the select tool.
    pub selected: Option<Hex>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Pointer input in canvas-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down {
        pos: Vec2,
        button: PointerButton,
        shift: bool,
    },
    Move {
        pos: Vec2,
    },
    Up,
    Leave,
    /// Positive `delta_y` scrolls toward the user and zooms out.
    Wheel {
        pos: Vec2,
        delta_y: f32,
    },
}

/// A marker placement waiting for the user to name it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerPrompt {
    pub hex: Hex,
    pub kind: MarkerKind,
}

/// What the UI should do after an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reaction {
    pub redraw: bool,
    pub prompt: Option<MarkerPrompt>,
}

impl Reaction {
    pub const NONE: Reaction = Reaction {
        redraw: false,
        prompt: None,
    };
    pub const REDRAW: Reaction = Reaction {
        redraw: true,
        prompt: None,
    };

    pub fn prompt(prompt: MarkerPrompt) -> Self {
        Self {
            redraw: false,
            prompt: Some(prompt),
        }
    }
}

/// Name entry for a pending marker placement.
#[derive(Resource, Clone, Debug, Default)]
pub struct PendingPrompt {
    pub prompt: Option<MarkerPrompt>,
    pub name: String,
}

/// Resources the editor UI systems share with the pointer controller.
#[derive(SystemParam)]
pub struct EditorRes<'w> {
    pub view: ResMut<'w, EditorViewState>,
    pub pointer: ResMut<'w, PointerState>,
    pub tiles: ResMut<'w, TileStore>,
    pub markers: Res<'w, MarkerStore>,
    /// Pending backend writes.
    pub writes: ResMut<'w, WriteBehindQueue>,
    pub meta: ResMut<'w, MapMeta>,
    pub config: Res<'w, EditorConfig>,
}
