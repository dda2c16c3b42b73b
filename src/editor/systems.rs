use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use hexx::Hex;

use super::EditorConfig;
use super::controller::center_view;
use super::entities::{
    EditorRes, EditorViewState, PendingPrompt, PointerButton, PointerEvent, PointerState, Tool,
    ToolKind,
};
use crate::EditorState;
use crate::map::{BorderStrength, MIN_HEX_SIZE, MapMeta, MarkerKind, RiverKind, Terrain};
use crate::persistence::{
    LoadError, MapLoaded, NoticeLevel, PendingTasks, PersistenceConfig, SaveRequested,
    StatusNotice, WriteBehindQueue,
};
use crate::render::{self, Frame, RenderConfig};

const PANEL_WIDTH: f32 = 230.0;
const SUCCESS_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 200, 80);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 80, 80);

/// Fresh view and pointer state for every loaded map.
pub fn reset_on_load(
    mut loaded: MessageReader<MapLoaded>,
    config: Res<EditorConfig>,
    mut view: ResMut<EditorViewState>,
    mut pointer: ResMut<PointerState>,
    mut prompt: ResMut<PendingPrompt>,
) {
    if loaded.read().count() == 0 {
        return;
    }
    view.reset();
    view.show_coordinates = config.show_coordinates;
    *pointer = PointerState::default();
    *prompt = PendingPrompt::default();
}

// ── Side panel ─────────────────────────────────────────────────────

/// Left panel: map settings, tool palette, view controls, save and status.
pub fn tool_panel(
    mut contexts: EguiContexts,
    mut ed: EditorRes,
    tasks: Res<PendingTasks>,
    notice: Res<StatusNotice>,
    mut save: MessageWriter<SaveRequested>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    egui::SidePanel::left("editor_tools")
        .default_width(PANEL_WIDTH)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                map_section(ui, &mut ed.meta);
                ui.separator();
                tool_section(ui, &mut ed.view.tool);
                ui.separator();
                view_section(ui, &mut ed);
                ui.separator();
                if save_section(ui, &ed.writes, &tasks, &notice) {
                    save.write(SaveRequested);
                }
                ui.separator();
                info_section(ui, &ed);
            });
        });

    Ok(())
}

fn map_section(ui: &mut egui::Ui, meta: &mut MapMeta) {
    ui.heading(&meta.name);
    ui.small(format!(
        "Map {} · {}×{} hexes",
        meta.map_id, meta.width_hexes, meta.height_hexes
    ));

    egui::CollapsingHeader::new("Map settings").show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut meta.name);
        });
        let mut size = meta.hex_size();
        ui.horizontal(|ui| {
            ui.label("Hex size");
            ui.add(egui::DragValue::new(&mut size).range(MIN_HEX_SIZE..=200.0).suffix(" px"));
        });
        if size != meta.hex_size() {
            meta.set_hex_size(size);
        }
        ui.small("Saved with the next full save.");
    });
}

fn tool_section(ui: &mut egui::Ui, tool: &mut Tool) {
    ui.label(egui::RichText::new("Tools").strong());
    for kind in ToolKind::ALL {
        if ui.selectable_label(tool.kind() == kind, kind.label()).clicked() {
            *tool = kind.tool();
        }
    }

    ui.add_space(4.0);
    match tool {
        Tool::Paint { terrain } => {
            egui::ComboBox::from_label("Terrain")
                .selected_text(terrain_text(*terrain))
                .show_ui(ui, |ui| {
                    for t in Terrain::ALL {
                        ui.selectable_value(terrain, t, terrain_text(t));
                    }
                });
        }
        Tool::PlaceSettlement { kind } => {
            egui::ComboBox::from_label("Settlement")
                .selected_text(marker_text(*kind))
                .show_ui(ui, |ui| {
                    for k in MarkerKind::SETTLEMENTS {
                        ui.selectable_value(kind, k, marker_text(k));
                    }
                });
        }
        Tool::DrawBorder { strength } => {
            egui::ComboBox::from_label("Border")
                .selected_text(strength.label())
                .show_ui(ui, |ui| {
                    for s in BorderStrength::ALL {
                        ui.selectable_value(strength, s, s.label());
                    }
                });
        }
        Tool::DrawRiver { kind } => {
            egui::ComboBox::from_label("River")
                .selected_text(kind.label())
                .show_ui(ui, |ui| {
                    for k in RiverKind::ALL {
                        ui.selectable_value(kind, k, k.label());
                    }
                });
        }
        _ => {}
    }
}

fn terrain_text(t: Terrain) -> String {
    format!("{} {}", t.glyph(), t.label())
}

fn marker_text(k: MarkerKind) -> String {
    format!("{} {}", k.symbol(), k.label())
}

fn view_section(ui: &mut egui::Ui, ed: &mut EditorRes) {
    ui.label(egui::RichText::new("View").strong());
    let viewport = ed.view.viewport;
    let step = ed.config.zoom_step;
    ui.horizontal(|ui| {
        if ui.button("−").on_hover_text("Zoom out").clicked() {
            ed.session().zoom_by(1.0 / step, viewport);
        }
        ui.label(format!("{:.0}%", ed.view.zoom * 100.0));
        if ui.button("+").on_hover_text("Zoom in").clicked() {
            ed.session().zoom_by(step, viewport);
        }
        if ui.button("Reset view").clicked() {
            ed.session().reset_view(viewport);
        }
    });
    ui.checkbox(&mut ed.view.show_coordinates, "Show coordinates");
    ui.small("Shift-drag or middle-drag to pan, wheel to zoom.");
}

/// Returns true when the save button was clicked.
fn save_section(
    ui: &mut egui::Ui,
    writes: &WriteBehindQueue,
    tasks: &PendingTasks,
    notice: &StatusNotice,
) -> bool {
    let saving = tasks.is_saving();
    let mut clicked = false;
    ui.horizontal(|ui| {
        clicked = ui.add_enabled(!saving, egui::Button::new("Save map")).clicked();
        if saving {
            ui.spinner();
        }
    });

    let syncing = writes.len() + usize::from(writes.is_busy());
    if syncing > 0 {
        ui.small(format!("{syncing} change(s) syncing"));
    }
    if let Some(n) = &notice.0 {
        let color = match n.level {
            NoticeLevel::Success => SUCCESS_COLOR,
            NoticeLevel::Error => ERROR_COLOR,
        };
        ui.colored_label(color, &n.text);
    }
    clicked
}

fn info_section(ui: &mut egui::Ui, ed: &EditorRes) {
    ui.small(format!("{} tiles, {} markers", ed.tiles.len(), ed.markers.len()));

    let proj = ed.view.projection(ed.meta.hex_size());
    if let Some(pos) = ed.pointer.hover {
        let hex = proj.pixel_to_hex(pos);
        let mut text = format!("Hover {}, {}", hex.x, hex.y);
        if let Some((_, edge)) = render::hovered_edge(&proj, ed.view.tool, Some(pos)) {
            text.push_str(&format!(" · edge {}", edge.index()));
        }
        ui.small(text);
    }

    if let Some(hex) = ed.pointer.selected {
        ui.add_space(4.0);
        ui.label(egui::RichText::new(format!("Hex {}, {}", hex.x, hex.y)).strong());
        selected_details(ui, ed, hex);
    }
}

fn selected_details(ui: &mut egui::Ui, ed: &EditorRes, hex: Hex) {
    if let Some(marker) = ed.markers.at(hex) {
        ui.label(format!("{} \"{}\"", marker.kind.label(), marker.name));
    }
    let Some(tile) = ed.tiles.get(hex) else {
        ui.small("Unpainted");
        return;
    };
    ui.label(tile.terrain.map_or("No terrain", |t| t.label()));
    let borders: Vec<String> = tile
        .border_edges()
        .map(|(e, s)| format!("{} {}", e.index(), s.label()))
        .collect();
    if !borders.is_empty() {
        ui.small(format!("Borders: {}", borders.join(", ")));
    }
    let rivers: Vec<String> = tile
        .river_edges()
        .map(|(e, k)| format!("{} {}", e.index(), k.label()))
        .collect();
    if !rivers.is_empty() {
        ui.small(format!("Rivers: {}", rivers.join(", ")));
    }
    let roads: Vec<String> = tile.road_edges().map(|e| e.index().to_string()).collect();
    if !roads.is_empty() {
        ui.small(format!("Roads: {}", roads.join(", ")));
    }

    let attrs = &tile.attributes;
    ui.small(format!(
        "{} · cost {} · elevation {}",
        if attrs.is_passable { "passable" } else { "impassable" },
        attrs.movement_cost,
        attrs.elevation
    ));
    for text in [&attrs.terrain_name, &attrs.description, &attrs.notes]
        .into_iter()
        .flatten()
    {
        ui.small(text);
    }
    if !ed.tiles.is_persisted(hex) {
        ui.small("Not yet saved");
    }
}

// ── Canvas ─────────────────────────────────────────────────────────

/// Central panel: feeds pointer input to the controller and paints the map.
pub fn canvas(
    mut contexts: EguiContexts,
    mut ed: EditorRes,
    mut prompt: ResMut<PendingPrompt>,
    style: Res<RenderConfig>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let viewport = Vec2::new(rect.width(), rect.height());
            ed.view.viewport = viewport;
            center_view(&mut ed.view, viewport);

            // The name prompt is modal for the canvas.
            if prompt.prompt.is_none() {
                for event in pointer_events(ui, &response) {
                    let reaction = ed.session().handle(event);
                    if let Some(p) = reaction.prompt {
                        prompt.prompt = Some(p);
                        prompt.name.clear();
                        ed.pointer.drawing = false;
                        break;
                    }
                }
            }

            let frame = Frame {
                tiles: &ed.tiles,
                markers: &ed.markers,
                meta: &ed.meta,
                projection: ed.view.projection(ed.meta.hex_size()),
                tool: ed.view.tool,
                show_coordinates: ed.view.show_coordinates,
                hover: ed.pointer.hover,
                viewport,
                style: &style,
            };
            render::paint(&painter, rect.min, &render::render(&frame));
        });

    Ok(())
}

/// Translates this frame's raw egui input into canvas-local pointer events.
fn pointer_events(ui: &egui::Ui, response: &egui::Response) -> Vec<PointerEvent> {
    let rect = response.rect;
    let local = |p: egui::Pos2| Vec2::new(p.x - rect.min.x, p.y - rect.min.y);
    let over_canvas = response.contains_pointer();

    ui.input(|input| {
        input
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::PointerMoved(pos) if rect.contains(*pos) => {
                    Some(PointerEvent::Move { pos: local(*pos) })
                }
                egui::Event::PointerMoved(_) | egui::Event::PointerGone => {
                    Some(PointerEvent::Leave)
                }
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed: true,
                    modifiers,
                } if over_canvas && rect.contains(*pos) => {
                    let button = match button {
                        egui::PointerButton::Primary => PointerButton::Primary,
                        egui::PointerButton::Secondary => PointerButton::Secondary,
                        egui::PointerButton::Middle => PointerButton::Middle,
                        _ => return None,
                    };
                    Some(PointerEvent::Down {
                        pos: local(*pos),
                        button,
                        shift: modifiers.shift,
                    })
                }
                egui::Event::PointerButton { pressed: false, .. } => Some(PointerEvent::Up),
                // egui reports scrolling up as positive y
                egui::Event::MouseWheel { delta, .. } if over_canvas => {
                    let pos = input.pointer.hover_pos()?;
                    Some(PointerEvent::Wheel {
                        pos: local(pos),
                        delta_y: -delta.y,
                    })
                }
                _ => None,
            })
            .collect()
    })
}

/// Name entry window for a pending settlement or area label.
pub fn marker_prompt(
    mut contexts: EguiContexts,
    mut ed: EditorRes,
    mut prompt: ResMut<PendingPrompt>,
) -> Result {
    let Some(pending) = prompt.prompt else {
        return Ok(());
    };
    let ctx = contexts.ctx_mut()?;
    let mut confirm = false;
    let mut cancel = false;

    egui::Window::new(format!("New {}", pending.kind.label()))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.small(format!("Hex {}, {}", pending.hex.x, pending.hex.y));
            let edit = ui.text_edit_singleline(&mut prompt.name);
            if !edit.has_focus() && !edit.lost_focus() {
                edit.request_focus();
            }
            let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.horizontal(|ui| {
                confirm = ui.button("Place").clicked() || enter;
                cancel = ui.button("Cancel").clicked();
            });
            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                cancel = true;
            }
        });

    if confirm {
        let name = std::mem::take(&mut prompt.name);
        if !ed.session().confirm_prompt(pending, &name) {
            debug!("marker placement cancelled: empty name");
        }
        prompt.prompt = None;
    } else if cancel {
        prompt.prompt = None;
        prompt.name.clear();
    }

    Ok(())
}

// ── Load states ────────────────────────────────────────────────────

pub fn loading_screen(mut contexts: EguiContexts, config: Res<PersistenceConfig>) -> Result {
    let ctx = contexts.ctx_mut()?;
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.4);
            ui.spinner();
            ui.label(format!("Loading map {}…", config.map_id));
        });
    });
    Ok(())
}

/// Inline error with a retry button.
pub fn load_failed_screen(
    mut contexts: EguiContexts,
    error: Option<Res<LoadError>>,
    mut next: ResMut<NextState<EditorState>>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.35);
            ui.heading("Could not load the map");
            if let Some(err) = &error {
                ui.colored_label(ERROR_COLOR, &err.0);
            }
            ui.add_space(8.0);
            if ui.button("Retry").clicked() {
                next.set(EditorState::Loading);
            }
        });
    });
    Ok(())
}
