//! egui painter adapter: the only place draw commands meet a real surface.

use bevy::color::Srgba;
use bevy::prelude::*;
use bevy_egui::egui::{self, Align2, Color32, FontId, Pos2, Shape};

use super::commands::{DrawCommand, Stroke, TextAnchor, TextBackdrop};

fn color32(c: Srgba) -> Color32 {
    let [r, g, b, a] = c.to_u8_array();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn stroke32(s: Stroke) -> egui::Stroke {
    egui::Stroke::new(s.width, color32(s.color))
}

/// Paints `commands` in order onto `painter`, with canvas coordinates
/// relative to `origin`.
pub fn paint(painter: &egui::Painter, origin: Pos2, commands: &[DrawCommand]) {
    let at = |v: Vec2| origin + egui::vec2(v.x, v.y);

    for cmd in commands {
        match cmd {
            DrawCommand::Background { from, to } => {
                painter.add(Shape::mesh(gradient(painter.clip_rect(), *from, *to)));
            }
            DrawCommand::Hexagon {
                corners,
                fill,
                stroke,
            } => {
                let points = corners.iter().map(|&c| at(c)).collect();
                painter.add(Shape::convex_polygon(points, color32(*fill), stroke32(*stroke)));
            }
            DrawCommand::Line { from, to, stroke } => {
                painter.line_segment([at(*from), at(*to)], stroke32(*stroke));
            }
            DrawCommand::Polyline { points, stroke } => {
                let points = points.iter().map(|&p| at(p)).collect();
                painter.add(Shape::line(points, stroke32(*stroke)));
            }
            DrawCommand::Circle {
                center,
                radius,
                fill,
                stroke,
            } => {
                let outline = stroke.map(stroke32).unwrap_or(egui::Stroke::NONE);
                painter.circle(at(*center), *radius, color32(*fill), outline);
            }
            DrawCommand::Text {
                pos,
                text,
                size,
                color,
                anchor,
                monospace,
                outline,
                backdrop,
            } => {
                let font = if *monospace {
                    FontId::monospace(*size)
                } else {
                    FontId::proportional(*size)
                };
                let align = match anchor {
                    TextAnchor::Center => Align2::CENTER_CENTER,
                    TextAnchor::Top => Align2::CENTER_TOP,
                };
                paint_text(
                    painter,
                    at(*pos),
                    align,
                    text,
                    font,
                    *color,
                    *outline,
                    *backdrop,
                );
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn paint_text(
    painter: &egui::Painter,
    pos: Pos2,
    align: Align2,
    text: &str,
    font: FontId,
    color: Srgba,
    outline: Option<Stroke>,
    backdrop: Option<TextBackdrop>,
) {
    let galley = painter.layout_no_wrap(text.to_owned(), font.clone(), color32(color));
    let rect = align.anchor_size(pos, galley.size());

    if let Some(b) = backdrop {
        painter.rect_filled(rect.expand(b.padding), 0.0, color32(b.fill));
    }

    // egui has no stroked text; approximate it with offset copies.
    if let Some(o) = outline {
        let ring = o.width * 0.5;
        let outline_color = color32(o.color);
        for i in 0..8 {
            let angle = std::f32::consts::FRAC_PI_4 * i as f32;
            let shifted = rect.min + egui::vec2(angle.cos(), angle.sin()) * ring;
            let shadow = painter.layout_no_wrap(text.to_owned(), font.clone(), outline_color);
            painter.galley(shifted, shadow, outline_color);
        }
    }

    painter.galley(rect.min, galley, color32(color));
}

/// Two-triangle mesh with `from` in the top-left corner and `to` in the
/// bottom-right one.
fn gradient(rect: egui::Rect, from: Srgba, to: Srgba) -> egui::Mesh {
    let mid = color32(from.mix(&to, 0.5));
    let mut mesh = egui::Mesh::default();
    mesh.colored_vertex(rect.left_top(), color32(from));
    mesh.colored_vertex(rect.right_top(), mid);
    mesh.colored_vertex(rect.right_bottom(), color32(to));
    mesh.colored_vertex(rect.left_bottom(), mid);
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    mesh
}
