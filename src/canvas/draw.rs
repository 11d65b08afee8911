//! Stroke primitives on an RGBA surface.

use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;

use crate::constants::{BADGE_FONT_SIZE, BADGE_SIZE};
use crate::model::Point;
use crate::session::Stroke;

const BADGE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BADGE_INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Draw a segment `width` pixels wide as parallel one-pixel strokes along the
/// segment's normal.
pub fn stroke_segment(surface: &mut RgbaImage, a: Point, b: Point, stroke: Stroke) {
    let color = Rgba(stroke.rgba);
    let passes = stroke.width.round().max(1.0) as i32;

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    // Degenerate segments still leave a dot the size of the stroke.
    let (nx, ny) = if len > f32::EPSILON {
        (-dy / len, dx / len)
    } else {
        (0.0, 1.0)
    };

    let center = (passes - 1) as f32 / 2.0;
    for pass in 0..passes {
        let offset = pass as f32 - center;
        let (ox, oy) = (nx * offset, ny * offset);
        if len > f32::EPSILON {
            draw_line_segment_mut(
                surface,
                (a.x + ox, a.y + oy),
                (b.x + ox, b.y + oy),
                color,
            );
        } else {
            draw_line_segment_mut(
                surface,
                (a.x + ox - center, a.y + oy),
                (a.x + ox + center, a.y + oy),
                color,
            );
        }
    }
}

/// Stroke a polygon outline, closing it back to the first vertex.
/// Fewer than two vertices leave nothing visible.
pub fn stroke_closed_path(surface: &mut RgbaImage, points: &[Point], stroke: Stroke) {
    if points.len() < 2 {
        return;
    }
    for pair in points.windows(2) {
        stroke_segment(surface, pair[0], pair[1], stroke);
    }
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        stroke_segment(surface, *last, *first, stroke);
    }
}

/// White box with a black border centred on `center`, holding `number` when a
/// font is available.
pub fn number_badge(surface: &mut RgbaImage, center: Point, number: usize, font: Option<&FontVec>) {
    let half = (BADGE_SIZE / 2) as i32;
    let left = center.x.round() as i32 - half;
    let top = center.y.round() as i32 - half;
    let rect = Rect::at(left, top).of_size(BADGE_SIZE, BADGE_SIZE);

    draw_filled_rect_mut(surface, rect, BADGE_FILL);
    draw_hollow_rect_mut(surface, rect, BADGE_INK);

    if let Some(font) = font {
        let text = number.to_string();
        let scale = PxScale::from(BADGE_FONT_SIZE);
        let (w, h) = text_size(scale, font, &text);
        let x = center.x.round() as i32 - (w as i32) / 2;
        let y = center.y.round() as i32 - (h as i32) / 2;
        draw_text_mut(surface, BADGE_INK, x, y, scale, font, &text);
    }
}
