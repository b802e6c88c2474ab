use tiny_skia::{FillRule, LineCap, Paint, PathBuilder, Pixmap, Rect, Stroke as SkStroke, Transform};

use super::color::paint_color;
use super::strokes::{draw_text, outline_box};
use crate::canvas::Viewport;
use crate::drawing::Stroke;
use crate::geometry::{BBox, Point, TextLayout};
use crate::state::{Corner, TextSession};
use crate::text_renderer::FontBook;
use crate::trail::TrailSegment;

pub const ERASE_TRAIL_COLOR: &str = "#9e9e9e";
pub const LASER_COLOR: &str = "#ff2020";
const HANDLE_SIZE: f32 = 8.0;
const TEXT_SELECTION_COLOR: &str = "#2f80ed";
const TEXT_SELECTION_ALPHA: f32 = 0.3;
const CARET_WIDTH: f32 = 1.5;

fn solid(color: &str, opacity: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(paint_color(color, opacity));
    paint.anti_alias = true;
    paint
}

/// Fading polyline: the newest segment is the widest and most opaque.
pub fn draw_trail(pixmap: &mut Pixmap, segments: &[TrailSegment], view: &Viewport, color: &str, max_width: f32) {
    for seg in segments {
        let strength = seg.progress * seg.fade;
        if strength <= 0.0 {
            continue;
        }
        let from = view.world_to_screen(seg.from);
        let to = view.world_to_screen(seg.to);
        let mut pb = PathBuilder::new();
        pb.move_to(from.x, from.y);
        pb.line_to(to.x, to.y);
        let Some(path) = pb.finish() else {
            continue;
        };
        let sk = SkStroke {
            width: (max_width * strength).max(1.0),
            line_cap: LineCap::Round,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &solid(color, strength), &sk, Transform::identity(), None);
    }
}

/// Dashed selection outline in screen space, with corner handles when the
/// stroke can be resized.
pub fn draw_selection(pixmap: &mut Pixmap, world_box: BBox, view: &Viewport, accent: &str, handles: bool) {
    let tl = view.world_to_screen(Point::new(world_box.x, world_box.y));
    let screen = BBox::new(tl.x, tl.y, world_box.w * view.scale, world_box.h * view.scale);
    outline_box(pixmap, screen, accent, true);
    if !handles {
        return;
    }
    let paint = solid(accent, 1.0);
    for corner in Corner::ALL {
        let c = corner.of(&screen);
        let half = HANDLE_SIZE * 0.5;
        if let Some(rect) = Rect::from_xywh(c.x - half, c.y - half, HANDLE_SIZE, HANDLE_SIZE) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}

pub fn draw_select_box(pixmap: &mut Pixmap, world_box: BBox, view: &Viewport, accent: &str) {
    let tl = view.world_to_screen(Point::new(world_box.x, world_box.y));
    let screen = BBox::new(tl.x, tl.y, world_box.w * view.scale, world_box.h * view.scale);
    if let Some(rect) = Rect::from_xywh(screen.x, screen.y, screen.w.max(1.0), screen.h.max(1.0)) {
        pixmap.fill_rect(rect, &solid(accent, 0.1), Transform::identity(), None);
    }
    outline_box(pixmap, screen, accent, false);
}

/// Live text buffer with selection highlight and, when visible, the caret.
pub fn draw_text_session(pixmap: &mut Pixmap, session: &TextSession, fonts: &FontBook, ts: Transform) {
    let text = session.editor.text();
    let layout = TextLayout {
        anchor: session.anchor,
        text,
        align: session.align,
        style: session.style,
    };

    if let Some((start, end)) = session.editor.selection() {
        let paint = solid(TEXT_SELECTION_COLOR, TEXT_SELECTION_ALPHA);
        let (from, lh) = layout.caret_rect(start, fonts);
        let (to, _) = layout.caret_rect(end, fonts);
        let mut pb = PathBuilder::new();
        if (from.y - to.y).abs() < 0.5 {
            push_rect(&mut pb, from.x, from.y, to.x - from.x, lh);
        } else {
            // Partial first and last rows, full rows in between.
            let b = layout.bbox(fonts);
            push_rect(&mut pb, from.x, from.y, b.right() - from.x, lh);
            let mut y = from.y + lh;
            while y + 0.5 < to.y {
                push_rect(&mut pb, b.x, y, b.w, lh);
                y += lh;
            }
            push_rect(&mut pb, b.x, to.y, to.x - b.x, lh);
        }
        if let Some(path) = pb.finish() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
        }
    }

    if !text.is_empty() {
        let preview = Stroke::text(session.anchor, text, &session.color, &session.style, session.align);
        draw_text(pixmap, &preview, fonts, ts, 1.0);
    }

    if session.caret_visible {
        let (top, lh) = layout.caret_rect(session.editor.caret(), fonts);
        let mut pb = PathBuilder::new();
        pb.move_to(top.x, top.y);
        pb.line_to(top.x, top.y + lh);
        if let Some(path) = pb.finish() {
            let sk = SkStroke {
                width: CARET_WIDTH / ts.sx.max(f32::EPSILON),
                ..Default::default()
            };
            pixmap.stroke_path(&path, &solid(&session.color, 1.0), &sk, ts, None);
        }
    }
}

fn push_rect(pb: &mut PathBuilder, x: f32, y: f32, w: f32, h: f32) {
    if let Some(rect) = Rect::from_xywh(x.min(x + w), y, w.abs().max(1.0), h) {
        pb.push_rect(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_input::TextEditor;
    use crate::state::TextTarget;
    use std::time::{Duration, Instant};

    fn ink(pixmap: &Pixmap) -> usize {
        pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
    }

    #[test]
    fn newest_trail_segment_is_strongest() {
        let now = Instant::now();
        let mut trail = crate::trail::Trail::new(8, Duration::from_millis(300));
        for i in 0..4 {
            trail.push(Point::new(10.0 + i as f32 * 20.0, 20.0), now);
        }
        let segments = trail.segments(now);
        assert!(segments.last().unwrap().progress > segments[0].progress);
        let mut pixmap = Pixmap::new(100, 40).unwrap();
        draw_trail(&mut pixmap, &segments, &Viewport::default(), LASER_COLOR, 6.0);
        assert!(ink(&pixmap) > 0);
    }

    #[test]
    fn caret_shows_without_fonts() {
        let session = TextSession {
            editor: TextEditor::new("", 10),
            anchor: Point::new(10.0, 10.0),
            target: TextTarget::New,
            style: Default::default(),
            align: Default::default(),
            color: "#000000".into(),
            caret_visible: true,
            blink_from: Instant::now(),
        };
        let mut pixmap = Pixmap::new(40, 60).unwrap();
        draw_text_session(&mut pixmap, &session, &FontBook::new(), Transform::identity());
        assert!(ink(&pixmap) > 0);
    }

    #[test]
    fn handles_add_ink_to_selection_box() {
        let view = Viewport::default();
        let b = BBox::new(10.0, 10.0, 40.0, 40.0);
        let mut plain = Pixmap::new(64, 64).unwrap();
        draw_selection(&mut plain, b, &view, "#2f80ed", false);
        let mut handled = Pixmap::new(64, 64).unwrap();
        draw_selection(&mut handled, b, &view, "#2f80ed", true);
        assert!(ink(&handled) > ink(&plain));
    }
}
