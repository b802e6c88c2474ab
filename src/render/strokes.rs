use tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Rect, Stroke as SkStroke,
    StrokeDash, Transform,
};

use super::color::paint_color;
use crate::drawing::{LineStyle, ShapeKind, Stroke, StrokeKind};
use crate::geometry::{
    BBox, PathSeg, Point, TextMeasure, arrow_head, closed_shape_vertices, rounded_polygon_path,
    smooth_points,
};
use crate::rough::RoughGenerator;
use crate::text_renderer::{BOLD_STROKE, FontBook};

pub const HIGHLIGHT_WIDTH_FACTOR: f32 = 4.0;
pub const HIGHLIGHT_ALPHA: f32 = 0.35;
pub const FILL_ALPHA: f32 = 0.3;
const SMOOTHING_RADIUS: usize = 2;
const CORNER_RADIUS_FACTOR: f32 = 1.5;
const MAX_CORNER_RADIUS: f32 = 12.0;

fn paint(color: &str, opacity: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(paint_color(color, opacity));
    paint.anti_alias = true;
    paint
}

fn line_stroke(width: f32, dashed: Option<f32>) -> SkStroke {
    let dash = dashed.and_then(|gap| {
        let on = (width * 2.0).max(4.0);
        StrokeDash::new(vec![on, on * gap.max(0.2)], 0.0)
    });
    SkStroke {
        width,
        line_cap: if dash.is_some() { LineCap::Butt } else { LineCap::Round },
        line_join: LineJoin::Round,
        dash,
        ..Default::default()
    }
}

fn polyline_path(points: &[Point]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    pb.finish()
}

/// Quadratic curves through the midpoints of an already smoothed sequence.
pub fn smooth_path(points: &[Point]) -> Option<Path> {
    let pts = smooth_points(points, SMOOTHING_RADIUS);
    if pts.len() < 3 {
        return polyline_path(&pts);
    }
    let mut pb = PathBuilder::new();
    pb.move_to(pts[0].x, pts[0].y);
    for w in pts[1..].windows(2) {
        let mid = w[0].midpoint(w[1]);
        pb.quad_to(w[0].x, w[0].y, mid.x, mid.y);
    }
    if let Some(last) = pts.last() {
        pb.line_to(last.x, last.y);
    }
    pb.finish()
}

fn segs_path(segs: &[PathSeg]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for seg in segs {
        match *seg {
            PathSeg::MoveTo(p) => pb.move_to(p.x, p.y),
            PathSeg::LineTo(p) => pb.line_to(p.x, p.y),
            PathSeg::QuadTo(c, p) => pb.quad_to(c.x, c.y, p.x, p.y),
            PathSeg::Close => pb.close(),
        }
    }
    pb.finish()
}

/// Closed outline of a variable-width stroke: the left offsets forward, then
/// the right offsets back.
pub fn pressure_outline(points: &[Point], widths: &[f32]) -> Option<Path> {
    let n = points.len().min(widths.len());
    if n < 2 {
        return None;
    }
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    for i in 0..n {
        let prev = points[i.saturating_sub(1)];
        let next = points[(i + 1).min(n - 1)];
        let d = next - prev;
        let len = d.length();
        let normal = if len > 0.0 {
            Point::new(-d.y / len, d.x / len)
        } else {
            Point::new(0.0, 0.0)
        };
        let half = widths[i].max(0.1) * 0.5;
        left.push(points[i] + normal * half);
        right.push(points[i] - normal * half);
    }
    let mut pb = PathBuilder::new();
    pb.move_to(left[0].x, left[0].y);
    for p in &left[1..] {
        pb.line_to(p.x, p.y);
    }
    for p in right.iter().rev() {
        pb.line_to(p.x, p.y);
    }
    pb.close();
    pb.finish()
}

fn shape_path(kind: ShapeKind, a: Point, b: Point, line_width: f32) -> Option<Path> {
    match kind {
        ShapeKind::Line => polyline_path(&[a, b]),
        ShapeKind::Arrow => {
            let (left, right) = arrow_head(a, b);
            let mut pb = PathBuilder::new();
            pb.move_to(a.x, a.y);
            pb.line_to(b.x, b.y);
            pb.move_to(left.x, left.y);
            pb.line_to(b.x, b.y);
            pb.line_to(right.x, right.y);
            pb.finish()
        }
        ShapeKind::Circle => Rect::from_ltrb(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
            .and_then(PathBuilder::from_oval),
        ShapeKind::Star | ShapeKind::Lightning => closed_path(&closed_shape_vertices(kind, a, b)?),
        _ => {
            let vertices = closed_shape_vertices(kind, a, b)?;
            let radius = (line_width * CORNER_RADIUS_FACTOR).min(MAX_CORNER_RADIUS);
            segs_path(&rounded_polygon_path(&vertices, radius))
        }
    }
}

fn closed_path(vertices: &[Point]) -> Option<Path> {
    let (first, rest) = vertices.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    pb.close();
    pb.finish()
}

fn fill_path(kind: ShapeKind, a: Point, b: Point) -> Option<Path> {
    match kind {
        ShapeKind::Circle => shape_path(kind, a, b, 0.0),
        _ => closed_path(&closed_shape_vertices(kind, a, b)?),
    }
}

fn draw_shape(pixmap: &mut Pixmap, stroke: &Stroke, kind: ShapeKind, ts: Transform, opacity: f32) {
    let (a, b) = (stroke.points[0], stroke.points[1]);
    if stroke.fill {
        if let Some(path) = fill_path(kind, a, b) {
            let fill = paint(&stroke.color, opacity * FILL_ALPHA);
            pixmap.fill_path(&path, &fill, FillRule::Winding, ts, None);
        }
    }
    let dashed = (stroke.style == LineStyle::Dashed).then(|| stroke.dash_gap.unwrap_or(1.0));
    let sk = line_stroke(stroke.line_width, dashed);
    let ink = paint(&stroke.color, opacity);
    match stroke.seed {
        Some(seed) => {
            for line in RoughGenerator::new(seed).sketch(kind, a, b) {
                if let Some(path) = polyline_path(&line) {
                    pixmap.stroke_path(&path, &ink, &sk, ts, None);
                }
            }
        }
        None => {
            if let Some(path) = shape_path(kind, a, b, stroke.line_width) {
                pixmap.stroke_path(&path, &ink, &sk, ts, None);
            }
        }
    }
}

/// Draws a text block line by line. Without a font nothing is drawn.
pub fn draw_text(pixmap: &mut Pixmap, stroke: &Stroke, fonts: &FontBook, ts: Transform, opacity: f32) {
    let Some(layout) = stroke.text_layout() else {
        return;
    };
    let ink = paint(&stroke.color, opacity);
    let lh = layout.line_height(fonts);
    let ascent = fonts.ascent(&layout.style);
    for (i, line) in layout.lines().enumerate() {
        let left = layout.line_start_x(fonts.line_width(line, &layout.style));
        let baseline = layout.anchor.y + lh * i as f32 + ascent;
        let Some(path) = fonts.line_path(line, &layout.style, left, baseline) else {
            continue;
        };
        pixmap.fill_path(&path, &ink, FillRule::Winding, ts, None);
        if layout.style.bold {
            let sk = SkStroke {
                width: layout.style.px() * BOLD_STROKE,
                line_join: LineJoin::Round,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &ink, &sk, ts, None);
        }
    }
}

/// Paints one stroke in world coordinates through the view transform `ts`.
pub fn draw_stroke(pixmap: &mut Pixmap, stroke: &Stroke, fonts: &FontBook, ts: Transform, opacity: f32) {
    let (width, opacity) = if stroke.highlight {
        (stroke.line_width * HIGHLIGHT_WIDTH_FACTOR, opacity * HIGHLIGHT_ALPHA)
    } else {
        (stroke.line_width, opacity)
    };
    match stroke.kind() {
        StrokeKind::Text => draw_text(pixmap, stroke, fonts, ts, opacity),
        StrokeKind::Shape(kind) => draw_shape(pixmap, stroke, kind, ts, opacity),
        StrokeKind::Dot => {
            let p = stroke.points[0];
            let r = stroke
                .widths
                .as_ref()
                .and_then(|w| w.first().copied())
                .unwrap_or(width)
                * 0.5;
            if let Some(path) = PathBuilder::from_circle(p.x, p.y, r.max(0.5)) {
                pixmap.fill_path(&path, &paint(&stroke.color, opacity), FillRule::Winding, ts, None);
            }
        }
        StrokeKind::Freehand => {
            let ink = paint(&stroke.color, opacity);
            let widths = stroke
                .widths
                .as_deref()
                .filter(|w| w.len() == stroke.points.len() && !stroke.highlight);
            if let Some(widths) = widths {
                if let Some(path) = pressure_outline(&stroke.points, widths) {
                    pixmap.fill_path(&path, &ink, FillRule::Winding, ts, None);
                }
                for (p, w) in [
                    (stroke.points[0], widths[0]),
                    (stroke.points[stroke.points.len() - 1], widths[widths.len() - 1]),
                ] {
                    if let Some(cap) = PathBuilder::from_circle(p.x, p.y, (w * 0.5).max(0.5)) {
                        pixmap.fill_path(&cap, &ink, FillRule::Winding, ts, None);
                    }
                }
            } else if let Some(path) = smooth_path(&stroke.points) {
                let dashed =
                    (stroke.style == LineStyle::Dashed).then(|| stroke.dash_gap.unwrap_or(1.0));
                pixmap.stroke_path(&path, &ink, &line_stroke(width, dashed), ts, None);
            }
        }
    }
}

/// World-to-screen transform of a view.
pub fn view_transform(view: &crate::canvas::Viewport) -> Transform {
    Transform::from_scale(view.scale, view.scale).post_translate(view.x, view.y)
}

/// Dashed box used for selection outlines, in screen pixels.
pub fn outline_box(pixmap: &mut Pixmap, b: BBox, color: &str, dashed: bool) {
    if let Some(rect) = Rect::from_xywh(b.x, b.y, b.w.max(1.0), b.h.max(1.0)) {
        let path = PathBuilder::from_rect(rect);
        let sk = line_stroke(1.5, dashed.then_some(1.0));
        pixmap.stroke_path(&path, &paint(color, 1.0), &sk, Transform::identity(), None);
    }
}
