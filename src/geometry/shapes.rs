use super::{BBox, PI, Point, TAU};
use crate::drawing::ShapeKind;

pub const ELLIPSE_SEGMENTS: usize = 36;
pub const STAR_INNER_RATIO: f32 = 0.4;
const ARROW_HEAD_ANGLE: f32 = PI / 6.0;

const LIGHTNING: [(f32, f32); 7] = [
    (0.55, 0.0),
    (0.2, 0.55),
    (0.48, 0.55),
    (0.35, 1.0),
    (0.8, 0.42),
    (0.52, 0.42),
    (0.7, 0.0),
];

/// One command of a vector path in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSeg {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    Close,
}

/// Regular N-gon inscribed in the ellipse `(rx, ry)`, first vertex at the top.
pub fn polygon_vertices(center: Point, rx: f32, ry: f32, n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let angle = TAU * i as f32 / n as f32 - PI / 2.0;
            Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
        })
        .collect()
}

/// Ten-point star alternating outer and inner radius, starting at the top.
pub fn star_vertices(center: Point, rx: f32, ry: f32, inner_ratio: f32) -> Vec<Point> {
    (0..10)
        .map(|i| {
            let angle = -PI / 2.0 + i as f32 * PI / 5.0;
            let k = if i % 2 == 0 { 1.0 } else { inner_ratio };
            Point::new(
                center.x + rx * k * angle.cos(),
                center.y + ry * k * angle.sin(),
            )
        })
        .collect()
}

fn ellipse_vertices(center: Point, rx: f32, ry: f32) -> Vec<Point> {
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let angle = TAU * i as f32 / ELLIPSE_SEGMENTS as f32;
            Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
        })
        .collect()
}

/// The two barb endpoints of an arrow head at `b`, ±30° off the shaft.
pub fn arrow_head(a: Point, b: Point) -> (Point, Point) {
    let len = a.distance(b);
    let head = (len * 0.25).clamp(8.0, 32.0);
    let angle = (b.y - a.y).atan2(b.x - a.x);
    let left = Point::new(
        b.x - head * (angle - ARROW_HEAD_ANGLE).cos(),
        b.y - head * (angle - ARROW_HEAD_ANGLE).sin(),
    );
    let right = Point::new(
        b.x - head * (angle + ARROW_HEAD_ANGLE).cos(),
        b.y - head * (angle + ARROW_HEAD_ANGLE).sin(),
    );
    (left, right)
}

/// Outline vertices of a closed shape, without the repeated first vertex.
/// `None` for the open kinds (line, arrow).
pub fn closed_shape_vertices(kind: ShapeKind, a: Point, b: Point) -> Option<Vec<Point>> {
    let bbox = BBox::from_corners(a, b);
    let c = bbox.center();
    let (rx, ry) = (bbox.w * 0.5, bbox.h * 0.5);
    let vertices = match kind {
        ShapeKind::Line | ShapeKind::Arrow => return None,
        ShapeKind::Rectangle => bbox.corners().to_vec(),
        ShapeKind::Circle => ellipse_vertices(c, rx, ry),
        ShapeKind::Triangle => vec![
            Point::new(c.x, bbox.y),
            Point::new(bbox.right(), bbox.bottom()),
            Point::new(bbox.x, bbox.bottom()),
        ],
        ShapeKind::Diamond => vec![
            Point::new(c.x, bbox.y),
            Point::new(bbox.right(), c.y),
            Point::new(c.x, bbox.bottom()),
            Point::new(bbox.x, c.y),
        ],
        ShapeKind::Pentagon => polygon_vertices(c, rx, ry, 5),
        ShapeKind::Hexagon => polygon_vertices(c, rx, ry, 6),
        ShapeKind::Star => star_vertices(c, rx, ry, STAR_INNER_RATIO),
        ShapeKind::Lightning => LIGHTNING
            .iter()
            .map(|(fx, fy)| Point::new(bbox.x + fx * bbox.w, bbox.y + fy * bbox.h))
            .collect(),
    };
    Some(vertices)
}

/// Point sequence for a two-point shape stroke. Closed kinds repeat the first
/// vertex at the end; line and arrow are open.
pub fn shape_to_points(kind: ShapeKind, a: Point, b: Point) -> Vec<Point> {
    match kind {
        ShapeKind::Line => vec![a, b],
        ShapeKind::Arrow => {
            let (left, right) = arrow_head(a, b);
            vec![a, b, left, b, right]
        }
        _ => {
            let mut pts = closed_shape_vertices(kind, a, b).unwrap_or_default();
            if let Some(first) = pts.first().copied() {
                pts.push(first);
            }
            pts
        }
    }
}

fn toward(from: Point, to: Point, dist: f32) -> Point {
    let d = to - from;
    let len = d.length();
    if len == 0.0 {
        return from;
    }
    from + d * (dist / len)
}

/// Closed polygon path with each corner replaced by a quadratic arc of at most
/// `radius`, clamped to half of the shorter adjacent edge.
pub fn rounded_polygon_path(vertices: &[Point], radius: f32) -> Vec<PathSeg> {
    let n = vertices.len();
    if n < 3 {
        let mut segs = Vec::new();
        if let Some(first) = vertices.first() {
            segs.push(PathSeg::MoveTo(*first));
            segs.extend(vertices[1..].iter().map(|p| PathSeg::LineTo(*p)));
        }
        return segs;
    }

    let mut segs = Vec::with_capacity(n * 2 + 2);
    for i in 0..n {
        let prev = vertices[(i + n - 1) % n];
        let cur = vertices[i];
        let next = vertices[(i + 1) % n];
        let r = radius
            .min(cur.distance(prev) * 0.5)
            .min(cur.distance(next) * 0.5)
            .max(0.0);
        let enter = toward(cur, prev, r);
        let exit = toward(cur, next, r);
        if i == 0 {
            segs.push(PathSeg::MoveTo(enter));
        } else {
            segs.push(PathSeg::LineTo(enter));
        }
        segs.push(PathSeg::QuadTo(cur, exit));
    }
    segs.push(PathSeg::Close);
    segs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rectangle_is_closed_corner_loop() {
        let pts = shape_to_points(ShapeKind::Rectangle, Point::new(10.0, 20.0), Point::new(0.0, 0.0));
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0], Point::new(0.0, 0.0));
        assert_eq!(pts[2], Point::new(10.0, 20.0));
        assert_eq!(pts[0], pts[4]);
    }

    #[test]
    fn ellipse_samples_36_points() {
        let pts = shape_to_points(ShapeKind::Circle, Point::new(0.0, 0.0), Point::new(100.0, 50.0));
        assert_eq!(pts.len(), ELLIPSE_SEGMENTS + 1);
        assert!((pts[0].x - 100.0).abs() < 0.001);
        assert!((pts[0].y - 25.0).abs() < 0.001);
    }

    #[test]
    fn polygons_start_at_top() {
        let verts = polygon_vertices(Point::new(0.0, 0.0), 10.0, 10.0, 5);
        assert!((verts[0].x).abs() < 0.001);
        assert!((verts[0].y + 10.0).abs() < 0.001);

        let star = star_vertices(Point::new(0.0, 0.0), 10.0, 10.0, 0.4);
        assert_eq!(star.len(), 10);
        assert!((star[0].y + 10.0).abs() < 0.001);
        assert!((star[1].distance(Point::new(0.0, 0.0)) - 4.0).abs() < 0.001);
    }

    #[test]
    fn arrow_has_shaft_and_two_barbs() {
        let pts = shape_to_points(ShapeKind::Arrow, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[1], Point::new(100.0, 0.0));
        assert_eq!(pts[3], Point::new(100.0, 0.0));
        assert!(pts[2].x < 100.0 && pts[4].x < 100.0);
        assert!((pts[2].y + pts[4].y).abs() < 0.001);
    }

    #[test]
    fn rounded_path_clamps_radius_to_edges() {
        let square = BBox::new(0.0, 0.0, 10.0, 10.0).corners();
        let segs = rounded_polygon_path(&square, 50.0);
        assert_eq!(segs.len(), 4 * 2 + 1);
        assert_eq!(segs[0], PathSeg::MoveTo(Point::new(0.0, 5.0)));
        assert_eq!(segs.last(), Some(&PathSeg::Close));
    }

    proptest! {
        #[test]
        fn closed_kinds_repeat_first_point(
            ax in -500.0f32..500.0, ay in -500.0f32..500.0,
            bx in -500.0f32..500.0, by in -500.0f32..500.0,
        ) {
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            for kind in ShapeKind::ALL {
                let pts = shape_to_points(kind, a, b);
                prop_assert!(!pts.is_empty());
                if !matches!(kind, ShapeKind::Line | ShapeKind::Arrow) {
                    prop_assert_eq!(pts.first(), pts.last());
                }
            }
        }
    }
}
