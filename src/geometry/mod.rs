mod shapes;
mod text_layout;

pub use shapes::{
    ELLIPSE_SEGMENTS, PathSeg, arrow_head, closed_shape_vertices, polygon_vertices,
    rounded_polygon_path, shape_to_points, star_vertices,
};
pub use text_layout::{
    HeuristicMeasure, LineMetrics, TextLayout, TextMeasure, TextStyle, caret_pos_from_click,
    line_col, text_bbox,
};

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

pub const PI: f32 = std::f32::consts::PI;
pub const TAU: f32 = std::f32::consts::TAU;

/// A 2D point. World coordinates unless a function says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned box, `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Box spanned by two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            w: (a.x - b.x).abs(),
            h: (a.y - b.y).abs(),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn padded(&self, pad: f32) -> Self {
        Self::new(self.x - pad, self.y - pad, self.w + pad * 2.0, self.h + pad * 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_box(&self, other: &BBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn union(&self, other: &BBox) -> BBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BBox::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Corners clockwise from top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let line_length_squared = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);

    if line_length_squared == 0.0 {
        return p.distance(a);
    }

    let t = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / line_length_squared;
    let t = t.clamp(0.0, 1.0);

    let projection = Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    p.distance(projection)
}

/// True if any vertex is within `radius` of `p` or any consecutive segment passes within it.
pub fn polyline_hit(points: &[Point], p: Point, radius: f32) -> bool {
    if points.iter().any(|v| v.distance(p) <= radius) {
        return true;
    }
    points
        .windows(2)
        .any(|w| distance_to_segment(p, w[0], w[1]) <= radius)
}

/// Moving-average smoothing over a window of `2 * radius + 1` points.
/// Endpoints are kept so strokes still start and end where the pointer did.
pub fn smooth_points(points: &[Point], radius: usize) -> Vec<Point> {
    if points.len() < 3 || radius == 0 {
        return points.to_vec();
    }
    let last = points.len() - 1;
    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for i in 1..last {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(last);
        let n = (hi - lo + 1) as f32;
        let sum = points[lo..=hi]
            .iter()
            .fold(Point::default(), |acc, p| acc + *p);
        out.push(sum * (1.0 / n));
    }
    out.push(points[last]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_segment_projects_inside() {
        let d = distance_to_segment(Point::new(5.0, 3.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 0.001);
    }

    #[test]
    fn distance_to_segment_clamps_to_endpoints() {
        let d = distance_to_segment(Point::new(13.0, 4.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 0.001);
    }

    #[test]
    fn zero_length_segment_is_point_distance() {
        let a = Point::new(2.0, 2.0);
        let d = distance_to_segment(Point::new(5.0, 6.0), a, a);
        assert!((d - 5.0).abs() < 0.001);
        assert!(d.is_finite());
    }

    #[test]
    fn smoothing_keeps_endpoints() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 10.0),
        ];
        let out = smooth_points(&pts, 1);
        assert_eq!(out.len(), pts.len());
        assert_eq!(out[0], pts[0]);
        assert_eq!(out[3], pts[3]);
        assert!((out[1].y - 10.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn bbox_intersection_and_containment() {
        let outer = BBox::new(0.0, 0.0, 100.0, 100.0);
        let inner = BBox::new(10.0, 10.0, 20.0, 20.0);
        let straddling = BBox::new(90.0, 90.0, 20.0, 20.0);
        assert!(outer.contains_box(&inner));
        assert!(!outer.contains_box(&straddling));
        assert!(outer.intersects(&straddling));
        assert!(!inner.intersects(&straddling));
    }

    #[test]
    fn polyline_hit_uses_segments() {
        let pts = [Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        assert!(polyline_hit(&pts, Point::new(50.0, 4.0), 5.0));
        assert!(!polyline_hit(&pts, Point::new(50.0, 6.0), 5.0));
    }
}
