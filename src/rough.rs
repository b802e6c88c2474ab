use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::drawing::ShapeKind;
use crate::geometry::{BBox, PI, Point, TAU, arrow_head, closed_shape_vertices};

#[derive(Debug, Clone)]
pub struct RoughOptions {
    pub roughness: f32,
    pub bowing: f32,
    pub max_randomness_offset: f32,
    pub curve_step_count: u32,
    pub disable_multi_stroke: bool,
    pub preserve_vertices: bool,
}

impl Default for RoughOptions {
    fn default() -> Self {
        Self {
            roughness: 1.0,
            bowing: 1.0,
            max_randomness_offset: 2.0,
            curve_step_count: 32,
            disable_multi_stroke: false,
            preserve_vertices: false,
        }
    }
}

/// Deterministic hand-drawn geometry. The same seed always yields the same
/// polylines, so a stroke looks identical on every frame.
pub struct RoughGenerator {
    rng: StdRng,
}

impl RoughGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(u64::from(seed)),
        }
    }

    fn random(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    fn offset(&mut self, min: f32, max: f32, options: &RoughOptions, gain: f32) -> f32 {
        options.roughness * gain * ((self.random() * (max - min)) + min)
    }

    fn offset_opt(&mut self, x: f32, options: &RoughOptions, gain: f32) -> f32 {
        self.offset(-x, x, options, gain)
    }

    /// Per-shape jitter drawn from the seed, so two shapes of the same kind
    /// do not wobble alike.
    pub fn options_for(&mut self, kind: ShapeKind) -> RoughOptions {
        let mut options = RoughOptions::default();
        match kind {
            ShapeKind::Circle => {
                options.roughness = 0.4 + self.random() * 0.4;
                options.bowing = 0.2 + self.random() * 0.3;
                options.max_randomness_offset = 0.5 + self.random() * 0.5;
                options.curve_step_count = 32 + (self.random() * 8.0) as u32;
            }
            ShapeKind::Arrow | ShapeKind::Line => {
                options.roughness = 0.5 + self.random() * 0.6;
                options.bowing = 0.3 + self.random() * 0.4;
                options.max_randomness_offset = 0.8 + self.random() * 0.7;
            }
            _ => {
                options.roughness = 0.7 + self.random() * 1.0;
                options.bowing = 0.3 + self.random() * 1.2;
                options.max_randomness_offset = 1.0 + self.random() * 1.5;
            }
        }
        options
    }

    pub fn rough_line(&mut self, start: Point, end: Point, options: &RoughOptions) -> Vec<Point> {
        let length_sq = (start.x - end.x).powi(2) + (start.y - end.y).powi(2);
        let length = length_sq.sqrt();

        let gain = if length < 200.0 {
            1.0
        } else if length > 500.0 {
            0.4
        } else {
            (-0.0016668) * length + 1.233334
        };

        let mut offset = options.max_randomness_offset;
        if (offset * offset * 100.0) > length_sq {
            offset = length / 10.0;
        }

        let diverge = 0.2 + self.random() * 0.2;
        let mid_x = options.bowing * options.max_randomness_offset * (end.y - start.y) / 200.0;
        let mid_y = options.bowing * options.max_randomness_offset * (start.x - end.x) / 200.0;
        let mid_x = mid_x + self.offset_opt(mid_x, options, gain);
        let mid_y = mid_y + self.offset_opt(mid_y, options, gain);

        let jitter = |g: &mut Self| {
            if options.preserve_vertices {
                0.0
            } else {
                g.offset_opt(offset, options, gain)
            }
        };
        let first = Point::new(start.x + jitter(self), start.y + jitter(self));

        let cp1 = Point::new(
            mid_x + start.x + (end.x - start.x) * diverge + self.offset_opt(offset, options, gain),
            mid_y + start.y + (end.y - start.y) * diverge + self.offset_opt(offset, options, gain),
        );
        let cp2 = Point::new(
            mid_x + start.x + 2.0 * (end.x - start.x) * diverge + self.offset_opt(offset, options, gain),
            mid_y + start.y + 2.0 * (end.y - start.y) * diverge + self.offset_opt(offset, options, gain),
        );
        let last = Point::new(end.x + jitter(self), end.y + jitter(self));

        let mut points = vec![first];
        points.extend(bezier_curve(first, cp1, cp2, last, 10));
        points
    }

    fn double_line(&mut self, a: Point, b: Point, options: &RoughOptions, out: &mut Vec<Vec<Point>>) {
        out.push(self.rough_line(a, b, options));
        if !options.disable_multi_stroke {
            out.push(self.rough_line(a, b, options));
        }
    }

    pub fn rough_polygon(&mut self, vertices: &[Point], options: &RoughOptions) -> Vec<Vec<Point>> {
        let mut lines = Vec::new();
        let n = vertices.len();
        for i in 0..n {
            self.double_line(vertices[i], vertices[(i + 1) % n], options, &mut lines);
        }
        lines
    }

    pub fn rough_ellipse(&mut self, bbox: BBox, options: &RoughOptions) -> Vec<Vec<Point>> {
        let center = bbox.center();
        let (rx, ry) = (bbox.w * 0.5, bbox.h * 0.5);

        let step_count = (options.curve_step_count + (self.random() * 4.0) as u32).clamp(16, 48);
        let increment = TAU / step_count as f32;

        let rx1 = rx + self.offset_opt(rx * 0.02, options, 1.0);
        let ry1 = ry + self.offset_opt(ry * 0.02, options, 1.0);
        let overlap = increment * self.offset(0.05, 0.1, options, 1.0);
        let mut result = vec![self.ellipse_points(increment, center, rx1, ry1, 1.0, overlap, options)];

        if !options.disable_multi_stroke {
            let second = RoughOptions {
                roughness: options.roughness * 0.8,
                ..options.clone()
            };
            let rx2 = rx + self.offset_opt(rx * 0.01, &second, 1.0);
            let ry2 = ry + self.offset_opt(ry * 0.01, &second, 1.0);
            let overlap2 = increment * self.offset(0.02, 0.05, &second, 1.0);
            result.push(self.ellipse_points(increment, center, rx2, ry2, 0.5, overlap2, &second));
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn ellipse_points(
        &mut self,
        increment: f32,
        center: Point,
        rx: f32,
        ry: f32,
        offset: f32,
        overlap: f32,
        options: &RoughOptions,
    ) -> Vec<Point> {
        let rad_offset = self.offset_opt(0.1, options, 1.0) - PI / 2.0;
        let mut points = Vec::new();

        let k = 0.98 + self.random() * 0.04;
        points.push(Point::new(
            self.offset_opt(offset * 0.3, options, 1.0) + center.x + k * rx * (rad_offset - increment).cos(),
            self.offset_opt(offset * 0.3, options, 1.0) + center.y + k * ry * (rad_offset - increment).sin(),
        ));

        let end_angle = TAU + rad_offset + overlap;
        let mut angle = rad_offset;
        while angle < end_angle {
            let m = (1.0 + self.offset_opt(0.02, options, 1.0)).clamp(0.95, 1.05);
            let prx = (rx * m + self.offset_opt(rx * 0.01, options, 1.0)).clamp(rx * 0.92, rx * 1.08);
            let pry = (ry * m + self.offset_opt(ry * 0.01, options, 1.0)).clamp(ry * 0.92, ry * 1.08);
            points.push(Point::new(
                self.offset_opt(offset * 0.2, options, 1.0) + center.x + prx * angle.cos(),
                self.offset_opt(offset * 0.2, options, 1.0) + center.y + pry * angle.sin(),
            ));
            angle += increment * (0.95 + self.random() * 0.1);
        }

        let closing = rad_offset + overlap;
        let k = 0.96 + self.random() * 0.08;
        points.push(Point::new(
            self.offset_opt(offset * 0.3, options, 1.0) + center.x + k * rx * closing.cos(),
            self.offset_opt(offset * 0.3, options, 1.0) + center.y + k * ry * closing.sin(),
        ));
        points
    }

    pub fn rough_arrow(&mut self, start: Point, end: Point, options: &RoughOptions) -> Vec<Vec<Point>> {
        let mut lines = Vec::new();
        self.double_line(start, end, options, &mut lines);
        if start.distance(end) > 0.0 {
            let (left, right) = arrow_head(start, end);
            self.double_line(left, end, options, &mut lines);
            self.double_line(right, end, options, &mut lines);
        }
        lines
    }

    /// Hand-drawn polylines for a two-point shape stroke.
    pub fn sketch(&mut self, kind: ShapeKind, a: Point, b: Point) -> Vec<Vec<Point>> {
        let options = self.options_for(kind);
        match kind {
            ShapeKind::Line => {
                let mut lines = Vec::new();
                self.double_line(a, b, &options, &mut lines);
                lines
            }
            ShapeKind::Arrow => self.rough_arrow(a, b, &options),
            ShapeKind::Circle => self.rough_ellipse(BBox::from_corners(a, b), &options),
            _ => {
                let vertices = closed_shape_vertices(kind, a, b).unwrap_or_default();
                self.rough_polygon(&vertices, &options)
            }
        }
    }
}

fn bezier_curve(p0: Point, p1: Point, p2: Point, p3: Point, segments: u32) -> Vec<Point> {
    (1..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            let (uu, tt) = (u * u, t * t);
            p0 * (uu * u) + p1 * (3.0 * uu * t) + p2 * (3.0 * u * tt) + p3 * (tt * t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sketch() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(120.0, 80.0);
        for kind in ShapeKind::ALL {
            let first = RoughGenerator::new(7).sketch(kind, a, b);
            let second = RoughGenerator::new(7).sketch(kind, a, b);
            assert_eq!(first, second, "{kind:?}");
            assert!(!first.is_empty());
        }
        assert_ne!(
            RoughGenerator::new(7).sketch(ShapeKind::Rectangle, a, b),
            RoughGenerator::new(8).sketch(ShapeKind::Rectangle, a, b)
        );
    }

    #[test]
    fn rough_line_stays_near_segment() {
        let mut g = RoughGenerator::new(1);
        let options = RoughOptions::default();
        let pts = g.rough_line(Point::new(0.0, 0.0), Point::new(100.0, 0.0), &options);
        assert_eq!(pts.len(), 11);
        assert!(pts.iter().all(|p| p.y.abs() < 20.0 && p.is_finite()));
    }

    #[test]
    fn polygon_draws_every_edge_twice() {
        let mut g = RoughGenerator::new(3);
        let options = RoughOptions::default();
        let square = BBox::new(0.0, 0.0, 50.0, 50.0).corners();
        assert_eq!(g.rough_polygon(&square, &options).len(), 8);
    }
}
