use serde::{Deserialize, Serialize};

use crate::geometry::{BBox, Point};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 10.0;

/// Pan offset (screen pixels) and zoom. `screen = world * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(x: f32, y: f32, scale: f32) -> Self {
        Self {
            x,
            y,
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
        }
    }

    /// World origin at the center of a `width` x `height` canvas, 100% zoom.
    pub fn centered(width: f32, height: f32) -> Self {
        Self::new(width * 0.5, height * 0.5, 1.0)
    }

    pub fn offset(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.scale, (screen.y - self.y) / self.scale)
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.scale + self.x, world.y * self.scale + self.y)
    }

    /// Replaces non-finite fields and clamps the scale; used on loaded data.
    pub fn sanitized(self, fallback: Viewport) -> Viewport {
        if !(self.x.is_finite() && self.y.is_finite() && self.scale.is_finite()) || self.scale <= 0.0 {
            return fallback;
        }
        Viewport::new(self.x, self.y, self.scale)
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Multiplies the zoom by `factor`, keeping the world point under `screen`
    /// fixed. Returns whether the scale changed.
    pub fn zoom_at(&mut self, screen: Point, factor: f32) -> bool {
        self.zoom_to(screen, self.scale * factor)
    }

    pub fn zoom_to(&mut self, screen: Point, scale: f32) -> bool {
        let before = self.screen_to_world(screen);
        let old = self.scale;
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        self.x = screen.x - before.x * self.scale;
        self.y = screen.y - before.y * self.scale;
        (self.scale - old).abs() > f32::EPSILON
    }

    /// Viewport that shows `content` centered in the canvas with `padding`
    /// screen pixels around it, never zooming in past 100%.
    pub fn fit_to(content: BBox, width: f32, height: f32, padding: f32) -> Viewport {
        let avail_w = (width - padding * 2.0).max(1.0);
        let avail_h = (height - padding * 2.0).max(1.0);
        let sx = if content.w > 0.0 { avail_w / content.w } else { 1.0 };
        let sy = if content.h > 0.0 { avail_h / content.h } else { 1.0 };
        let scale = sx.min(sy).min(1.0).clamp(MIN_SCALE, MAX_SCALE);
        let c = content.center();
        Viewport {
            x: width * 0.5 - c.x * scale,
            y: height * 0.5 - c.y * scale,
            scale,
        }
    }

    /// World-space rectangle visible in a `width` x `height` canvas.
    pub fn visible_world(&self, width: f32, height: f32) -> BBox {
        let tl = self.screen_to_world(Point::new(0.0, 0.0));
        BBox::new(tl.x, tl.y, width / self.scale, height / self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zoom_keeps_cursor_anchor() {
        let mut view = Viewport::new(40.0, -20.0, 1.0);
        let cursor = Point::new(300.0, 200.0);
        let world_before = view.screen_to_world(cursor);
        assert!(view.zoom_at(cursor, 2.0));
        let world_after = view.screen_to_world(cursor);
        assert!((world_before.x - world_after.x).abs() < 0.001);
        assert!((world_before.y - world_after.y).abs() < 0.001);
    }

    #[test]
    fn zoom_clamps() {
        let mut view = Viewport::default();
        view.zoom_at(Point::new(0.0, 0.0), 1000.0);
        assert_eq!(view.scale, MAX_SCALE);
        assert!(!view.zoom_at(Point::new(0.0, 0.0), 2.0));
        view.zoom_at(Point::new(0.0, 0.0), 0.0001);
        assert_eq!(view.scale, MIN_SCALE);
    }

    #[test]
    fn fit_centers_content() {
        let content = BBox::new(100.0, 100.0, 200.0, 100.0);
        let view = Viewport::fit_to(content, 800.0, 600.0, 40.0);
        let c = view.world_to_screen(content.center());
        assert!((c.x - 400.0).abs() < 0.001);
        assert!((c.y - 300.0).abs() < 0.001);
        assert_eq!(view.scale, 1.0);
    }

    #[test]
    fn sanitized_rejects_garbage() {
        let fallback = Viewport::centered(100.0, 100.0);
        let bad = Viewport {
            x: f32::NAN,
            y: 0.0,
            scale: 1.0,
        };
        assert_eq!(bad.sanitized(fallback), fallback);
        let big = Viewport {
            x: 0.0,
            y: 0.0,
            scale: 50.0,
        };
        assert_eq!(big.sanitized(fallback).scale, MAX_SCALE);
    }

    proptest! {
        #[test]
        fn screen_world_round_trip(
            x in -5000.0f32..5000.0, y in -5000.0f32..5000.0,
            ox in -2000.0f32..2000.0, oy in -2000.0f32..2000.0,
            scale in MIN_SCALE..=MAX_SCALE,
        ) {
            let view = Viewport::new(ox, oy, scale);
            let p = Point::new(x, y);
            let back = view.screen_to_world(view.world_to_screen(p));
            let tol = 1e-3 * (1.0 + x.abs().max(y.abs()) + (ox.abs().max(oy.abs()) / scale));
            prop_assert!((back.x - p.x).abs() <= tol);
            prop_assert!((back.y - p.y).abs() <= tol);
        }
    }
}
