use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::canvas::{MAX_SCALE, MIN_SCALE, Viewport};
use crate::geometry::Point;
use crate::state::PointerId;

/// Screen positions of the touch contacts currently down.
#[derive(Debug, Default, Clone)]
pub struct PointerTracker {
    touches: BTreeMap<PointerId, Point>,
}

impl PointerTracker {
    pub fn down(&mut self, id: PointerId, at: Point) {
        self.touches.insert(id, at);
    }

    pub fn moved(&mut self, id: PointerId, at: Point) {
        if let Some(p) = self.touches.get_mut(&id) {
            *p = at;
        }
    }

    pub fn up(&mut self, id: PointerId) -> Option<Point> {
        self.touches.remove(&id)
    }

    pub fn count(&self) -> usize {
        self.touches.len()
    }

    pub fn contains(&self, id: PointerId) -> bool {
        self.touches.contains_key(&id)
    }

    pub fn first_two(&self) -> Option<(Point, Point)> {
        let mut it = self.touches.values().copied();
        Some((it.next()?, it.next()?))
    }

    pub fn clear(&mut self) {
        self.touches.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapGesture {
    TwoFinger,
    ThreeFinger,
}

/// Detects a quick multi-finger tap. Any contact moving past `slop` or the
/// window running out invalidates it.
#[derive(Debug, Clone)]
pub struct TapWindow {
    started: Instant,
    window: Duration,
    slop: f32,
    starts: BTreeMap<PointerId, Point>,
    lifted: BTreeSet<PointerId>,
    moved: bool,
}

impl TapWindow {
    pub fn new(now: Instant, window: Duration, slop: f32) -> Self {
        Self {
            started: now,
            window,
            slop,
            starts: BTreeMap::new(),
            lifted: BTreeSet::new(),
            moved: false,
        }
    }

    pub fn add(&mut self, id: PointerId, at: Point) {
        self.starts.insert(id, at);
    }

    pub fn moved(&mut self, id: PointerId, at: Point) {
        if let Some(start) = self.starts.get(&id) {
            if start.distance(at) > self.slop {
                self.moved = true;
            }
        }
    }

    pub fn is_valid(&self, now: Instant) -> bool {
        !self.moved && now.saturating_duration_since(self.started) <= self.window
    }

    /// Records a lift. Once every finger is up, returns the gesture if the
    /// tap is still valid.
    pub fn lift(&mut self, id: PointerId, now: Instant) -> Option<TapGesture> {
        self.lifted.insert(id);
        if self.starts.keys().any(|k| !self.lifted.contains(k)) || !self.is_valid(now) {
            return None;
        }
        match self.starts.len() {
            2 => Some(TapGesture::TwoFinger),
            3 => Some(TapGesture::ThreeFinger),
            _ => None,
        }
    }
}

/// Two-finger pinch: zoom by the distance ratio and keep the world point
/// under the initial midpoint under the current midpoint.
#[derive(Debug, Clone, Copy)]
pub struct Pinch {
    start_distance: f32,
    start_center: Point,
    start_view: Viewport,
}

impl Pinch {
    pub fn begin(a: Point, b: Point, view: Viewport) -> Self {
        Self {
            start_distance: a.distance(b).max(1.0),
            start_center: a.midpoint(b),
            start_view: view,
        }
    }

    pub fn update(&self, a: Point, b: Point) -> Viewport {
        let ratio = a.distance(b) / self.start_distance;
        let scale = (self.start_view.scale * ratio).clamp(MIN_SCALE, MAX_SCALE);
        let world = self.start_view.screen_to_world(self.start_center);
        let center = a.midpoint(b);
        Viewport {
            x: center.x - world.x * scale,
            y: center.y - world.y * scale,
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_finger_tap_fires_after_last_lift() {
        let t0 = Instant::now();
        let mut tap = TapWindow::new(t0, Duration::from_millis(250), 10.0);
        tap.add(PointerId(1), Point::new(0.0, 0.0));
        tap.add(PointerId(2), Point::new(50.0, 0.0));
        tap.moved(PointerId(1), Point::new(3.0, 2.0));
        assert_eq!(tap.lift(PointerId(1), t0 + Duration::from_millis(100)), None);
        assert_eq!(
            tap.lift(PointerId(2), t0 + Duration::from_millis(120)),
            Some(TapGesture::TwoFinger)
        );
    }

    #[test]
    fn movement_or_delay_cancels_tap() {
        let t0 = Instant::now();
        let mut tap = TapWindow::new(t0, Duration::from_millis(250), 10.0);
        for i in 0..3 {
            tap.add(PointerId(i), Point::new(i as f32 * 20.0, 0.0));
        }
        tap.moved(PointerId(0), Point::new(0.0, 40.0));
        for i in 0..3 {
            assert_eq!(tap.lift(PointerId(i), t0), None);
        }

        let mut slow = TapWindow::new(t0, Duration::from_millis(250), 10.0);
        slow.add(PointerId(1), Point::new(0.0, 0.0));
        slow.add(PointerId(2), Point::new(9.0, 0.0));
        slow.lift(PointerId(1), t0);
        assert_eq!(slow.lift(PointerId(2), t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn pinch_zooms_about_midpoint() {
        let view = Viewport::new(0.0, 0.0, 1.0);
        let pinch = Pinch::begin(Point::new(100.0, 100.0), Point::new(200.0, 100.0), view);
        let next = pinch.update(Point::new(50.0, 100.0), Point::new(250.0, 100.0));
        assert!((next.scale - 2.0).abs() < 0.001);
        let world = next.screen_to_world(Point::new(150.0, 100.0));
        assert!((world.x - 150.0).abs() < 0.001);
        assert!((world.y - 100.0).abs() < 0.001);
    }

    #[test]
    fn tracker_orders_by_id() {
        let mut tracker = PointerTracker::default();
        tracker.down(PointerId(7), Point::new(7.0, 0.0));
        tracker.down(PointerId(3), Point::new(3.0, 0.0));
        assert_eq!(
            tracker.first_two(),
            Some((Point::new(3.0, 0.0), Point::new(7.0, 0.0)))
        );
        tracker.up(PointerId(3));
        assert!(tracker.first_two().is_none());
    }
}
