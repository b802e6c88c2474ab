use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::geometry::Point;

#[derive(Debug, Clone, Copy)]
struct TrailPoint {
    at: Point,
    time: Instant,
}

/// One drawable piece of a trail. `progress` runs from 0 at the oldest
/// segment to 1 at the newest; `fade` drops from 1 to 0 as the segment ages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub from: Point,
    pub to: Point,
    pub progress: f32,
    pub fade: f32,
}

/// Fading pointer trail shared by the eraser and the laser. Visual only.
#[derive(Debug, Clone)]
pub struct Trail {
    points: VecDeque<TrailPoint>,
    max_points: usize,
    lifetime: Duration,
}

impl Trail {
    pub fn new(max_points: usize, lifetime: Duration) -> Self {
        Self {
            points: VecDeque::with_capacity(max_points),
            max_points: max_points.max(2),
            lifetime,
        }
    }

    pub fn push(&mut self, at: Point, now: Instant) {
        if self.points.len() == self.max_points {
            self.points.pop_front();
        }
        self.points.push_back(TrailPoint { at, time: now });
    }

    /// Drops expired points. Returns whether anything is left to draw.
    pub fn prune(&mut self, now: Instant) -> bool {
        while let Some(front) = self.points.front() {
            if now.saturating_duration_since(front.time) > self.lifetime {
                self.points.pop_front();
            } else {
                break;
            }
        }
        self.points.len() > 1
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn segments(&self, now: Instant) -> Vec<TrailSegment> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        let life = self.lifetime.as_secs_f32().max(f32::EPSILON);
        self.points
            .iter()
            .zip(self.points.iter().skip(1))
            .enumerate()
            .map(|(i, (a, b))| {
                let age = now.saturating_duration_since(b.time).as_secs_f32();
                TrailSegment {
                    from: a.at,
                    to: b.at,
                    progress: (i + 1) as f32 / (n - 1) as f32,
                    fade: (1.0 - age / life).clamp(0.0, 1.0),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_at_most_max_points() {
        let now = Instant::now();
        let mut trail = Trail::new(4, Duration::from_millis(300));
        for i in 0..10 {
            trail.push(Point::new(i as f32, 0.0), now);
        }
        let segs = trail.segments(now);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].from, Point::new(6.0, 0.0));
        assert_eq!(segs[2].progress, 1.0);
        assert!(segs[0].progress < segs[2].progress);
    }

    #[test]
    fn expires_old_points() {
        let t0 = Instant::now();
        let mut trail = Trail::new(16, Duration::from_millis(100));
        trail.push(Point::new(0.0, 0.0), t0);
        trail.push(Point::new(1.0, 0.0), t0 + Duration::from_millis(50));
        trail.push(Point::new(2.0, 0.0), t0 + Duration::from_millis(90));
        assert!(trail.prune(t0 + Duration::from_millis(120)));
        assert!(!trail.prune(t0 + Duration::from_millis(500)));
        assert!(trail.is_empty());
    }
}
