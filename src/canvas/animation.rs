use std::time::{Duration, Instant};

use super::Viewport;

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Time-driven transition between two viewports. Starting a new one simply
/// replaces the old value; there is no other cancellation.
#[derive(Debug, Clone, Copy)]
pub struct ViewAnimation {
    from: Viewport,
    to: Viewport,
    started: Instant,
    duration: Duration,
}

impl ViewAnimation {
    pub fn new(from: Viewport, to: Viewport, started: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
        }
    }

    pub fn target(&self) -> Viewport {
        self.to
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }

    pub fn sample(&self, now: Instant) -> Viewport {
        if self.duration.is_zero() || self.is_finished(now) {
            return self.to;
        }
        let t = now.saturating_duration_since(self.started).as_secs_f32() / self.duration.as_secs_f32();
        let e = ease_in_out_cubic(t.clamp(0.0, 1.0));
        let lerp = |a: f32, b: f32| a + (b - a) * e;
        Viewport {
            x: lerp(self.from.x, self.to.x),
            y: lerp(self.from.y, self.to.y),
            scale: lerp(self.from.scale, self.to.scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_is_symmetric() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 0.001);
        assert!((ease_in_out_cubic(0.25) + ease_in_out_cubic(0.75) - 1.0).abs() < 0.001);
    }

    #[test]
    fn sample_reaches_target() {
        let start = Instant::now();
        let from = Viewport::new(0.0, 0.0, 1.0);
        let to = Viewport::new(100.0, 50.0, 2.0);
        let anim = ViewAnimation::new(from, to, start, Duration::from_millis(300));
        assert_eq!(anim.sample(start), from);
        let mid = anim.sample(start + Duration::from_millis(150));
        assert!((mid.x - 50.0).abs() < 0.01);
        assert!(!anim.is_finished(start + Duration::from_millis(150)));
        assert_eq!(anim.sample(start + Duration::from_millis(400)), to);
        assert!(anim.is_finished(start + Duration::from_millis(300)));
    }
}
