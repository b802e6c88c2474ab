use std::time::Instant;

use crate::app_state::Engine;
use crate::canvas::{ViewAnimation, Viewport};
use crate::geometry::Point;
use crate::state::Interaction;

/// Coalesces redraw requests: any number of requests between two frames
/// produce one frame.
#[derive(Debug, Default, Clone)]
pub struct RedrawScheduler {
    pending: bool,
}

impl RedrawScheduler {
    /// Returns false when a frame was already pending.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

impl Engine {
    /// Advances time-driven state: view animation, caret blink, the debounced
    /// save and trail fading. Returns whether a frame should be drawn.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Some(animation) = self.animation {
            self.set_view(animation.sample(now));
            if animation.is_finished(now) {
                self.animation = None;
                self.save_view();
            }
        }

        let blink = self.config.caret_blink();
        if let Interaction::WritingText(session) = &mut self.interaction {
            let phase = now.saturating_duration_since(session.blink_from).as_millis() / blink.as_millis().max(1);
            let visible = phase % 2 == 0;
            if visible != session.caret_visible {
                session.caret_visible = visible;
                self.redraw.request();
            }
        }

        if self.save.poll(now) {
            log::debug!("debounced save of canvas {}", self.session.index);
            self.save_strokes_now();
        }

        for trail in [&mut self.erase_trail, &mut self.laser_trail] {
            if !trail.is_empty() {
                trail.prune(now);
                self.redraw.request();
            }
        }

        self.redraw.take()
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw.is_pending()
    }

    /// Earliest instant `tick` has work to do, so the host can sleep until
    /// then.
    pub fn next_deadline(&self) -> Option<Instant> {
        let busy = self.animation.is_some() || !self.erase_trail.is_empty() || !self.laser_trail.is_empty();
        if busy {
            return Some(Instant::now());
        }
        let blink = match &self.interaction {
            Interaction::WritingText(session) => Some(session.blink_from + self.config.caret_blink()),
            _ => None,
        };
        match (blink, self.save.due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub(crate) fn animate_to(&mut self, target: Viewport, now: Instant) {
        let duration = self.config.view_animation();
        if duration.is_zero() {
            self.animation = None;
            self.set_view(target);
            self.save_view();
            return;
        }
        self.animation = Some(ViewAnimation::new(self.session.view, target, now, duration));
        self.request_redraw();
    }

    /// Animates to 100% with the world origin centered.
    pub fn reset_view(&mut self, now: Instant) {
        let target = self.default_view();
        self.animate_to(target, now);
    }

    /// Animates so every stroke is visible. An empty canvas resets instead.
    pub fn fit_to_content(&mut self, now: Instant) {
        let (w, h) = (self.size.0 as f32, self.size.1 as f32);
        match self.session.content_bbox(&self.renderer.fonts) {
            Some(content) => {
                let target = Viewport::fit_to(content, w, h, self.config.fit_padding_px);
                self.animate_to(target, now);
            }
            None => self.reset_view(now),
        }
    }

    /// Zooms around the canvas center.
    pub(crate) fn zoom_step(&mut self, factor: f32) {
        self.animation = None;
        let mut view = self.session.view;
        let center = Point::new(self.size.0 as f32 * 0.5, self.size.1 as f32 * 0.5);
        if view.zoom_at(center, factor) {
            self.set_view(view);
            self.save_view();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{ShapeKind, Stroke};
    use crate::events::{Command, EngineEvent};
    use crate::persistence::CanvasStorage;
    use crate::settings::{EngineConfig, Settings};
    use crate::text_renderer::FontBook;
    use std::time::Duration;

    fn engine() -> Engine {
        Engine::with_storage(
            EngineConfig::default(),
            Settings::default(),
            CanvasStorage::in_memory(),
            FontBook::new(),
            800,
            600,
        )
    }

    #[test]
    fn scheduler_coalesces() {
        let mut r = RedrawScheduler::default();
        assert!(r.request());
        assert!(!r.request());
        assert!(r.take());
        assert!(!r.take());
    }

    #[test]
    fn fit_animates_and_lands_on_target() {
        let mut e = engine();
        let strokes = vec![Stroke::shape(
            ShapeKind::Rectangle,
            Point::new(1000.0, 1000.0),
            Point::new(3000.0, 2000.0),
            "#000000",
            2.0,
        )];
        let t = Instant::now();
        e.import_strokes(strokes);
        e.drain_events();
        e.fit_to_content(t);

        let halfway = t + e.config().view_animation() / 2;
        e.tick(halfway);
        assert!(e.view().scale < 1.0);

        e.tick(t + e.config().view_animation() + Duration::from_millis(1));
        let view = e.view();
        let center = view.world_to_screen(Point::new(2000.0, 1500.0));
        assert!((center.x - 400.0).abs() < 0.5);
        assert!((center.y - 300.0).abs() < 0.5);
        assert!(e.next_deadline().is_none());
        assert!(e.drain_events().iter().any(|ev| matches!(ev, EngineEvent::ZoomChanged(_))));
    }

    #[test]
    fn zoom_steps_around_center() {
        let mut e = engine();
        let center = Point::new(400.0, 300.0);
        let before = e.view().screen_to_world(center);
        e.dispatch(Command::ZoomIn);
        assert!((e.view().scale - 1.2).abs() < 1e-4);
        let after = e.view().screen_to_world(center);
        assert!(before.distance(after) < 1e-3);
    }

    #[test]
    fn caret_blinks_while_writing() {
        let mut e = engine();
        e.dispatch(Command::SetTool(crate::state::Tool::Text));
        let t = Instant::now();
        let at = Point::new(100.0, 100.0);
        e.pointer_down(crate::state::PointerInput::mouse(at, t));
        e.pointer_up(crate::state::PointerInput::mouse(at, t));
        let blink_from = e.interaction.text_session().map(|s| s.blink_from).unwrap();
        e.tick(blink_from + e.config().caret_blink() + Duration::from_millis(10));
        assert!(!e.interaction.text_session().unwrap().caret_visible);
        e.tick(blink_from + e.config().caret_blink() * 2 + Duration::from_millis(10));
        assert!(e.interaction.text_session().unwrap().caret_visible);
    }
}
