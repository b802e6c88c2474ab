use std::collections::HashMap;

use super::{CanvasIndex, CanvasSession};
use crate::drawing::Stroke;
use crate::history::{Attr, UndoAction};
use crate::settings::Theme;

/// Sessions that are not active, kept in memory so switching back is a swap.
///
/// Entries are never evicted. Keys are `CanvasIndex` values, so the cache
/// holds at most `CANVAS_COUNT` sessions.
#[derive(Debug, Default)]
pub struct SessionCache {
    sessions: HashMap<CanvasIndex, CanvasSession>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self, index: CanvasIndex) -> Option<CanvasSession> {
        self.sessions.remove(&index)
    }

    pub fn park(&mut self, session: CanvasSession) {
        self.sessions.insert(session.index, session);
    }

    pub fn contains(&self, index: CanvasIndex) -> bool {
        self.sessions.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut CanvasSession> {
        self.sessions.values_mut()
    }
}

fn swap_color(color: &mut String, from: &str, to: &str) -> bool {
    if color.eq_ignore_ascii_case(from) {
        *color = to.to_string();
        true
    } else {
        false
    }
}

pub fn swap_stroke_colors<'a>(
    strokes: impl IntoIterator<Item = &'a mut Stroke>,
    from: &str,
    to: &str,
) -> usize {
    strokes
        .into_iter()
        .map(|s| swap_color(&mut s.color, from, to))
        .filter(|swapped| *swapped)
        .count()
}

/// Rewrites every colour equal to `from`'s default ink into `to`'s default,
/// in the live list and in the history records.
///
/// A stroke deliberately drawn in exactly the old default colour is swapped
/// too; the model does not track whether a colour was user-chosen.
pub fn swap_theme_colors(session: &mut CanvasSession, from: Theme, to: Theme) -> usize {
    if from == to {
        return 0;
    }
    let (old, new) = (from.default_stroke_color(), to.default_stroke_color());
    let mut swapped = swap_stroke_colors(session.strokes.iter_mut(), old, new);
    for action in session.history.actions_mut() {
        match action {
            UndoAction::ColorChange(c) => {
                for attr in [&mut c.before, &mut c.after] {
                    if let Attr::Color(color) = attr {
                        swap_color(color, old, new);
                    }
                }
            }
            UndoAction::GroupColorChange(cs) => {
                for c in cs.iter_mut() {
                    for attr in [&mut c.before, &mut c.after] {
                        if let Attr::Color(color) = attr {
                            swap_color(color, old, new);
                        }
                    }
                }
            }
            other => {
                swapped += swap_stroke_colors(other.held_strokes_mut(), old, new);
            }
        }
    }
    swapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CANVAS_COUNT, Viewport};
    use crate::geometry::Point;

    fn ink(color: &str) -> Stroke {
        Stroke::freehand(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)], color, 2.0)
    }

    #[test]
    fn park_and_take() {
        let mut cache = SessionCache::new();
        let index = CanvasIndex::new(3).unwrap();
        cache.park(CanvasSession::new(index, Viewport::default()));
        assert!(cache.contains(index));
        assert!(cache.take(index).is_some());
        assert!(cache.is_empty());
    }

    #[test]
    fn holds_at_most_one_session_per_slot() {
        let mut cache = SessionCache::new();
        for _ in 0..2 {
            for index in CanvasIndex::all() {
                cache.park(CanvasSession::new(index, Viewport::default()));
            }
        }
        assert_eq!(cache.len(), usize::from(CANVAS_COUNT));
    }

    #[test]
    fn theme_flip_swaps_only_default_ink() {
        let mut session = CanvasSession::with_strokes(
            CanvasIndex::FIRST,
            vec![ink("#000000"), ink("#FF0000"), ink("#000000")],
            Viewport::default(),
        );
        let erased = session.remove_strokes(&[session.strokes[2].id]).unwrap();
        session.record(erased);

        let n = swap_theme_colors(&mut session, Theme::Light, Theme::Dark);
        assert_eq!(n, 2);
        assert_eq!(session.strokes[0].color, "#ffffff");
        assert_eq!(session.strokes[1].color, "#FF0000");

        session.undo();
        assert_eq!(session.strokes[2].color, "#ffffff");
    }

    #[test]
    fn same_theme_is_noop() {
        let mut session =
            CanvasSession::with_strokes(CanvasIndex::FIRST, vec![ink("#000000")], Viewport::default());
        assert_eq!(swap_theme_colors(&mut session, Theme::Dark, Theme::Dark), 0);
    }
}
