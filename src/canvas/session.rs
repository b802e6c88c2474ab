use serde::{Deserialize, Serialize};
use std::fmt;

use super::Viewport;
use crate::drawing::{Stroke, StrokeId, combined_bbox};
use crate::geometry::{BBox, TextMeasure};
use crate::history::{History, UndoAction};

pub const CANVAS_COUNT: u8 = 9;

/// A canvas slot, 1 through 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CanvasIndex(u8);

impl CanvasIndex {
    pub const FIRST: CanvasIndex = CanvasIndex(1);

    pub fn new(n: u8) -> Option<Self> {
        (1..=CANVAS_COUNT).contains(&n).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = CanvasIndex> {
        (1..=CANVAS_COUNT).map(CanvasIndex)
    }
}

impl TryFrom<u8> for CanvasIndex {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        CanvasIndex::new(n).ok_or_else(|| format!("canvas index {n} out of range 1..={CANVAS_COUNT}"))
    }
}

impl From<CanvasIndex> for u8 {
    fn from(index: CanvasIndex) -> u8 {
        index.0
    }
}

impl fmt::Display for CanvasIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything that belongs to one canvas slot.
#[derive(Debug, Clone)]
pub struct CanvasSession {
    pub index: CanvasIndex,
    pub strokes: Vec<Stroke>,
    pub history: History,
    pub view: Viewport,
}

impl CanvasSession {
    pub fn new(index: CanvasIndex, view: Viewport) -> Self {
        Self {
            index,
            strokes: Vec::new(),
            history: History::new(),
            view,
        }
    }

    /// Session over loaded strokes; every stroke gets a fresh runtime id.
    pub fn with_strokes(index: CanvasIndex, strokes: Vec<Stroke>, view: Viewport) -> Self {
        let mut session = Self::new(index, view);
        for stroke in strokes {
            session.add_stroke(stroke);
        }
        session
    }

    /// Appends a stroke, assigning an id if it has none. No undo record.
    pub fn add_stroke(&mut self, mut stroke: Stroke) -> StrokeId {
        if !stroke.id.is_assigned() {
            stroke.id = StrokeId::new();
        }
        let id = stroke.id;
        self.strokes.push(stroke);
        id
    }

    pub fn find(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|s| s.id == id)
    }

    pub fn find_mut(&mut self, id: StrokeId) -> Option<&mut Stroke> {
        self.strokes.iter_mut().find(|s| s.id == id)
    }

    pub fn position(&self, id: StrokeId) -> Option<usize> {
        self.strokes.iter().position(|s| s.id == id)
    }

    pub fn order(&self) -> Vec<StrokeId> {
        self.strokes.iter().map(|s| s.id).collect()
    }

    pub fn content_bbox(&self, measure: &dyn TextMeasure) -> Option<BBox> {
        combined_bbox(&self.strokes, measure)
    }

    pub fn record(&mut self, action: UndoAction) {
        self.history.push(action);
    }

    pub fn undo(&mut self) -> Option<&UndoAction> {
        self.history.undo(&mut self.strokes)
    }

    pub fn redo(&mut self) -> Option<&UndoAction> {
        self.history.redo(&mut self.strokes)
    }

    /// Removes `ids` from the list and returns the matching `erase` record,
    /// or `None` if none of them were present. The record is not pushed.
    pub fn remove_strokes(&mut self, ids: &[StrokeId]) -> Option<UndoAction> {
        let removed: Vec<(usize, Stroke)> = self
            .strokes
            .iter()
            .enumerate()
            .filter(|(_, s)| ids.contains(&s.id))
            .map(|(i, s)| (i, s.clone()))
            .collect();
        if removed.is_empty() {
            return None;
        }
        self.strokes.retain(|s| !ids.contains(&s.id));
        Some(UndoAction::Erase { removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn dot(x: f32) -> Stroke {
        Stroke::freehand(vec![Point::new(x, 0.0)], "#000000", 2.0)
    }

    #[test]
    fn index_range_is_one_to_nine() {
        assert!(CanvasIndex::new(0).is_none());
        assert!(CanvasIndex::new(10).is_none());
        assert_eq!(CanvasIndex::new(9).map(|i| i.get()), Some(9));
        assert_eq!(CanvasIndex::all().count(), 9);
        assert!(serde_json::from_str::<CanvasIndex>("12").is_err());
    }

    #[test]
    fn loaded_strokes_get_unique_ids() {
        let session = CanvasSession::with_strokes(
            CanvasIndex::FIRST,
            vec![dot(0.0), dot(1.0)],
            Viewport::default(),
        );
        assert!(session.strokes.iter().all(|s| s.id.is_assigned()));
        assert_ne!(session.strokes[0].id, session.strokes[1].id);
    }

    #[test]
    fn remove_strokes_builds_ordered_erase() {
        let mut session = CanvasSession::with_strokes(
            CanvasIndex::FIRST,
            vec![dot(0.0), dot(1.0), dot(2.0)],
            Viewport::default(),
        );
        let ids = [session.strokes[2].id, session.strokes[0].id];
        let Some(UndoAction::Erase { removed }) = session.remove_strokes(&ids) else {
            panic!("expected erase record");
        };
        assert_eq!(removed.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(session.strokes.len(), 1);
        assert!(session.remove_strokes(&ids).is_none());
    }
}
