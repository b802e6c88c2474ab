//! Stroke-level undo/redo.
//!
//! Records that add or remove whole strokes (`Draw`, `MultiDraw`, `Erase`)
//! resolve their strokes by id when applied, and refresh their snapshot from
//! the live list at that moment, so edits made after the record was pushed
//! (points appended while drawing, a later colour change) travel with it.
//! Records that capture geometry or attributes (`Move`, `GroupMove`,
//! `Resize`, `Edit`, the attribute changes, `Reorder`) hold deep copies taken
//! when the action happened.

use crate::drawing::{FontFamily, FontSize, Stroke, StrokeId, TextAlign};
use crate::geometry::Point;

/// A text attribute value or a colour.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Font(FontFamily),
    FontSize(FontSize),
    Bold(bool),
    Italic(bool),
    Align(TextAlign),
    Color(String),
}

impl Attr {
    /// The current value of the same attribute on `stroke`.
    pub fn read_like(&self, stroke: &Stroke) -> Attr {
        match self {
            Attr::Font(_) => Attr::Font(stroke.font_family.unwrap_or_default()),
            Attr::FontSize(_) => Attr::FontSize(stroke.font_size.unwrap_or_default()),
            Attr::Bold(_) => Attr::Bold(stroke.bold),
            Attr::Italic(_) => Attr::Italic(stroke.italic),
            Attr::Align(_) => Attr::Align(stroke.align()),
            Attr::Color(_) => Attr::Color(stroke.color.clone()),
        }
    }

    pub fn write(&self, stroke: &mut Stroke) {
        match self {
            Attr::Font(f) => stroke.font_family = Some(*f),
            Attr::FontSize(s) => stroke.font_size = Some(*s),
            Attr::Bold(b) => stroke.bold = *b,
            Attr::Italic(i) => stroke.italic = *i,
            Attr::Align(a) => stroke.text_align = Some(*a),
            Attr::Color(c) => stroke.color = c.clone(),
        }
    }
}

/// Before/after value of one attribute on one stroke. Text style changes may
/// also move the anchor so the box stays visually in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrChange {
    pub id: StrokeId,
    pub before: Attr,
    pub after: Attr,
    pub anchor: Option<(Point, Point)>,
}

impl AttrChange {
    fn set(&self, strokes: &mut [Stroke], forward: bool) {
        let Some(stroke) = strokes.iter_mut().find(|s| s.id == self.id) else {
            return;
        };
        let (value, anchor) = if forward {
            (&self.after, self.anchor.map(|a| a.1))
        } else {
            (&self.before, self.anchor.map(|a| a.0))
        };
        value.write(stroke);
        if let (Some(anchor), Some(first)) = (anchor, stroke.points.first_mut()) {
            *first = anchor;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointsChange {
    pub id: StrokeId,
    pub before: Vec<Point>,
    pub after: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeState {
    pub points: Vec<Point>,
    pub font_scale: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    Draw { stroke: Stroke },
    MultiDraw { strokes: Vec<Stroke> },
    /// Removed strokes with their positions in the list, ascending.
    Erase { removed: Vec<(usize, Stroke)> },
    Move(PointsChange),
    GroupMove(Vec<PointsChange>),
    Resize {
        id: StrokeId,
        before: ResizeState,
        after: ResizeState,
    },
    Edit {
        id: StrokeId,
        before: String,
        after: String,
    },
    FontChange(AttrChange),
    FontSizeChange(AttrChange),
    BoldChange(AttrChange),
    ItalicChange(AttrChange),
    AlignChange(AttrChange),
    ColorChange(AttrChange),
    GroupColorChange(Vec<AttrChange>),
    Reorder {
        before: Vec<StrokeId>,
        after: Vec<StrokeId>,
    },
}

fn take_by_id(strokes: &mut Vec<Stroke>, id: StrokeId) -> Option<Stroke> {
    let idx = strokes.iter().position(|s| s.id == id)?;
    Some(strokes.remove(idx))
}

fn set_points(strokes: &mut [Stroke], id: StrokeId, points: &[Point]) {
    if let Some(s) = strokes.iter_mut().find(|s| s.id == id) {
        s.points = points.to_vec();
    }
}

fn reorder(strokes: &mut Vec<Stroke>, order: &[StrokeId]) {
    let mut rest = std::mem::take(strokes);
    for id in order {
        if let Some(idx) = rest.iter().position(|s| s.id == *id) {
            strokes.push(rest.remove(idx));
        }
    }
    strokes.append(&mut rest);
}

impl UndoAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            UndoAction::Draw { .. } => "draw",
            UndoAction::MultiDraw { .. } => "multi-draw",
            UndoAction::Erase { .. } => "erase",
            UndoAction::Move(_) => "move",
            UndoAction::GroupMove(_) => "group-move",
            UndoAction::Resize { .. } => "resize",
            UndoAction::Edit { .. } => "edit",
            UndoAction::FontChange(_) => "font-change",
            UndoAction::FontSizeChange(_) => "font-size-change",
            UndoAction::BoldChange(_) => "bold-change",
            UndoAction::ItalicChange(_) => "italic-change",
            UndoAction::AlignChange(_) => "align-change",
            UndoAction::ColorChange(_) => "color-change",
            UndoAction::GroupColorChange(_) => "group-color-change",
            UndoAction::Reorder { .. } => "reorder",
        }
    }

    /// Ids of the strokes this record touches.
    pub fn stroke_ids(&self) -> Vec<StrokeId> {
        match self {
            UndoAction::Draw { stroke } => vec![stroke.id],
            UndoAction::MultiDraw { strokes } => strokes.iter().map(|s| s.id).collect(),
            UndoAction::Erase { removed } => removed.iter().map(|(_, s)| s.id).collect(),
            UndoAction::Move(c) => vec![c.id],
            UndoAction::GroupMove(cs) => cs.iter().map(|c| c.id).collect(),
            UndoAction::Resize { id, .. } | UndoAction::Edit { id, .. } => vec![*id],
            UndoAction::FontChange(c)
            | UndoAction::FontSizeChange(c)
            | UndoAction::BoldChange(c)
            | UndoAction::ItalicChange(c)
            | UndoAction::AlignChange(c)
            | UndoAction::ColorChange(c) => vec![c.id],
            UndoAction::GroupColorChange(cs) => cs.iter().map(|c| c.id).collect(),
            UndoAction::Reorder { after, .. } => after.clone(),
        }
    }

    /// Strokes held by value in this record (for colour migration).
    pub fn held_strokes_mut(&mut self) -> Vec<&mut Stroke> {
        match self {
            UndoAction::Draw { stroke } => vec![stroke],
            UndoAction::MultiDraw { strokes } => strokes.iter_mut().collect(),
            UndoAction::Erase { removed } => removed.iter_mut().map(|(_, s)| s).collect(),
            _ => Vec::new(),
        }
    }

    fn revert(&mut self, strokes: &mut Vec<Stroke>) {
        match self {
            UndoAction::Draw { stroke } => {
                if let Some(live) = take_by_id(strokes, stroke.id) {
                    *stroke = live;
                }
            }
            UndoAction::MultiDraw { strokes: added } => {
                for s in added.iter_mut() {
                    if let Some(live) = take_by_id(strokes, s.id) {
                        *s = live;
                    }
                }
            }
            UndoAction::Erase { removed } => {
                for (idx, s) in removed.iter() {
                    let at = (*idx).min(strokes.len());
                    strokes.insert(at, s.clone());
                }
            }
            UndoAction::Move(c) => set_points(strokes, c.id, &c.before),
            UndoAction::GroupMove(cs) => {
                for c in cs.iter() {
                    set_points(strokes, c.id, &c.before);
                }
            }
            UndoAction::Resize { id, before, .. } => {
                if let Some(s) = strokes.iter_mut().find(|s| s.id == *id) {
                    s.points = before.points.clone();
                    s.font_scale = before.font_scale;
                }
            }
            UndoAction::Edit { id, before, .. } => {
                if let Some(s) = strokes.iter_mut().find(|s| s.id == *id) {
                    s.text = Some(before.clone());
                }
            }
            UndoAction::FontChange(c)
            | UndoAction::FontSizeChange(c)
            | UndoAction::BoldChange(c)
            | UndoAction::ItalicChange(c)
            | UndoAction::AlignChange(c)
            | UndoAction::ColorChange(c) => c.set(strokes, false),
            UndoAction::GroupColorChange(cs) => {
                for c in cs.iter().rev() {
                    c.set(strokes, false);
                }
            }
            UndoAction::Reorder { before, .. } => reorder(strokes, before),
        }
    }

    fn apply(&mut self, strokes: &mut Vec<Stroke>) {
        match self {
            UndoAction::Draw { stroke } => strokes.push(stroke.clone()),
            UndoAction::MultiDraw { strokes: added } => strokes.extend(added.iter().cloned()),
            UndoAction::Erase { removed } => {
                for (_, s) in removed.iter_mut() {
                    if let Some(live) = take_by_id(strokes, s.id) {
                        *s = live;
                    }
                }
            }
            UndoAction::Move(c) => set_points(strokes, c.id, &c.after),
            UndoAction::GroupMove(cs) => {
                for c in cs.iter() {
                    set_points(strokes, c.id, &c.after);
                }
            }
            UndoAction::Resize { id, after, .. } => {
                if let Some(s) = strokes.iter_mut().find(|s| s.id == *id) {
                    s.points = after.points.clone();
                    s.font_scale = after.font_scale;
                }
            }
            UndoAction::Edit { id, after, .. } => {
                if let Some(s) = strokes.iter_mut().find(|s| s.id == *id) {
                    s.text = Some(after.clone());
                }
            }
            UndoAction::FontChange(c)
            | UndoAction::FontSizeChange(c)
            | UndoAction::BoldChange(c)
            | UndoAction::ItalicChange(c)
            | UndoAction::AlignChange(c)
            | UndoAction::ColorChange(c) => c.set(strokes, true),
            UndoAction::GroupColorChange(cs) => {
                for c in cs.iter() {
                    c.set(strokes, true);
                }
            }
            UndoAction::Reorder { after, .. } => reorder(strokes, after),
        }
    }
}

/// Linear undo history: pushing a new action drops everything redoable.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<UndoAction>,
    redo: Vec<UndoAction>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: UndoAction) {
        log::debug!("history: push {}", action.kind_name());
        self.redo.clear();
        self.undo.push(action);
    }

    /// Drops the newest record if it is the `draw` of `id`. Used when an
    /// in-progress stroke is discarded.
    pub fn discard_draw(&mut self, id: StrokeId) -> bool {
        match self.undo.last() {
            Some(UndoAction::Draw { stroke }) if stroke.id == id => {
                self.undo.pop();
                true
            }
            _ => false,
        }
    }

    pub fn undo(&mut self, strokes: &mut Vec<Stroke>) -> Option<&UndoAction> {
        let mut action = self.undo.pop()?;
        action.revert(strokes);
        log::debug!("history: undo {}", action.kind_name());
        self.redo.push(action);
        self.redo.last()
    }

    pub fn redo(&mut self, strokes: &mut Vec<Stroke>) -> Option<&UndoAction> {
        let mut action = self.redo.pop()?;
        action.apply(strokes);
        log::debug!("history: redo {}", action.kind_name());
        self.undo.push(action);
        self.undo.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_stack(&self) -> &[UndoAction] {
        &self.undo
    }

    pub fn redo_stack(&self) -> &[UndoAction] {
        &self.redo
    }

    pub fn actions_mut(&mut self) -> impl Iterator<Item = &mut UndoAction> {
        self.undo.iter_mut().chain(self.redo.iter_mut())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::ShapeKind;

    fn placed(mut stroke: Stroke) -> Stroke {
        stroke.id = StrokeId::new();
        stroke
    }

    fn ink(points: &[(f32, f32)]) -> Stroke {
        placed(Stroke::freehand(
            points.iter().map(|(x, y)| Point::new(*x, *y)).collect(),
            "#000000",
            2.0,
        ))
    }

    fn round_trip(strokes: &mut Vec<Stroke>, history: &mut History) {
        let after = strokes.clone();
        history.undo(strokes);
        history.redo(strokes);
        assert_eq!(*strokes, after);
    }

    #[test]
    fn draw_undo_captures_live_points() {
        let mut strokes = Vec::new();
        let mut history = History::new();
        let stroke = ink(&[(0.0, 0.0)]);
        strokes.push(stroke.clone());
        history.push(UndoAction::Draw { stroke });
        strokes[0].points.push(Point::new(10.0, 0.0));
        strokes[0].points.push(Point::new(10.0, 10.0));

        history.undo(&mut strokes);
        assert!(strokes.is_empty());
        assert_eq!(history.redo_stack().len(), 1);
        match &history.redo_stack()[0] {
            UndoAction::Draw { stroke } => assert_eq!(stroke.points.len(), 3),
            other => panic!("unexpected {other:?}"),
        }

        history.redo(&mut strokes);
        assert_eq!(strokes[0].points.len(), 3);
    }

    #[test]
    fn new_action_clears_redo() {
        let mut strokes = vec![ink(&[(0.0, 0.0), (1.0, 1.0)])];
        let mut history = History::new();
        history.push(UndoAction::Draw { stroke: strokes[0].clone() });
        history.undo(&mut strokes);
        assert!(history.can_redo());

        let next = ink(&[(5.0, 5.0), (6.0, 6.0)]);
        strokes.push(next.clone());
        history.push(UndoAction::Draw { stroke: next });
        assert!(!history.can_redo());
        assert!(history.redo(&mut strokes).is_none());
        assert_eq!(strokes.len(), 1);
    }

    #[test]
    fn erase_restores_original_positions() {
        let mut strokes = vec![ink(&[(0.0, 0.0)]), ink(&[(1.0, 1.0)]), ink(&[(2.0, 2.0)])];
        let original = strokes.clone();
        let removed = vec![(0, strokes[0].clone()), (2, strokes[2].clone())];
        strokes.remove(2);
        strokes.remove(0);
        let mut history = History::new();
        history.push(UndoAction::Erase { removed });

        history.undo(&mut strokes);
        assert_eq!(strokes, original);
        history.redo(&mut strokes);
        assert_eq!(strokes, vec![original[1].clone()]);
    }

    #[test]
    fn geometric_and_attribute_records_round_trip() {
        let mut strokes = vec![
            ink(&[(0.0, 0.0), (5.0, 5.0)]),
            placed(Stroke::shape(
                ShapeKind::Star,
                Point::new(0.0, 0.0),
                Point::new(20.0, 20.0),
                "#000000",
                2.0,
            )),
        ];
        let mut history = History::new();
        let (a, b) = (strokes[0].id, strokes[1].id);

        let before = strokes[0].points.clone();
        strokes[0].translate(3.0, 4.0);
        history.push(UndoAction::Move(PointsChange {
            id: a,
            before,
            after: strokes[0].points.clone(),
        }));
        round_trip(&mut strokes, &mut history);

        strokes[1].color = "#ff0000".into();
        history.push(UndoAction::ColorChange(AttrChange {
            id: b,
            before: Attr::Color("#000000".into()),
            after: Attr::Color("#ff0000".into()),
            anchor: None,
        }));
        round_trip(&mut strokes, &mut history);

        strokes.reverse();
        history.push(UndoAction::Reorder {
            before: vec![a, b],
            after: vec![b, a],
        });
        round_trip(&mut strokes, &mut history);
        history.undo(&mut strokes);
        assert_eq!(strokes[0].id, a);
    }

    #[test]
    fn discard_draw_only_pops_matching_record() {
        let mut history = History::new();
        let s = ink(&[(0.0, 0.0)]);
        history.push(UndoAction::Draw { stroke: s.clone() });
        assert!(!history.discard_draw(StrokeId::new()));
        assert!(history.discard_draw(s.id));
        assert!(!history.can_undo());
    }
}
