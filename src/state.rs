use serde::{Deserialize, Serialize};
use std::time::Instant;
use winit::keyboard::ModifiersState;

use crate::canvas::Viewport;
use crate::drawing::{ShapeKind, StrokeId, TextAlign};
use crate::geometry::{BBox, Point, TextStyle};
use crate::gestures::Pinch;
use crate::text_input::TextEditor;

/// Tool picked in the toolbar. On desktop, held keys override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pen,
    DashedPen,
    Line,
    Shape,
    Highlighter,
    Eraser,
    Laser,
    Text,
    Select,
    Pan,
}

/// What a primary-button drag does right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Freehand { dashed: bool },
    Line,
    Shape(ShapeKind),
    Highlight,
    Erase,
    Laser,
    Pan,
    Text,
    Select,
}

/// Keyboard state that feeds mode resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeldKeys {
    pub space: bool,
    pub laser: bool,
    pub highlight: bool,
    pub dashed: bool,
    pub shape: Option<ShapeKind>,
    pub modifiers: ModifiersState,
}

impl HeldKeys {
    pub fn command(&self) -> bool {
        self.modifiers.control_key() || self.modifiers.super_key()
    }

    /// Resolves the drag mode. Priority: panning, laser, highlight, keyed
    /// shape, shape modifier, erase modifier, line modifier, then the tool.
    pub fn resolve(&self, tool: Tool, settings_shape: ShapeKind) -> Mode {
        if self.space || tool == Tool::Pan {
            return Mode::Pan;
        }
        match tool {
            Tool::Text => return Mode::Text,
            Tool::Select => return Mode::Select,
            _ => {}
        }
        if self.laser {
            Mode::Laser
        } else if self.highlight {
            Mode::Highlight
        } else if let Some(kind) = self.shape {
            Mode::Shape(kind)
        } else if self.command() {
            Mode::Shape(settings_shape)
        } else if self.modifiers.alt_key() {
            Mode::Erase
        } else if self.modifiers.shift_key() {
            Mode::Line
        } else if self.dashed {
            Mode::Freehand { dashed: true }
        } else {
            match tool {
                Tool::Pen => Mode::Freehand { dashed: false },
                Tool::DashedPen => Mode::Freehand { dashed: true },
                Tool::Line => Mode::Line,
                Tool::Shape => Mode::Shape(settings_shape),
                Tool::Highlighter => Mode::Highlight,
                Tool::Eraser => Mode::Erase,
                Tool::Laser => Mode::Laser,
                Tool::Text => Mode::Text,
                Tool::Select => Mode::Select,
                Tool::Pan => Mode::Pan,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// One pointer sample from the host, in screen pixels.
#[derive(Debug, Clone, Copy)]
pub struct PointerInput {
    pub id: PointerId,
    pub kind: PointerKind,
    pub button: PointerButton,
    pub position: Point,
    pub pressure: f32,
    pub time: Instant,
}

impl PointerInput {
    pub fn mouse(position: Point, time: Instant) -> Self {
        Self {
            id: PointerId(0),
            kind: PointerKind::Mouse,
            button: PointerButton::Primary,
            position,
            pressure: 0.5,
            time,
        }
    }

    pub fn touch(id: u64, position: Point, time: Instant) -> Self {
        Self {
            id: PointerId(id),
            kind: PointerKind::Touch,
            ..Self::mouse(position, time)
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    pub fn of(self, b: &BBox) -> Point {
        b.corners()[self as usize]
    }

    pub fn opposite(self) -> Corner {
        Corner::ALL[(self as usize + 2) % 4]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectDrag {
    Move {
        id: StrokeId,
        start: Point,
        start_points: Vec<Point>,
        was_selected: bool,
    },
    Resize {
        id: StrokeId,
        corner: Corner,
        fixed: Point,
        start: Point,
        start_points: Vec<Point>,
        start_scale: Option<f32>,
        start_bbox: BBox,
    },
    GroupMove {
        start: Point,
        start_points: Vec<(StrokeId, Vec<Point>)>,
    },
    Box {
        start: Point,
        end: Point,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    None,
    Single(StrokeId),
    Group(Vec<StrokeId>),
}

impl Selection {
    pub fn from_ids(ids: Vec<StrokeId>) -> Self {
        match ids.len() {
            0 => Selection::None,
            1 => Selection::Single(ids[0]),
            _ => Selection::Group(ids),
        }
    }

    pub fn ids(&self) -> Vec<StrokeId> {
        match self {
            Selection::None => Vec::new(),
            Selection::Single(id) => vec![*id],
            Selection::Group(ids) => ids.clone(),
        }
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        match self {
            Selection::None => false,
            Selection::Single(s) => *s == id,
            Selection::Group(ids) => ids.contains(&id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextTarget {
    New,
    Existing { id: StrokeId, original: String },
}

/// Live text buffer; the stroke list is untouched until commit.
#[derive(Debug, Clone)]
pub struct TextSession {
    pub editor: TextEditor,
    pub anchor: Point,
    pub target: TextTarget,
    pub style: TextStyle,
    pub align: TextAlign,
    pub color: String,
    pub caret_visible: bool,
    pub blink_from: Instant,
}

impl TextSession {
    pub fn editing(&self) -> Option<StrokeId> {
        match &self.target {
            TextTarget::Existing { id, .. } => Some(*id),
            TextTarget::New => None,
        }
    }
}

/// The one in-flight interaction. Only one can be active.
#[derive(Debug, Clone, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Drawing {
        mode: Mode,
        id: StrokeId,
        pointer: PointerId,
    },
    Erasing {
        pending: Vec<StrokeId>,
        pointer: PointerId,
    },
    Lasering {
        pointer: PointerId,
    },
    Panning {
        pointer: PointerId,
        start_screen: Point,
        start_view: Viewport,
    },
    Selecting {
        pointer: PointerId,
        drag: SelectDrag,
    },
    Pinching(Pinch),
    WritingText(Box<TextSession>),
}

impl Interaction {
    pub fn name(&self) -> &'static str {
        match self {
            Interaction::Idle => "idle",
            Interaction::Drawing { .. } => "drawing",
            Interaction::Erasing { .. } => "erasing",
            Interaction::Lasering { .. } => "laser",
            Interaction::Panning { .. } => "panning",
            Interaction::Selecting { .. } => "selecting",
            Interaction::Pinching(_) => "pinching",
            Interaction::WritingText(_) => "writing-text",
        }
    }

    pub fn pointer(&self) -> Option<PointerId> {
        match self {
            Interaction::Drawing { pointer, .. }
            | Interaction::Erasing { pointer, .. }
            | Interaction::Lasering { pointer }
            | Interaction::Panning { pointer, .. }
            | Interaction::Selecting { pointer, .. } => Some(*pointer),
            _ => None,
        }
    }

    pub fn text_session(&self) -> Option<&TextSession> {
        match self {
            Interaction::WritingText(session) => Some(session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(modifiers: ModifiersState) -> HeldKeys {
        HeldKeys {
            modifiers,
            ..HeldKeys::default()
        }
    }

    #[test]
    fn priority_order() {
        let all = HeldKeys {
            space: true,
            laser: true,
            highlight: true,
            dashed: true,
            shape: Some(ShapeKind::Star),
            modifiers: ModifiersState::CONTROL | ModifiersState::ALT | ModifiersState::SHIFT,
        };
        let pen = Tool::Pen;
        let rect = ShapeKind::Rectangle;
        assert_eq!(all.resolve(pen, rect), Mode::Pan);
        let k = HeldKeys { space: false, ..all };
        assert_eq!(k.resolve(pen, rect), Mode::Laser);
        let k = HeldKeys { laser: false, ..k };
        assert_eq!(k.resolve(pen, rect), Mode::Highlight);
        let k = HeldKeys { highlight: false, ..k };
        assert_eq!(k.resolve(pen, rect), Mode::Shape(ShapeKind::Star));
        let k = HeldKeys { shape: None, ..k };
        assert_eq!(k.resolve(pen, rect), Mode::Shape(rect));
        let k = HeldKeys { modifiers: ModifiersState::ALT | ModifiersState::SHIFT, ..k };
        assert_eq!(k.resolve(pen, rect), Mode::Erase);
        let k = HeldKeys { modifiers: ModifiersState::SHIFT, ..k };
        assert_eq!(k.resolve(pen, rect), Mode::Line);
        let k = HeldKeys { modifiers: ModifiersState::empty(), ..k };
        assert_eq!(k.resolve(pen, rect), Mode::Freehand { dashed: true });
        assert_eq!(HeldKeys::default().resolve(pen, rect), Mode::Freehand { dashed: false });
    }

    #[test]
    fn select_and_text_tools_ignore_drawing_modifiers() {
        let shift = held(ModifiersState::SHIFT);
        assert_eq!(shift.resolve(Tool::Select, ShapeKind::Circle), Mode::Select);
        assert_eq!(shift.resolve(Tool::Text, ShapeKind::Circle), Mode::Text);
        let space = HeldKeys { space: true, ..shift };
        assert_eq!(space.resolve(Tool::Select, ShapeKind::Circle), Mode::Pan);
    }

    #[test]
    fn corners_pair_up() {
        let b = BBox::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(Corner::TopLeft.opposite(), Corner::BottomRight);
        assert_eq!(Corner::BottomRight.of(&b), Point::new(10.0, 20.0));
        assert_eq!(Corner::TopRight.opposite().of(&b), Point::new(0.0, 20.0));
    }

    #[test]
    fn selection_from_ids() {
        assert!(Selection::from_ids(vec![]).is_empty());
        let a = StrokeId::new();
        assert_eq!(Selection::from_ids(vec![a]), Selection::Single(a));
        assert!(matches!(Selection::from_ids(vec![a, StrokeId::new()]), Selection::Group(_)));
    }
}
