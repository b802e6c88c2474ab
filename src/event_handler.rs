use rand::Rng;
use std::time::Instant;
use winit::event::MouseScrollDelta;
use winit::keyboard::{Key, ModifiersState, NamedKey};

use crate::app_state::Engine;
use crate::canvas::CanvasIndex;
use crate::drawing::{ShapeKind, Stroke, StrokeId, TEXT_HIT_PADDING};
use crate::events::{Command, EngineEvent};
use crate::geometry::{BBox, Point, TextLayout, caret_pos_from_click};
use crate::gestures::{Pinch, TapGesture, TapWindow};
use crate::history::UndoAction;
use crate::state::{
    HeldKeys, Interaction, Mode, PointerButton, PointerInput, PointerKind, Selection, TextSession,
    TextTarget,
};
use crate::text_input::TextEditor;

const LINE_SCROLL_PX: f32 = 40.0;
const WHEEL_ZOOM_RATE: f32 = 0.002;
pub const ZOOM_STEP: f32 = 1.2;

/// Letter held to draw a specific shape.
fn keyed_shape(key: &str) -> Option<ShapeKind> {
    Some(match key {
        "r" => ShapeKind::Rectangle,
        "o" => ShapeKind::Circle,
        "t" => ShapeKind::Triangle,
        "s" => ShapeKind::Star,
        "a" => ShapeKind::Arrow,
        "p" => ShapeKind::Pentagon,
        "x" => ShapeKind::Hexagon,
        "g" => ShapeKind::Diamond,
        "z" => ShapeKind::Lightning,
        _ => return None,
    })
}

fn pressure_width(line_width: f32, pressure: f32) -> f32 {
    line_width * (0.4 + pressure.clamp(0.0, 1.0) * 1.2)
}

impl Engine {
    pub fn pointer_down(&mut self, input: PointerInput) {
        self.cursor = input.position;
        self.animation = None;
        let world = self.to_world(input.position);

        if input.kind == PointerKind::Touch {
            self.touch_down(input, world);
            return;
        }
        if input.button == PointerButton::Secondary || self.held_pointer.is_some() {
            return;
        }

        if let Interaction::WritingText(_) = &self.interaction {
            if self.place_caret(world, self.keys.modifiers.shift_key()) {
                self.request_redraw();
                return;
            }
            self.end_interaction();
        }

        self.held_pointer = Some(input);
        let mode = if input.button == PointerButton::Middle {
            Mode::Pan
        } else {
            self.mode()
        };
        self.begin(mode, input, world);
    }

    pub fn pointer_move(&mut self, input: PointerInput) {
        self.cursor = input.position;
        let world = self.to_world(input.position);

        if input.kind == PointerKind::Touch {
            self.touch_move(input, world);
            return;
        }
        if self.held_pointer.is_none_or(|held| held.id != input.id) {
            return;
        }
        self.held_pointer = Some(PointerInput {
            button: self.held_pointer.map(|h| h.button).unwrap_or_default(),
            ..input
        });
        if self.switch_mode_if_needed(input, world) {
            return;
        }
        self.drag_to(input, world);
    }

    pub fn pointer_up(&mut self, input: PointerInput) {
        self.cursor = input.position;
        let world = self.to_world(input.position);

        if input.kind == PointerKind::Touch {
            self.touch_up(input, world);
            return;
        }
        if self.held_pointer.is_none_or(|held| held.id != input.id) {
            return;
        }
        self.held_pointer = None;
        self.release(world);
    }

    /// The host lost the pointer (capture lost, gesture taken by the system).
    pub fn pointer_cancel(&mut self, input: PointerInput) {
        if input.kind == PointerKind::Touch {
            self.touches.up(input.id);
            self.tap = None;
        } else {
            self.held_pointer = None;
        }
        if self.interaction.pointer() == Some(input.id) || matches!(self.interaction, Interaction::Pinching(_)) {
            self.abort_interaction();
        }
    }

    /// Window focus lost: release every held key and finish the gesture.
    pub fn blur(&mut self) {
        self.keys = HeldKeys::default();
        self.held_pointer = None;
        self.touches.clear();
        self.tap = None;
        if !matches!(self.interaction, Interaction::WritingText(_)) {
            self.end_interaction();
        }
    }

    pub fn modifiers_changed(&mut self, modifiers: ModifiersState) {
        self.keys.modifiers = modifiers;
        self.reconcile_mode();
    }

    pub fn wheel(&mut self, delta: MouseScrollDelta, position: Point) {
        let (dx, dy) = match delta {
            MouseScrollDelta::LineDelta(x, y) => (x * LINE_SCROLL_PX, y * LINE_SCROLL_PX),
            MouseScrollDelta::PixelDelta(p) => (p.x as f32, p.y as f32),
        };
        self.animation = None;
        let mut view = self.session.view;
        if self.keys.command() {
            view.zoom_at(position, (dy * WHEEL_ZOOM_RATE).exp());
        } else if self.keys.modifiers.shift_key() {
            view.pan_by(dy, dx);
        } else {
            view.pan_by(dx, dy);
        }
        self.set_view(view);
        self.save_view();
    }

    pub fn key_down(&mut self, key: &Key, modifiers: ModifiersState, now: Instant) {
        self.keys.modifiers = modifiers;
        if matches!(self.interaction, Interaction::WritingText(_)) {
            self.text_key(key, now);
            return;
        }

        let command = self.keys.command();
        let shift = modifiers.shift_key();
        match key {
            Key::Named(NamedKey::Space) => self.keys.space = true,
            Key::Named(NamedKey::Escape) => self.escape(),
            Key::Named(NamedKey::Backspace) if command => self.dispatch(Command::RequestClear),
            Key::Named(NamedKey::Delete | NamedKey::Backspace) => self.delete_selection(),
            Key::Named(NamedKey::Enter) => {
                if let Selection::Single(id) = self.selection {
                    if self.session.find(id).is_some_and(|s| s.is_text()) {
                        self.edit_text(id, None, now);
                    }
                }
            }
            Key::Character(c) => {
                let c = c.to_lowercase();
                if command {
                    let cursor = self.to_world(self.cursor);
                    match c.as_str() {
                        "z" if shift => self.dispatch(Command::Redo),
                        "z" => self.dispatch(Command::Undo),
                        "y" => self.dispatch(Command::Redo),
                        "c" => self.dispatch(Command::Copy),
                        "x" => self.dispatch(Command::Cut),
                        "v" => self.dispatch(Command::Paste { at: cursor }),
                        "a" => self.dispatch(Command::SelectAll),
                        "=" | "+" => self.dispatch(Command::ZoomIn),
                        "-" => self.dispatch(Command::ZoomOut),
                        "e" => self.dispatch(Command::RequestExport { transparent: shift }),
                        _ => {}
                    }
                } else if let Some(kind) = keyed_shape(&c) {
                    self.keys.shape = Some(kind);
                } else {
                    match c.as_str() {
                        "l" => self.keys.laser = true,
                        "h" => self.keys.highlight = true,
                        "d" => self.keys.dashed = true,
                        "0" => self.dispatch(Command::ResetView),
                        "f" => self.dispatch(Command::FitToContent),
                        "]" => self.dispatch(Command::BringToFront),
                        "[" => self.dispatch(Command::SendToBack),
                        digit => {
                            if let Some(index) = digit.parse::<u8>().ok().and_then(CanvasIndex::new) {
                                self.dispatch(Command::SwitchCanvas(index));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        self.reconcile_mode();
    }

    pub fn key_up(&mut self, key: &Key, modifiers: ModifiersState) {
        self.keys.modifiers = modifiers;
        match key {
            Key::Named(NamedKey::Space) => self.keys.space = false,
            Key::Character(c) => {
                let c = c.to_lowercase();
                match c.as_str() {
                    "l" => self.keys.laser = false,
                    "h" => self.keys.highlight = false,
                    "d" => self.keys.dashed = false,
                    other => {
                        if keyed_shape(other).is_some() && self.keys.shape == keyed_shape(other) {
                            self.keys.shape = None;
                        }
                    }
                }
            }
            _ => {}
        }
        if !matches!(self.interaction, Interaction::WritingText(_)) {
            self.reconcile_mode();
        }
    }

    /// Committed IME text.
    pub fn text_input(&mut self, text: &str, now: Instant) {
        if let Interaction::WritingText(session) = &mut self.interaction {
            session.editor.insert(text);
            session.caret_visible = true;
            session.blink_from = now;
            self.request_redraw();
        }
    }

    /// System clipboard text: inserted into the buffer while writing,
    /// otherwise placed as a new text stroke at the cursor.
    pub fn paste_text(&mut self, text: &str, now: Instant) {
        if matches!(self.interaction, Interaction::WritingText(_)) {
            self.text_input(text, now);
            return;
        }
        let text = text.replace("\r\n", "\n");
        if text.trim().is_empty() {
            return;
        }
        let at = self.to_world(self.cursor);
        let mut stroke = Stroke::text(
            at,
            &text,
            &self.settings.color,
            &self.settings.text_style(),
            self.settings.text_align,
        );
        stroke.id = StrokeId::new();
        let id = self.session.add_stroke(stroke.clone());
        self.session.record(UndoAction::Draw { stroke });
        self.set_selection(Selection::Single(id));
        self.strokes_changed();
    }

    pub fn dispatch(&mut self, command: Command) {
        log::debug!("command {command:?}");
        let now = Instant::now();
        match command {
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::SetTool(tool) => {
                self.end_interaction();
                self.tool = tool;
                self.request_redraw();
            }
            Command::UpdateSettings(settings) => self.apply_settings(settings),
            Command::SwitchCanvas(index) => self.switch_canvas(index),
            Command::RequestClear => {
                if !self.session.strokes.is_empty() {
                    self.emit(EngineEvent::ClearRequested);
                }
            }
            Command::ConfirmClear => self.clear_canvas(),
            Command::ResetView => self.reset_view(now),
            Command::FitToContent => self.fit_to_content(now),
            Command::ZoomIn => self.zoom_step(ZOOM_STEP),
            Command::ZoomOut => self.zoom_step(1.0 / ZOOM_STEP),
            Command::Copy => self.copy_selection(),
            Command::Cut => self.cut_selection(),
            Command::Paste { at } => self.paste(at),
            Command::SelectAll => self.select_all(),
            Command::DeleteSelection => self.delete_selection(),
            Command::BringToFront => self.bring_to_front(),
            Command::SendToBack => self.send_to_back(),
            Command::SetColor(color) => self.set_color(color),
            Command::SetFont(family) => self.set_font(family),
            Command::SetFontSize(size) => self.set_font_size(size),
            Command::SetBold(bold) => self.set_bold(bold),
            Command::SetItalic(italic) => self.set_italic(italic),
            Command::SetAlign(align) => self.set_align(align),
            Command::RequestExport { transparent } => {
                self.emit(EngineEvent::ExportRequested { transparent })
            }
            Command::Import(strokes) => self.import_strokes(strokes),
        }
    }

    fn undo(&mut self) {
        self.end_interaction();
        if let Some(action) = self.session.undo() {
            log::debug!("undid {}", action.kind_name());
            self.prune_selection();
            self.strokes_changed();
        }
    }

    fn redo(&mut self) {
        self.end_interaction();
        if let Some(action) = self.session.redo() {
            log::debug!("redid {}", action.kind_name());
            self.prune_selection();
            self.strokes_changed();
        }
    }

    fn escape(&mut self) {
        match &self.interaction {
            Interaction::Erasing { .. } => self.cancel_erase(),
            Interaction::Idle => {}
            _ => self.end_interaction(),
        }
        self.set_selection(Selection::None);
    }

    /// Starts the interaction for `mode` at `world`.
    pub(crate) fn begin(&mut self, mode: Mode, input: PointerInput, world: Point) {
        let pointer = input.id;
        log::debug!("begin {mode:?}");
        match mode {
            Mode::Pan => {
                self.interaction = Interaction::Panning {
                    pointer,
                    start_screen: input.position,
                    start_view: self.session.view,
                };
            }
            Mode::Erase => {
                self.erase_trail.clear();
                self.erase_trail.push(world, input.time);
                self.interaction = Interaction::Erasing {
                    pending: Vec::new(),
                    pointer,
                };
                self.erase_at(world);
            }
            Mode::Laser => {
                self.laser_trail.push(world, input.time);
                self.interaction = Interaction::Lasering { pointer };
            }
            Mode::Text => self.start_text_at(world, input.time),
            Mode::Select => self.select_down(pointer, world),
            Mode::Freehand { .. } | Mode::Line | Mode::Shape(_) | Mode::Highlight => {
                self.start_stroke(mode, input, world)
            }
        }
        self.request_redraw();
    }

    fn start_stroke(&mut self, mode: Mode, input: PointerInput, world: Point) {
        self.set_selection(Selection::None);
        let settings = &self.settings;
        let (color, width) = (settings.color.as_str(), settings.line_width);
        let dashed_line = self.keys.dashed || self.tool == crate::state::Tool::DashedPen;
        let mut stroke = match mode {
            Mode::Freehand { dashed } => {
                let mut s = Stroke::freehand(vec![world], color, width);
                if dashed {
                    s = s.with_dashes(settings.dash_gap);
                }
                if input.kind == PointerKind::Pen && settings.pressure_sensitivity {
                    s = s.with_widths(vec![pressure_width(width, input.pressure)]);
                }
                s
            }
            Mode::Highlight => Stroke::freehand(vec![world], color, width).highlighted(),
            Mode::Line => {
                let s = Stroke::shape(ShapeKind::Line, world, world, color, width);
                if dashed_line { s.with_dashes(settings.dash_gap) } else { s }
            }
            Mode::Shape(kind) => {
                let mut s = Stroke::shape(kind, world, world, color, width).filled(settings.fill);
                if settings.sketchy {
                    s = s.with_seed(rand::rng().random());
                }
                s
            }
            _ => return,
        };
        stroke.id = StrokeId::new();
        let id = self.session.add_stroke(stroke.clone());
        self.session.record(UndoAction::Draw { stroke });
        self.interaction = Interaction::Drawing {
            mode,
            id,
            pointer: input.id,
        };
        let color = self.settings.color.clone();
        self.emit(EngineEvent::ColorUsed(color));
        self.history_changed();
    }

    /// Continues whatever the held pointer is doing.
    fn drag_to(&mut self, input: PointerInput, world: Point) {
        match &mut self.interaction {
            Interaction::Drawing { mode, id, .. } => {
                let (mode, id) = (*mode, *id);
                let pressure = (input.kind == PointerKind::Pen && self.settings.pressure_sensitivity)
                    .then(|| pressure_width(self.settings.line_width, input.pressure));
                if let Some(stroke) = self.session.find_mut(id) {
                    match mode {
                        Mode::Line | Mode::Shape(_) => {
                            if let Some(end) = stroke.points.get_mut(1) {
                                *end = world;
                            }
                        }
                        _ => {
                            if stroke.points.last() != Some(&world) {
                                stroke.points.push(world);
                                if let (Some(widths), Some(w)) = (stroke.widths.as_mut(), pressure) {
                                    widths.push(w);
                                }
                            }
                        }
                    }
                }
                self.save.schedule(input.time);
            }
            Interaction::Erasing { .. } => {
                self.erase_trail.push(world, input.time);
                self.erase_at(world);
            }
            Interaction::Lasering { .. } => self.laser_trail.push(world, input.time),
            Interaction::Panning {
                start_screen,
                start_view,
                ..
            } => {
                let mut view = *start_view;
                view.pan_by(input.position.x - start_screen.x, input.position.y - start_screen.y);
                self.set_view(view);
            }
            Interaction::Selecting { .. } => self.select_drag(world),
            Interaction::Idle | Interaction::Pinching(_) | Interaction::WritingText(_) => return,
        }
        self.request_redraw();
    }

    /// Pointer released at `world`.
    fn release(&mut self, world: Point) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Selecting { drag, .. } => self.finish_select_drag(drag, Some(world)),
            Interaction::WritingText(session) => self.interaction = Interaction::WritingText(session),
            other => {
                self.interaction = other;
                self.end_interaction();
            }
        }
        self.request_redraw();
    }

    /// Commits whatever is in progress: the stroke being drawn, pending
    /// erasures, a selection drag, the text buffer.
    pub(crate) fn end_interaction(&mut self) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Idle | Interaction::Lasering { .. } => {}
            Interaction::Drawing { mode, id, .. } => self.commit_stroke(mode, id),
            Interaction::Erasing { pending, .. } => self.apply_erase(&pending),
            Interaction::Panning { .. } | Interaction::Pinching(_) => self.save_view(),
            Interaction::Selecting { drag, .. } => self.finish_select_drag(drag, None),
            Interaction::WritingText(session) => self.commit_text(*session),
        }
        self.request_redraw();
    }

    /// Drops whatever is in progress without recording it.
    pub(crate) fn abort_interaction(&mut self) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Drawing { id, .. } => {
                if let Some(pos) = self.session.position(id) {
                    self.session.strokes.remove(pos);
                }
                self.session.history.discard_draw(id);
                self.history_changed();
            }
            Interaction::Erasing { .. } => self.erase_trail.clear(),
            Interaction::Selecting { drag, .. } => self.revert_select_drag(drag),
            Interaction::Panning { .. } | Interaction::Pinching(_) => self.save_view(),
            Interaction::WritingText(session) => self.commit_text(*session),
            Interaction::Idle | Interaction::Lasering { .. } => {}
        }
        self.request_redraw();
    }

    /// Shapes and lines smaller than the minimum in both axes are dropped
    /// along with their `draw` record.
    fn commit_stroke(&mut self, mode: Mode, id: StrokeId) {
        let Some(stroke) = self.session.find(id) else {
            return;
        };
        if matches!(mode, Mode::Line | Mode::Shape(_)) {
            let b = BBox::from_points(&stroke.points).unwrap_or_default();
            let min = self.config.min_shape_size;
            if b.w < min && b.h < min {
                log::debug!("discarding {:.1}x{:.1} shape", b.w, b.h);
                if let Some(pos) = self.session.position(id) {
                    self.session.strokes.remove(pos);
                }
                self.session.history.discard_draw(id);
                self.history_changed();
                self.renderer.invalidate_strokes();
                return;
            }
        }
        self.strokes_changed();
    }

    fn erase_at(&mut self, world: Point) {
        let radius = self.config.erase_radius_px / self.session.view.scale;
        let Interaction::Erasing { pending, .. } = &mut self.interaction else {
            return;
        };
        for stroke in &self.session.strokes {
            if !pending.contains(&stroke.id) && stroke.hit_test(world, radius, &self.renderer.fonts) {
                pending.push(stroke.id);
            }
        }
    }

    fn apply_erase(&mut self, pending: &[StrokeId]) {
        if let Some(action) = self.session.remove_strokes(pending) {
            log::debug!("erased {} strokes", pending.len());
            self.session.record(action);
            self.prune_selection();
            self.strokes_changed();
        }
    }

    fn cancel_erase(&mut self) {
        if let Interaction::Erasing { pending, .. } = std::mem::take(&mut self.interaction) {
            log::debug!("erase cancelled, {} strokes kept", pending.len());
        }
        self.erase_trail.clear();
        self.request_redraw();
    }

    /// Re-resolves the mode after a key change while the pointer is held. A
    /// different mode commits the current stroke and starts the new one at
    /// the cursor.
    fn reconcile_mode(&mut self) {
        let Some(input) = self.held_pointer else {
            return;
        };
        if input.button == PointerButton::Middle {
            return;
        }
        let input = PointerInput {
            position: self.cursor,
            ..input
        };
        let world = self.to_world(self.cursor);
        self.switch_mode_if_needed(input, world);
    }

    fn switch_mode_if_needed(&mut self, input: PointerInput, world: Point) -> bool {
        let current = match &self.interaction {
            Interaction::Drawing { mode, .. } => *mode,
            Interaction::Erasing { .. } => Mode::Erase,
            Interaction::Lasering { .. } => Mode::Laser,
            Interaction::Panning { .. } if input.button != PointerButton::Middle => Mode::Pan,
            _ => return false,
        };
        let target = self.mode();
        if target == current {
            return false;
        }
        log::debug!("mode {current:?} -> {target:?}");
        self.end_interaction();
        if !matches!(target, Mode::Text | Mode::Select) {
            self.begin(target, input, world);
        }
        true
    }

    fn touch_down(&mut self, input: PointerInput, world: Point) {
        self.touches.down(input.id, input.position);
        match self.touches.count() {
            1 => {
                let mut tap = TapWindow::new(input.time, self.config.tap_window(), self.config.tap_slop_px);
                tap.add(input.id, input.position);
                self.tap = Some(tap);
                if let Interaction::WritingText(_) = &self.interaction {
                    if self.place_caret(world, false) {
                        self.request_redraw();
                        return;
                    }
                    self.end_interaction();
                }
                if matches!(self.interaction, Interaction::Idle) {
                    let mode = HeldKeys::default().resolve(self.tool, self.settings.shape);
                    self.begin(mode, input, world);
                }
            }
            2 => {
                if let Some(tap) = &mut self.tap {
                    tap.add(input.id, input.position);
                }
                self.abort_interaction();
                if let Some((a, b)) = self.touches.first_two() {
                    self.interaction = Interaction::Pinching(Pinch::begin(a, b, self.session.view));
                }
            }
            _ => {
                if let Some(tap) = &mut self.tap {
                    tap.add(input.id, input.position);
                }
            }
        }
    }

    fn touch_move(&mut self, input: PointerInput, world: Point) {
        if !self.touches.contains(input.id) {
            return;
        }
        self.touches.moved(input.id, input.position);
        if let Some(tap) = &mut self.tap {
            tap.moved(input.id, input.position);
        }
        match &self.interaction {
            Interaction::Pinching(pinch) => {
                if let Some((a, b)) = self.touches.first_two() {
                    let view = pinch.update(a, b);
                    self.set_view(view);
                }
            }
            other if other.pointer() == Some(input.id) => self.drag_to(input, world),
            _ => {}
        }
    }

    fn touch_up(&mut self, input: PointerInput, world: Point) {
        if self.touches.up(input.id).is_none() {
            return;
        }
        let gesture = self.tap.as_mut().and_then(|tap| tap.lift(input.id, input.time));
        if self.touches.count() == 0 {
            self.tap = None;
        }

        if matches!(self.interaction, Interaction::Pinching(_)) {
            if self.touches.count() < 2 {
                self.end_interaction();
            }
        } else if self.interaction.pointer() == Some(input.id) {
            self.release(world);
        }

        match gesture {
            Some(TapGesture::TwoFinger) => self.dispatch(Command::Undo),
            Some(TapGesture::ThreeFinger) => self.dispatch(Command::Redo),
            None => {}
        }
    }

    fn start_text_at(&mut self, world: Point, now: Instant) {
        let fonts = &self.renderer.fonts;
        let hit = self.session.strokes.iter().rev().find(|s| {
            s.text_layout()
                .is_some_and(|l| l.bbox(fonts).padded(TEXT_HIT_PADDING).contains(world))
        });
        if let Some(id) = hit.map(|s| s.id) {
            self.edit_text(id, Some(world), now);
            return;
        }
        self.set_selection(Selection::None);
        self.interaction = Interaction::WritingText(Box::new(TextSession {
            editor: TextEditor::new("", self.config.text_history_depth),
            anchor: world,
            target: TextTarget::New,
            style: self.settings.text_style(),
            align: self.settings.text_align,
            color: self.settings.color.clone(),
            caret_visible: true,
            blink_from: now,
        }));
    }

    /// Opens an existing text stroke in the editor, caret at `click` or at
    /// the end.
    pub(crate) fn edit_text(&mut self, id: StrokeId, click: Option<Point>, now: Instant) {
        let Some(stroke) = self.session.find(id) else {
            return;
        };
        let Some(layout) = stroke.text_layout() else {
            return;
        };
        let mut editor = TextEditor::new(layout.text, self.config.text_history_depth);
        if let Some(click) = click {
            editor.set_caret(caret_pos_from_click(&layout, click, &self.renderer.fonts), false);
        }
        let session = TextSession {
            editor,
            anchor: stroke.anchor(),
            target: TextTarget::Existing {
                id,
                original: layout.text.to_string(),
            },
            style: stroke.text_style(),
            align: stroke.align(),
            color: stroke.color.clone(),
            caret_visible: true,
            blink_from: now,
        };
        self.set_selection(Selection::None);
        self.interaction = Interaction::WritingText(Box::new(session));
        self.request_redraw();
    }

    /// Moves the caret when `world` falls inside the text being written.
    fn place_caret(&mut self, world: Point, extend: bool) -> bool {
        let Interaction::WritingText(session) = &mut self.interaction else {
            return false;
        };
        let layout = TextLayout {
            anchor: session.anchor,
            text: session.editor.text(),
            align: session.align,
            style: session.style,
        };
        if !layout.bbox(&self.renderer.fonts).padded(TEXT_HIT_PADDING).contains(world) {
            return false;
        }
        let pos = caret_pos_from_click(&layout, world, &self.renderer.fonts);
        session.editor.set_caret(pos, extend);
        session.caret_visible = true;
        true
    }

    fn commit_text(&mut self, session: TextSession) {
        let text = session.editor.text().to_string();
        match session.target {
            TextTarget::Existing { id, original } => {
                if text.trim().is_empty() {
                    if let Some(action) = self.session.remove_strokes(&[id]) {
                        self.session.record(action);
                        self.strokes_changed();
                    }
                    self.set_selection(Selection::None);
                } else {
                    if text != original {
                        if let Some(stroke) = self.session.find_mut(id) {
                            stroke.text = Some(text.clone());
                        }
                        self.session.record(UndoAction::Edit {
                            id,
                            before: original,
                            after: text,
                        });
                        self.strokes_changed();
                    }
                    self.set_selection(Selection::Single(id));
                }
            }
            TextTarget::New => {
                if text.trim().is_empty() {
                    return;
                }
                let mut stroke = Stroke::text(session.anchor, &text, &session.color, &session.style, session.align);
                stroke.id = StrokeId::new();
                let id = self.session.add_stroke(stroke.clone());
                self.session.record(UndoAction::Draw { stroke });
                self.emit(EngineEvent::ColorUsed(session.color));
                self.set_selection(Selection::Single(id));
                self.strokes_changed();
            }
        }
        self.renderer.invalidate_strokes();
    }

    fn text_key(&mut self, key: &Key, now: Instant) {
        let modifiers = self.keys.modifiers;
        let command = self.keys.command();
        let (shift, word) = (modifiers.shift_key(), modifiers.alt_key() || command);
        let Interaction::WritingText(session) = &mut self.interaction else {
            return;
        };
        let editor = &mut session.editor;
        match key {
            Key::Named(NamedKey::Escape) => {
                self.end_interaction();
                return;
            }
            Key::Named(NamedKey::Enter) => editor.newline(),
            Key::Named(NamedKey::Backspace) => editor.backspace(word),
            Key::Named(NamedKey::Delete) => editor.delete(word),
            Key::Named(NamedKey::ArrowLeft) => editor.move_left(word, shift),
            Key::Named(NamedKey::ArrowRight) => editor.move_right(word, shift),
            Key::Named(NamedKey::ArrowUp) => editor.move_up(shift),
            Key::Named(NamedKey::ArrowDown) => editor.move_down(shift),
            Key::Named(NamedKey::Home) => editor.line_start(shift),
            Key::Named(NamedKey::End) => editor.line_end(shift),
            Key::Named(NamedKey::Space) => editor.insert(" "),
            Key::Character(c) if command => match c.to_lowercase().as_str() {
                "a" => editor.select_all(),
                "z" if shift => {
                    editor.redo();
                }
                "z" => {
                    editor.undo();
                }
                "y" => {
                    editor.redo();
                }
                _ => return,
            },
            Key::Character(c) => editor.insert(c),
            _ => return,
        }
        session.caret_visible = true;
        session.blink_from = now;
        self.request_redraw();
    }
}
