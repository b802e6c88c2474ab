//! Selection editing: picking, box select, move and resize drags, and the
//! commands that act on the selected strokes (attributes, z-order,
//! clipboard, delete).

use crate::app_state::Engine;
use crate::drawing::{
    FontFamily, FontSize, ShapeKind, Stroke, StrokeId, StrokeKind, TextAlign, combined_bbox,
    translated,
};
use crate::geometry::{BBox, Point};
use crate::history::{Attr, AttrChange, PointsChange, ResizeState, UndoAction};
use crate::state::{Corner, Interaction, PointerId, SelectDrag, Selection, TextTarget};

pub const MIN_FONT_SCALE: f32 = 0.2;
pub const MAX_FONT_SCALE: f32 = 10.0;
/// Padding around the combined box of a group selection, world units.
pub const GROUP_PADDING: f32 = 4.0;

fn resizable(stroke: &Stroke) -> bool {
    !matches!(stroke.kind(), StrokeKind::Freehand | StrokeKind::Dot)
}

/// Keeps `len` at least `min` long, in the direction of `toward`.
fn clamp_extent(len: f32, toward: f32, min: f32) -> f32 {
    if len.abs() >= min {
        len
    } else if toward < 0.0 {
        -min
    } else {
        min
    }
}

/// Points and font scale of `stroke` with the grabbed corner dragged to
/// `world`.
fn resized(stroke: &Stroke, drag: &SelectDrag, world: Point, min_size: f32) -> Option<ResizeState> {
    let SelectDrag::Resize {
        corner,
        fixed,
        start,
        start_points,
        start_scale,
        start_bbox,
        ..
    } = drag
    else {
        return None;
    };
    let grabbed = corner.of(start_bbox);

    match stroke.kind() {
        StrokeKind::Text => {
            let from = start.distance(*fixed);
            if from <= f32::EPSILON {
                return None;
            }
            let base = start_scale.unwrap_or(1.0);
            let scale = (base * world.distance(*fixed) / from).clamp(MIN_FONT_SCALE, MAX_FONT_SCALE);
            let k = scale / base;
            let (w, h) = (start_bbox.w * k, start_bbox.h * k);
            let x = if grabbed.x < fixed.x { fixed.x - w } else { fixed.x };
            let y = if grabbed.y < fixed.y { fixed.y - h } else { fixed.y };
            let anchor = Point::new(x + w * stroke.align().factor(), y);
            Some(ResizeState {
                points: vec![anchor],
                font_scale: Some(scale),
            })
        }
        StrokeKind::Shape(kind) if kind.is_directional() => {
            // Move whichever endpoint started nearest the grabbed corner.
            let mut points = start_points.clone();
            let nearest = if points[0].distance(grabbed) <= points[1].distance(grabbed) { 0 } else { 1 };
            points[nearest] = world;
            Some(ResizeState {
                points,
                font_scale: None,
            })
        }
        StrokeKind::Shape(_) => {
            let dx = clamp_extent(world.x - fixed.x, grabbed.x - fixed.x, min_size);
            let dy = clamp_extent(world.y - fixed.y, grabbed.y - fixed.y, min_size);
            Some(ResizeState {
                points: vec![*fixed, Point::new(fixed.x + dx, fixed.y + dy)],
                font_scale: None,
            })
        }
        StrokeKind::Freehand | StrokeKind::Dot => None,
    }
}

impl Engine {
    fn pick_tolerance(&self) -> f32 {
        self.config.select_tolerance_px / self.session.view.scale
    }

    /// Strokes under `world`, topmost first.
    pub fn strokes_at(&self, world: Point) -> Vec<StrokeId> {
        let tol = self.pick_tolerance();
        self.session
            .strokes
            .iter()
            .rev()
            .filter(|s| s.picks(world, tol, &self.renderer.fonts))
            .map(|s| s.id)
            .collect()
    }

    /// Combined box of the selected strokes.
    pub fn selection_bbox(&self) -> Option<BBox> {
        let ids = self.selection.ids();
        let members = self.session.strokes.iter().filter(|s| ids.contains(&s.id));
        let b = combined_bbox(members, &self.renderer.fonts)?;
        Some(match self.selection {
            Selection::Group(_) => b.padded(GROUP_PADDING),
            _ => b,
        })
    }

    /// Primary press with the select tool: resize handle, move, group move,
    /// a fresh pick, or a box select, in that order.
    pub(crate) fn select_down(&mut self, pointer: PointerId, world: Point) {
        let drag = self
            .grab_selection(world)
            .or_else(|| self.pick_for_move(world))
            .unwrap_or(SelectDrag::Box {
                start: world,
                end: world,
            });
        if matches!(drag, SelectDrag::Box { .. }) {
            self.set_selection(Selection::None);
        }
        self.interaction = Interaction::Selecting { pointer, drag };
    }

    fn grab_selection(&self, world: Point) -> Option<SelectDrag> {
        let fonts = &self.renderer.fonts;
        match &self.selection {
            Selection::None => None,
            Selection::Single(id) => {
                let stroke = self.session.find(*id)?;
                let b = stroke.bbox(fonts);
                if resizable(stroke) {
                    let r = self.config.handle_radius_px / self.session.view.scale;
                    if let Some(corner) = Corner::ALL.into_iter().find(|c| c.of(&b).distance(world) <= r) {
                        return Some(SelectDrag::Resize {
                            id: *id,
                            corner,
                            fixed: corner.opposite().of(&b),
                            start: world,
                            start_points: stroke.points.clone(),
                            start_scale: stroke.font_scale,
                            start_bbox: b,
                        });
                    }
                }
                b.padded(self.pick_tolerance()).contains(world).then(|| SelectDrag::Move {
                    id: *id,
                    start: world,
                    start_points: stroke.points.clone(),
                    was_selected: true,
                })
            }
            Selection::Group(ids) => {
                let b = self.selection_bbox()?;
                b.contains(world).then(|| SelectDrag::GroupMove {
                    start: world,
                    start_points: self
                        .session
                        .strokes
                        .iter()
                        .filter(|s| ids.contains(&s.id))
                        .map(|s| (s.id, s.points.clone()))
                        .collect(),
                })
            }
        }
    }

    fn pick_for_move(&mut self, world: Point) -> Option<SelectDrag> {
        let id = *self.strokes_at(world).first()?;
        let start_points = self.session.find(id)?.points.clone();
        self.set_selection(Selection::Single(id));
        Some(SelectDrag::Move {
            id,
            start: world,
            start_points,
            was_selected: false,
        })
    }

    pub(crate) fn select_drag(&mut self, world: Point) {
        let Interaction::Selecting { drag, .. } = &mut self.interaction else {
            return;
        };
        match drag {
            SelectDrag::Box { end, .. } => *end = world,
            SelectDrag::Move {
                id,
                start,
                start_points,
                ..
            } => {
                if let Some(stroke) = self.session.find_mut(*id) {
                    stroke.points = translated(start_points, world.x - start.x, world.y - start.y);
                }
            }
            SelectDrag::GroupMove { start, start_points } => {
                let (dx, dy) = (world.x - start.x, world.y - start.y);
                for (id, points) in start_points.iter() {
                    if let Some(stroke) = self.session.find_mut(*id) {
                        stroke.points = translated(points, dx, dy);
                    }
                }
                self.renderer.invalidate_strokes();
            }
            SelectDrag::Resize { id, .. } => {
                let id = *id;
                let min = self.config.min_shape_size;
                let Some(stroke) = self.session.find_mut(id) else {
                    return;
                };
                if let Some(state) = resized(stroke, drag, world, min) {
                    stroke.points = state.points;
                    stroke.font_scale = state.font_scale;
                }
            }
        }
    }

    /// Records the finished drag. `up` is the release point; `None` when the
    /// drag ends for another reason.
    pub(crate) fn finish_select_drag(&mut self, drag: SelectDrag, up: Option<Point>) {
        match drag {
            SelectDrag::Box { start, end } => {
                let contain_only = self.keys.modifiers.shift_key();
                self.box_select(BBox::from_corners(start, end), contain_only);
            }
            SelectDrag::Move {
                id,
                start_points,
                was_selected,
                ..
            } => {
                let Some(after) = self.session.find(id).map(|s| s.points.clone()) else {
                    return;
                };
                if after != start_points {
                    self.session.record(UndoAction::Move(PointsChange {
                        id,
                        before: start_points,
                        after,
                    }));
                    self.strokes_changed();
                } else if let (true, Some(at)) = (was_selected, up) {
                    self.cycle_selection(id, at);
                }
            }
            SelectDrag::GroupMove { start_points, .. } => {
                let changes: Vec<PointsChange> = start_points
                    .into_iter()
                    .filter_map(|(id, before)| {
                        let after = self.session.find(id)?.points.clone();
                        (after != before).then_some(PointsChange { id, before, after })
                    })
                    .collect();
                if !changes.is_empty() {
                    self.session.record(UndoAction::GroupMove(changes));
                    self.strokes_changed();
                }
            }
            SelectDrag::Resize {
                id,
                start_points,
                start_scale,
                ..
            } => {
                let Some(stroke) = self.session.find(id) else {
                    return;
                };
                let after = ResizeState {
                    points: stroke.points.clone(),
                    font_scale: stroke.font_scale,
                };
                let before = ResizeState {
                    points: start_points,
                    font_scale: start_scale,
                };
                if after != before {
                    self.session.record(UndoAction::Resize { id, before, after });
                    self.strokes_changed();
                }
            }
        }
        self.renderer.invalidate_strokes();
        self.request_redraw();
    }

    /// Puts dragged strokes back where the drag found them.
    pub(crate) fn revert_select_drag(&mut self, drag: SelectDrag) {
        match drag {
            SelectDrag::Move { id, start_points, .. } => {
                if let Some(stroke) = self.session.find_mut(id) {
                    stroke.points = start_points;
                }
            }
            SelectDrag::Resize {
                id,
                start_points,
                start_scale,
                ..
            } => {
                if let Some(stroke) = self.session.find_mut(id) {
                    stroke.points = start_points;
                    stroke.font_scale = start_scale;
                }
            }
            SelectDrag::GroupMove { start_points, .. } => {
                for (id, points) in start_points {
                    if let Some(stroke) = self.session.find_mut(id) {
                        stroke.points = points;
                    }
                }
            }
            SelectDrag::Box { .. } => {}
        }
        self.renderer.invalidate_strokes();
    }

    /// A click on the selected stroke without movement selects the next
    /// stroke under the pointer, wrapping around.
    fn cycle_selection(&mut self, current: StrokeId, at: Point) {
        let hits = self.strokes_at(at);
        if hits.len() < 2 {
            return;
        }
        let next = match hits.iter().position(|id| *id == current) {
            Some(i) => hits[(i + 1) % hits.len()],
            None => hits[0],
        };
        log::debug!("cycling selection through {} overlapping strokes", hits.len());
        self.set_selection(Selection::Single(next));
    }

    /// Selects strokes whose box intersects `rect`, or lies inside it when
    /// `contain_only` is set.
    pub fn box_select(&mut self, rect: BBox, contain_only: bool) {
        let fonts = &self.renderer.fonts;
        let ids: Vec<StrokeId> = self
            .session
            .strokes
            .iter()
            .filter(|s| {
                let b = s.bbox(fonts);
                if contain_only { rect.contains_box(&b) } else { rect.intersects(&b) }
            })
            .map(|s| s.id)
            .collect();
        self.set_selection(Selection::from_ids(ids));
    }

    pub(crate) fn select_all(&mut self) {
        if matches!(self.interaction, Interaction::WritingText(_)) {
            return;
        }
        self.end_interaction();
        let ids = self.session.order();
        self.set_selection(Selection::from_ids(ids));
    }

    pub(crate) fn delete_selection(&mut self) {
        let ids = self.selection.ids();
        if ids.is_empty() {
            return;
        }
        if let Some(action) = self.session.remove_strokes(&ids) {
            self.session.record(action);
        }
        self.set_selection(Selection::None);
        self.strokes_changed();
    }

    /// Removes every stroke as one undoable `erase`.
    pub(crate) fn clear_canvas(&mut self) {
        self.end_interaction();
        let ids = self.session.order();
        let Some(action) = self.session.remove_strokes(&ids) else {
            return;
        };
        log::info!("cleared canvas {} ({} strokes)", self.session.index, ids.len());
        self.session.record(action);
        self.set_selection(Selection::None);
        self.strokes_changed();
    }

    pub(crate) fn copy_selection(&mut self) {
        let ids = self.selection.ids();
        if ids.is_empty() {
            return;
        }
        self.clipboard = self
            .session
            .strokes
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect();
        log::debug!("copied {} strokes", self.clipboard.len());
    }

    pub(crate) fn cut_selection(&mut self) {
        self.copy_selection();
        self.delete_selection();
    }

    /// Pastes the clipboard centered on `at` (world coordinates) as fresh
    /// strokes under one `multi-draw`.
    pub(crate) fn paste(&mut self, at: Point) {
        let Some(b) = combined_bbox(&self.clipboard, &self.renderer.fonts) else {
            return;
        };
        self.end_interaction();
        let c = b.center();
        let (dx, dy) = (at.x - c.x, at.y - c.y);
        let pasted: Vec<Stroke> = self
            .clipboard
            .iter()
            .map(|s| {
                let mut copy = s.clone();
                copy.id = StrokeId::new();
                copy.translate(dx, dy);
                copy
            })
            .collect();
        let ids: Vec<StrokeId> = pasted.iter().map(|s| s.id).collect();
        self.session.strokes.extend(pasted.iter().cloned());
        self.session.record(UndoAction::MultiDraw { strokes: pasted });
        self.set_selection(Selection::from_ids(ids));
        self.strokes_changed();
    }

    pub(crate) fn bring_to_front(&mut self) {
        self.reorder_selection(true);
    }

    pub(crate) fn send_to_back(&mut self) {
        self.reorder_selection(false);
    }

    fn reorder_selection(&mut self, to_front: bool) {
        let ids = self.selection.ids();
        if ids.is_empty() {
            return;
        }
        let before = self.session.order();
        let (picked, rest): (Vec<Stroke>, Vec<Stroke>) = std::mem::take(&mut self.session.strokes)
            .into_iter()
            .partition(|s| ids.contains(&s.id));
        self.session.strokes = if to_front {
            rest.into_iter().chain(picked).collect()
        } else {
            picked.into_iter().chain(rest).collect()
        };
        let after = self.session.order();
        if after == before {
            return;
        }
        self.session.record(UndoAction::Reorder { before, after });
        self.strokes_changed();
    }

    /// Strokes an attribute command applies to: the text being edited, or
    /// the selection.
    fn attr_targets(&self) -> Vec<StrokeId> {
        match self.interaction.text_session().and_then(|t| t.editing()) {
            Some(id) => vec![id],
            None => self.selection.ids(),
        }
    }

    pub(crate) fn set_color(&mut self, color: String) {
        self.settings.color = color.clone();
        if let Interaction::WritingText(session) = &mut self.interaction {
            session.color = color.clone();
        }

        let after = Attr::Color(color);
        let mut changes = Vec::new();
        for id in self.attr_targets() {
            let Some(stroke) = self.session.find_mut(id) else {
                continue;
            };
            let before = after.read_like(stroke);
            if before == after {
                continue;
            }
            after.write(stroke);
            changes.push(AttrChange {
                id,
                before,
                after: after.clone(),
                anchor: None,
            });
        }
        let action = match changes.len() {
            0 => {
                self.request_redraw();
                return;
            }
            1 => UndoAction::ColorChange(changes.remove(0)),
            _ => UndoAction::GroupColorChange(changes),
        };
        self.session.record(action);
        self.strokes_changed();
    }

    pub(crate) fn set_font(&mut self, family: FontFamily) {
        self.settings.font_family = family;
        self.change_text_attr(Attr::Font(family), UndoAction::FontChange);
    }

    pub(crate) fn set_font_size(&mut self, size: FontSize) {
        self.settings.text_size = size;
        self.change_text_attr(Attr::FontSize(size), UndoAction::FontSizeChange);
    }

    pub(crate) fn set_bold(&mut self, bold: bool) {
        self.settings.bold = bold;
        self.change_text_attr(Attr::Bold(bold), UndoAction::BoldChange);
    }

    pub(crate) fn set_italic(&mut self, italic: bool) {
        self.settings.italic = italic;
        self.change_text_attr(Attr::Italic(italic), UndoAction::ItalicChange);
    }

    pub(crate) fn set_align(&mut self, align: TextAlign) {
        self.settings.text_align = align;
        self.change_text_attr(Attr::Align(align), UndoAction::AlignChange);
    }

    /// Applies a text attribute to the single targeted text stroke. Alignment
    /// moves the anchor so the box stays where it was.
    fn change_text_attr(&mut self, after: Attr, wrap: fn(AttrChange) -> UndoAction) {
        if let Interaction::WritingText(session) = &mut self.interaction {
            if session.target == TextTarget::New {
                session.style = self.settings.text_style();
                session.align = self.settings.text_align;
            }
        }

        let targets = self.attr_targets();
        let [id] = targets.as_slice() else {
            self.request_redraw();
            return;
        };
        let id = *id;
        let fonts = &self.renderer.fonts;
        let Some(stroke) = self.session.find_mut(id) else {
            return;
        };
        if !stroke.is_text() {
            return;
        }
        let before = after.read_like(stroke);
        if before == after {
            return;
        }
        let old_anchor = stroke.anchor();
        let old_box = stroke.bbox(fonts);
        after.write(stroke);
        let anchor = match after {
            Attr::Align(align) => {
                let new_anchor = Point::new(old_box.x + old_box.w * align.factor(), old_anchor.y);
                if let Some(first) = stroke.points.first_mut() {
                    *first = new_anchor;
                }
                Some((old_anchor, new_anchor))
            }
            _ => None,
        };
        let (style, align, new_anchor) = (stroke.text_style(), stroke.align(), stroke.anchor());

        if let Interaction::WritingText(session) = &mut self.interaction {
            if session.editing() == Some(id) {
                session.style = style;
                session.align = align;
                session.anchor = new_anchor;
            }
        }
        self.session.record(wrap(AttrChange {
            id,
            before,
            after,
            anchor,
        }));
        self.strokes_changed();
    }

    /// Shape kind of the single selected stroke, for the toolbar.
    pub fn selected_shape(&self) -> Option<ShapeKind> {
        match self.selection {
            Selection::Single(id) => self.session.find(id).and_then(|s| s.shape),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Command;
    use crate::persistence::CanvasStorage;
    use crate::settings::{EngineConfig, Settings};
    use crate::state::{PointerInput, Tool};
    use crate::text_renderer::FontBook;
    use std::time::Instant;

    fn engine_with(strokes: Vec<Stroke>) -> Engine {
        let mut e = Engine::with_storage(
            EngineConfig::default(),
            Settings::default(),
            CanvasStorage::in_memory(),
            FontBook::new(),
            800,
            600,
        );
        for s in strokes {
            e.session.add_stroke(s);
        }
        e.dispatch(Command::SetTool(Tool::Select));
        e
    }

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Stroke {
        Stroke::shape(ShapeKind::Rectangle, Point::new(x0, y0), Point::new(x1, y1), "#000000", 2.0)
    }

    fn click_drag(e: &mut Engine, from: Point, to: Point) {
        let t = Instant::now();
        let (a, b) = (e.view().world_to_screen(from), e.view().world_to_screen(to));
        e.pointer_down(PointerInput::mouse(a, t));
        e.pointer_move(PointerInput::mouse(b, t));
        e.pointer_up(PointerInput::mouse(b, t));
    }

    #[test]
    fn move_drag_records_one_move() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 50.0, 50.0)]);
        click_drag(&mut e, Point::new(25.0, 25.0), Point::new(35.0, 45.0));
        assert_eq!(e.strokes()[0].points, vec![Point::new(10.0, 20.0), Point::new(60.0, 70.0)]);
        assert_eq!(e.history().undo_stack().len(), 1);
        assert_eq!(e.history().undo_stack()[0].kind_name(), "move");
        e.dispatch(Command::Undo);
        assert_eq!(e.strokes()[0].points[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn corner_drag_resizes_shape_and_keeps_opposite_corner() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 50.0, 50.0)]);
        let id = e.strokes()[0].id;
        e.set_selection(Selection::Single(id));
        click_drag(&mut e, Point::new(50.0, 50.0), Point::new(80.0, 90.0));
        let b = BBox::from_points(&e.strokes()[0].points).unwrap();
        assert_eq!((b.x, b.y, b.w, b.h), (0.0, 0.0, 80.0, 90.0));
        assert_eq!(e.history().undo_stack()[0].kind_name(), "resize");

        // Dragging past the fixed corner still leaves the minimum size.
        click_drag(&mut e, Point::new(80.0, 90.0), Point::new(1.0, 1.0));
        let b = BBox::from_points(&e.strokes()[0].points).unwrap();
        assert!(b.w >= e.config().min_shape_size - 1e-4);
        assert!(b.h >= e.config().min_shape_size - 1e-4);
    }

    #[test]
    fn text_resize_scales_font() {
        let text = Stroke::text(
            Point::new(0.0, 0.0),
            "hello",
            "#000000",
            &Settings::default().text_style(),
            TextAlign::Left,
        );
        let mut e = engine_with(vec![text]);
        let id = e.strokes()[0].id;
        e.set_selection(Selection::Single(id));
        let b = e.strokes()[0].bbox(e.fonts());
        let corner = Point::new(b.right(), b.bottom());
        let doubled = Point::new(b.x + b.w * 2.0, b.y + b.h * 2.0);
        click_drag(&mut e, corner, doubled);
        let scale = e.strokes()[0].font_scale();
        assert!((scale - 2.0).abs() < 0.01, "scale {scale}");
        assert_eq!(e.strokes()[0].anchor(), Point::new(0.0, 0.0));
    }

    #[test]
    fn box_select_forms_group_and_group_move_is_one_record() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 20.0, 20.0), rect(30.0, 0.0, 50.0, 20.0)]);
        click_drag(&mut e, Point::new(-10.0, -10.0), Point::new(35.0, 5.0));
        assert_eq!(e.selection().len(), 2);

        click_drag(&mut e, Point::new(10.0, 10.0), Point::new(20.0, 10.0));
        assert_eq!(e.strokes()[0].points[0], Point::new(10.0, 0.0));
        assert_eq!(e.strokes()[1].points[0], Point::new(40.0, 0.0));
        assert_eq!(e.history().undo_stack().len(), 1);
        assert_eq!(e.history().undo_stack()[0].stroke_ids().len(), 2);
    }

    #[test]
    fn contain_only_box_select_with_shift() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 20.0, 20.0), rect(30.0, 0.0, 50.0, 20.0)]);
        e.modifiers_changed(winit::keyboard::ModifiersState::SHIFT);
        click_drag(&mut e, Point::new(-10.0, -10.0), Point::new(35.0, 25.0));
        assert_eq!(e.selection(), vec![e.strokes()[0].id]);
    }

    #[test]
    fn empty_box_clears_selection() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 20.0, 20.0)]);
        e.dispatch(Command::SelectAll);
        click_drag(&mut e, Point::new(100.0, 100.0), Point::new(120.0, 120.0));
        assert!(e.selection().is_empty());
    }

    #[test]
    fn reorder_and_color_are_undoable() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 20.0, 20.0), rect(30.0, 0.0, 50.0, 20.0)]);
        let first = e.strokes()[0].id;
        e.set_selection(Selection::Single(first));
        e.dispatch(Command::BringToFront);
        assert_eq!(e.strokes()[1].id, first);
        e.dispatch(Command::SetColor("#ff0000".into()));
        assert_eq!(e.strokes()[1].color, "#ff0000");
        e.dispatch(Command::Undo);
        assert_eq!(e.strokes()[1].color, "#000000");
        e.dispatch(Command::Undo);
        assert_eq!(e.strokes()[0].id, first);

        e.dispatch(Command::SelectAll);
        e.dispatch(Command::SetColor("#00ff00".into()));
        assert_eq!(e.history().undo_stack().last().unwrap().kind_name(), "group-color-change");
    }

    #[test]
    fn align_change_keeps_box_in_place() {
        let text = Stroke::text(
            Point::new(100.0, 0.0),
            "hello",
            "#000000",
            &Settings::default().text_style(),
            TextAlign::Left,
        );
        let mut e = engine_with(vec![text]);
        let id = e.strokes()[0].id;
        e.set_selection(Selection::Single(id));
        let before = e.strokes()[0].bbox(e.fonts());
        e.dispatch(Command::SetAlign(TextAlign::Right));
        let after = e.strokes()[0].bbox(e.fonts());
        assert!((before.x - after.x).abs() < 1e-3);
        assert!((e.strokes()[0].anchor().x - before.right()).abs() < 1e-3);
        e.dispatch(Command::Undo);
        assert_eq!(e.strokes()[0].anchor(), Point::new(100.0, 0.0));
        assert_eq!(e.strokes()[0].align(), TextAlign::Left);
    }

    #[test]
    fn font_size_change_needs_a_single_text_target() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 20.0, 20.0)]);
        e.dispatch(Command::SelectAll);
        e.dispatch(Command::SetFontSize(FontSize::Large));
        assert!(e.history().undo_stack().is_empty());
        assert_eq!(e.settings().text_size, FontSize::Large);
    }

    #[test]
    fn cut_then_clear_then_undo() {
        let mut e = engine_with(vec![rect(0.0, 0.0, 20.0, 20.0), rect(30.0, 0.0, 50.0, 20.0)]);
        e.set_selection(Selection::Single(e.strokes()[0].id));
        e.dispatch(Command::Cut);
        assert_eq!(e.strokes().len(), 1);
        assert_eq!(e.clipboard_len(), 1);
        e.dispatch(Command::ConfirmClear);
        assert!(e.strokes().is_empty());
        e.dispatch(Command::Undo);
        assert_eq!(e.strokes().len(), 1);
    }
}
