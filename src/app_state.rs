use std::time::Instant;
use tiny_skia::Pixmap;

use crate::canvas::{
    CanvasIndex, CanvasSession, SessionCache, ViewAnimation, Viewport, swap_stroke_colors,
    swap_theme_colors,
};
use crate::drawing::{Stroke, StrokeId, StrokeKind};
use crate::events::EngineEvent;
use crate::geometry::{BBox, Point};
use crate::gestures::{PointerTracker, TapWindow};
use crate::history::History;
use crate::persistence::{CanvasStorage, FileStore, MemoryStore, SaveDebounce};
use crate::render::{Renderer, Scene, encode_png, export_content, export_view};
use crate::settings::{EngineConfig, Settings, Theme};
use crate::state::{
    HeldKeys, Interaction, Mode, PointerInput, SelectDrag, Selection, TextTarget, Tool,
};
use crate::text_renderer::FontBook;
use crate::trail::Trail;
use crate::update_logic::RedrawScheduler;

/// The whiteboard engine: one active canvas session plus everything needed to
/// turn host input into strokes and frames. Input handling lives in
/// `event_handler.rs`, selection editing in `selection.rs`, timers in
/// `update_logic.rs`.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) settings: Settings,
    pub(crate) tool: Tool,
    pub(crate) size: (u32, u32),

    pub(crate) session: CanvasSession,
    pub(crate) cache: SessionCache,
    pub(crate) storage: CanvasStorage,
    pub(crate) renderer: Renderer,

    pub(crate) keys: HeldKeys,
    pub(crate) interaction: Interaction,
    pub(crate) selection: Selection,
    /// The mouse or pen pointer while its button is held.
    pub(crate) held_pointer: Option<PointerInput>,
    pub(crate) touches: PointerTracker,
    pub(crate) tap: Option<TapWindow>,
    pub(crate) clipboard: Vec<Stroke>,
    /// Last pointer position, screen space.
    pub(crate) cursor: Point,

    pub(crate) erase_trail: Trail,
    pub(crate) laser_trail: Trail,
    pub(crate) animation: Option<ViewAnimation>,
    pub(crate) save: SaveDebounce,
    pub(crate) redraw: RedrawScheduler,
    pub(crate) events: Vec<EngineEvent>,
}

impl Engine {
    /// Engine backed by `config.storage_dir`, or by memory when unset.
    pub fn new(config: EngineConfig, settings: Settings, width: u32, height: u32) -> anyhow::Result<Self> {
        let storage = match &config.storage_dir {
            Some(dir) => CanvasStorage::new(Box::new(FileStore::open(dir)?), config.max_persist_bytes),
            None => CanvasStorage::new(Box::new(MemoryStore::new()), config.max_persist_bytes),
        };
        let fonts = FontBook::load(&config.fonts);
        Ok(Self::with_storage(config, settings, storage, fonts, width, height))
    }

    pub fn with_storage(
        config: EngineConfig,
        settings: Settings,
        storage: CanvasStorage,
        fonts: FontBook,
        width: u32,
        height: u32,
    ) -> Self {
        let size = (width.max(1), height.max(1));
        let index = storage.load_active().unwrap_or(CanvasIndex::FIRST);
        let session = storage.load_session(index, Viewport::centered(size.0 as f32, size.1 as f32));
        log::info!(
            "engine ready on canvas {index} ({} strokes, {}x{})",
            session.strokes.len(),
            size.0,
            size.1
        );
        Self {
            erase_trail: Trail::new(config.trail_max_points, config.trail_lifetime()),
            laser_trail: Trail::new(config.trail_max_points, config.trail_lifetime()),
            save: SaveDebounce::new(config.save_debounce()),
            config,
            settings,
            tool: Tool::default(),
            size,
            session,
            cache: SessionCache::new(),
            storage,
            renderer: Renderer::new(fonts),
            keys: HeldKeys::default(),
            interaction: Interaction::Idle,
            selection: Selection::None,
            held_pointer: None,
            touches: PointerTracker::default(),
            tap: None,
            clipboard: Vec::new(),
            cursor: Point::new(size.0 as f32 * 0.5, size.1 as f32 * 0.5),
            animation: None,
            redraw: RedrawScheduler::default(),
            events: Vec::new(),
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.session.strokes
    }

    pub fn history(&self) -> &History {
        &self.session.history
    }

    pub fn view(&self) -> Viewport {
        self.session.view
    }

    pub fn active_canvas(&self) -> CanvasIndex {
        self.session.index
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn selection(&self) -> Vec<StrokeId> {
        self.selection.ids()
    }

    /// The mode a primary press would start right now.
    pub fn mode(&self) -> Mode {
        self.keys.resolve(self.tool, self.settings.shape)
    }

    pub fn interaction_name(&self) -> &'static str {
        self.interaction.name()
    }

    /// Ids marked by an erase gesture that has not been released yet.
    pub fn pending_erase(&self) -> &[StrokeId] {
        match &self.interaction {
            Interaction::Erasing { pending, .. } => pending,
            _ => &[],
        }
    }

    /// Contents of the text buffer while writing.
    pub fn text_buffer(&self) -> Option<&str> {
        self.interaction.text_session().map(|s| s.editor.text())
    }

    pub fn clipboard_len(&self) -> usize {
        self.clipboard.len()
    }

    pub fn fonts(&self) -> &FontBook {
        &self.renderer.fonts
    }

    /// Number of stroke-cache rebuilds so far; exposed for diagnostics.
    pub fn stroke_cache_rebuilds(&self) -> usize {
        self.renderer.stroke_rebuilds()
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        log::debug!("resize {width}x{height}");
        self.size = (width, height);
        self.request_redraw();
    }

    pub(crate) fn default_view(&self) -> Viewport {
        Viewport::centered(self.size.0 as f32, self.size.1 as f32)
    }

    pub(crate) fn to_world(&self, screen: Point) -> Point {
        self.session.view.screen_to_world(screen)
    }

    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub(crate) fn request_redraw(&mut self) {
        self.redraw.request();
    }

    pub(crate) fn history_changed(&mut self) {
        let (can_undo, can_redo) = (self.session.history.can_undo(), self.session.history.can_redo());
        self.emit(EngineEvent::HistoryChanged { can_undo, can_redo });
    }

    /// After a discrete mutation of the stroke list: rebuild the stroke
    /// layer, persist immediately, notify the shell.
    pub(crate) fn strokes_changed(&mut self) {
        self.renderer.invalidate_strokes();
        self.save_strokes_now();
        self.history_changed();
        self.request_redraw();
    }

    pub(crate) fn save_strokes_now(&mut self) {
        self.save.cancel();
        self.storage.save_strokes(self.session.index, &self.session.strokes);
    }

    /// Replaces the viewport without persisting; used every frame of a
    /// gesture or animation.
    pub(crate) fn set_view(&mut self, view: Viewport) {
        let zoomed = (view.scale - self.session.view.scale).abs() > f32::EPSILON;
        self.session.view = view;
        if zoomed {
            self.emit(EngineEvent::ZoomChanged(view.scale));
        }
        self.request_redraw();
    }

    pub(crate) fn save_view(&mut self) {
        self.storage.save_view(self.session.index, &self.session.view);
    }

    pub(crate) fn set_selection(&mut self, selection: Selection) {
        if selection != self.selection {
            self.selection = selection;
            self.emit(EngineEvent::SelectionChanged(self.selection.ids()));
            self.request_redraw();
        }
    }

    /// Drops selected ids that are no longer in the list.
    pub(crate) fn prune_selection(&mut self) {
        let live: Vec<StrokeId> = self
            .selection
            .ids()
            .into_iter()
            .filter(|id| self.session.find(*id).is_some())
            .collect();
        self.set_selection(Selection::from_ids(live));
    }

    /// Saves the current session, parks it in the cache and activates `index`,
    /// from the cache when possible and from storage otherwise.
    pub fn switch_canvas(&mut self, index: CanvasIndex) {
        if index == self.session.index {
            return;
        }
        self.end_interaction();
        self.set_selection(Selection::None);
        self.storage.save_session(&self.session);

        let next = match self.cache.take(index) {
            Some(session) => session,
            None => self.storage.load_session(index, self.default_view()),
        };
        let previous = std::mem::replace(&mut self.session, next);
        self.cache.park(previous);
        self.storage.save_active(index);
        self.animation = None;
        self.renderer.invalidate_strokes();

        log::info!("switched to canvas {index} ({} strokes)", self.session.strokes.len());
        self.emit(EngineEvent::CanvasSwitched(index));
        self.emit(EngineEvent::ZoomChanged(self.session.view.scale));
        self.history_changed();
        self.request_redraw();
    }

    /// Installs new settings. A theme flip migrates default-coloured ink in
    /// every session, cached or stored.
    pub(crate) fn apply_settings(&mut self, settings: Settings) {
        let previous = std::mem::replace(&mut self.settings, settings);
        if previous.theme != self.settings.theme {
            self.migrate_theme(previous.theme, self.settings.theme);
        }
        if let Interaction::WritingText(text) = &mut self.interaction {
            if text.target == TextTarget::New {
                text.style = self.settings.text_style();
                text.align = self.settings.text_align;
                text.color = self.settings.color.clone();
            }
        }
        self.request_redraw();
    }

    fn migrate_theme(&mut self, from: Theme, to: Theme) {
        let (old, new) = (from.default_stroke_color(), to.default_stroke_color());
        let mut swapped = swap_theme_colors(&mut self.session, from, to);
        for session in self.cache.sessions_mut() {
            let n = swap_theme_colors(session, from, to);
            if n > 0 {
                self.storage.save_strokes(session.index, &session.strokes);
            }
            swapped += n;
        }
        for index in CanvasIndex::all() {
            if index == self.session.index || self.cache.contains(index) {
                continue;
            }
            self.storage
                .rewrite_strokes(index, |strokes| swap_stroke_colors(strokes.iter_mut(), old, new) > 0);
        }
        if self.settings.color.eq_ignore_ascii_case(old) {
            self.settings.color = new.to_string();
        }
        log::info!("theme {from:?} -> {to:?}: swapped {swapped} loaded strokes");
        self.renderer.invalidate_strokes();
        self.save_strokes_now();
    }

    /// Replaces the active canvas with `strokes`. History is cleared; the
    /// previous content is not recoverable by undo.
    pub fn import_strokes(&mut self, strokes: Vec<Stroke>) {
        self.end_interaction();
        self.set_selection(Selection::None);
        let count = strokes.len();
        let view = self.session.view;
        self.session = CanvasSession::with_strokes(self.session.index, strokes, view);
        log::info!("imported {count} strokes into canvas {}", self.session.index);
        self.emit(EngineEvent::Toast(format!("Imported {count} strokes")));
        self.strokes_changed();
        self.fit_to_content(Instant::now());
    }

    /// Paints the current frame into `pixmap`, which should match `size()`.
    pub fn render(&mut self, pixmap: &mut Pixmap, now: Instant) {
        let selected = self.selection.ids();
        let selection_handles = match self.selection {
            Selection::Single(id) => self
                .session
                .find(id)
                .is_some_and(|s| !matches!(s.kind(), StrokeKind::Freehand | StrokeKind::Dot)),
            _ => false,
        };
        let (in_progress, select_box) = match &self.interaction {
            Interaction::Drawing { id, .. } => (Some(*id), None),
            Interaction::Selecting { drag, .. } => match drag {
                SelectDrag::Move { id, .. } | SelectDrag::Resize { id, .. } => (Some(*id), None),
                SelectDrag::Box { start, end } => (None, Some(BBox::from_corners(*start, *end))),
                SelectDrag::GroupMove { .. } => (None, None),
            },
            _ => (None, None),
        };
        let text = self.interaction.text_session();
        let scene = Scene {
            strokes: &self.session.strokes,
            view: self.session.view,
            theme: self.settings.theme,
            grid: self.settings.grid,
            in_progress,
            hidden: text.and_then(|t| t.editing()),
            pending_erase: match &self.interaction {
                Interaction::Erasing { pending, .. } => Some(pending.as_slice()),
                _ => None,
            },
            selection: &selected,
            selection_handles,
            select_box,
            text,
            erase_trail: &self.erase_trail,
            laser_trail: &self.laser_trail,
            now,
        };
        self.renderer.render(pixmap, &scene);
    }

    /// PNG of the active canvas: the current view on the theme background,
    /// or all content cropped with a margin on a transparent background.
    pub fn export_png(&self, transparent: bool) -> anyhow::Result<Vec<u8>> {
        let strokes = &self.session.strokes;
        let pixmap = if transparent {
            export_content(strokes, &self.renderer.fonts, self.config.export_padding)?
        } else {
            export_view(
                strokes,
                self.session.view,
                self.size.0,
                self.size.1,
                self.settings.theme,
                &self.renderer.fonts,
            )?
        };
        log::info!(
            "exported canvas {} ({}x{}, transparent: {transparent})",
            self.session.index,
            pixmap.width(),
            pixmap.height()
        );
        encode_png(&pixmap)
    }
}
