use crate::canvas::CanvasIndex;
use crate::drawing::{FontFamily, FontSize, Stroke, StrokeId, TextAlign};
use crate::geometry::Point;
use crate::settings::Settings;
use crate::state::Tool;

/// Notifications for the UI shell, drained with `Engine::drain_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ZoomChanged(f32),
    ColorUsed(String),
    Toast(String),
    /// The user asked to clear the canvas; answer with `Command::ConfirmClear`.
    ClearRequested,
    CanvasSwitched(CanvasIndex),
    ExportRequested { transparent: bool },
    SelectionChanged(Vec<StrokeId>),
    HistoryChanged { can_undo: bool, can_redo: bool },
}

/// Requests from the UI shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Undo,
    Redo,
    SetTool(Tool),
    UpdateSettings(Settings),
    SwitchCanvas(CanvasIndex),
    RequestClear,
    ConfirmClear,
    ResetView,
    FitToContent,
    ZoomIn,
    ZoomOut,
    Copy,
    Cut,
    /// `at` is in world coordinates; the clipboard is recentered on it.
    Paste { at: Point },
    SelectAll,
    DeleteSelection,
    BringToFront,
    SendToBack,
    SetColor(String),
    SetFont(FontFamily),
    SetFontSize(FontSize),
    SetBold(bool),
    SetItalic(bool),
    SetAlign(TextAlign),
    RequestExport { transparent: bool },
    /// Replaces the active canvas with already-validated strokes.
    Import(Vec<Stroke>),
}
