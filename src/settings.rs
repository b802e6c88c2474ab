use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::drawing::{FontFamily, FontSize, LineStyle, ShapeKind, TextAlign};
use crate::geometry::TextStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Ink colour new strokes get, and the colour swapped on a theme flip.
    pub fn default_stroke_color(self) -> &'static str {
        match self {
            Theme::Light => "#000000",
            Theme::Dark => "#ffffff",
        }
    }

    pub fn background(self) -> &'static str {
        match self {
            Theme::Light => "#ffffff",
            Theme::Dark => "#1e1e1e",
        }
    }

    pub fn grid_color(self) -> &'static str {
        match self {
            Theme::Light => "#b4b4b4",
            Theme::Dark => "#505050",
        }
    }

    pub fn accent(self) -> &'static str {
        match self {
            Theme::Light => "#2f80ed",
            Theme::Dark => "#56a3ff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    #[default]
    Off,
    Dot,
    Square,
}

/// User-facing drawing settings. Owned by the UI shell; the engine keeps a
/// copy that the shell replaces through `Command::UpdateSettings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub line_width: f32,
    pub dash_gap: f32,
    pub color: String,
    pub shape: ShapeKind,
    pub text_size: FontSize,
    pub font_family: FontFamily,
    pub text_align: TextAlign,
    pub bold: bool,
    pub italic: bool,
    pub grid: GridType,
    pub theme: Theme,
    pub pressure_sensitivity: bool,
    pub sketchy: bool,
    pub fill: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            line_width: 3.0,
            dash_gap: 1.0,
            color: Theme::Light.default_stroke_color().to_string(),
            shape: ShapeKind::Rectangle,
            text_size: FontSize::Medium,
            font_family: FontFamily::Sans,
            text_align: TextAlign::Left,
            bold: false,
            italic: false,
            grid: GridType::Off,
            theme: Theme::Light,
            pressure_sensitivity: true,
            sketchy: false,
            fill: false,
        }
    }
}

impl Settings {
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            family: self.font_family,
            size: self.text_size,
            bold: self.bold,
            italic: self.italic,
            scale: 1.0,
        }
    }

    pub fn line_style(&self, dashed: bool) -> LineStyle {
        if dashed { LineStyle::Dashed } else { LineStyle::Solid }
    }
}

/// Engine tunables. Every field has a default; a config file only needs the
/// fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct EngineConfig {
    pub save_debounce_ms: u64,
    pub max_persist_bytes: usize,
    pub caret_blink_ms: u64,
    pub erase_radius_px: f32,
    pub select_tolerance_px: f32,
    pub handle_radius_px: f32,
    pub min_shape_size: f32,
    pub trail_max_points: usize,
    pub trail_lifetime_ms: u64,
    pub tap_window_ms: u64,
    pub tap_slop_px: f32,
    pub view_animation_ms: u64,
    pub fit_padding_px: f32,
    pub export_padding: f32,
    pub text_history_depth: usize,
    pub storage_dir: Option<PathBuf>,
    pub fonts: HashMap<FontFamily, PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 500,
            max_persist_bytes: 5 * 1024 * 1024,
            caret_blink_ms: 530,
            erase_radius_px: 10.0,
            select_tolerance_px: 6.0,
            handle_radius_px: 8.0,
            min_shape_size: 8.0,
            trail_max_points: 24,
            trail_lifetime_ms: 300,
            tap_window_ms: 250,
            tap_slop_px: 10.0,
            view_animation_ms: 300,
            fit_padding_px: 40.0,
            export_padding: 20.0,
            text_history_depth: 100,
            storage_dir: None,
            fonts: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn caret_blink(&self) -> Duration {
        Duration::from_millis(self.caret_blink_ms)
    }

    pub fn trail_lifetime(&self) -> Duration {
        Duration::from_millis(self.trail_lifetime_ms)
    }

    pub fn tap_window(&self) -> Duration {
        Duration::from_millis(self.tap_window_ms)
    }

    pub fn view_animation(&self) -> Duration {
        Duration::from_millis(self.view_animation_ms)
    }
}
