use ab_glyph::{Font, FontArc, OutlineCurve, PxScale, ScaleFont};
use anyhow::Context;
use std::collections::HashMap;
use std::path::PathBuf;
use tiny_skia::{Path, PathBuilder};

use crate::drawing::FontFamily;
use crate::geometry::{LineMetrics, Point, TextMeasure, TextStyle};

const DEFAULT_FONT: &[u8] = include_bytes!("../data/fonts/DejaVuSans.ttf");

const BOLD_WIDTH_FACTOR: f32 = 1.05;
const ITALIC_SKEW: f32 = 0.2;

/// Stroke width used to embolden glyph outlines, relative to the font size.
pub const BOLD_STROKE: f32 = 0.04;

/// Fonts per family. A family with no font of its own borrows the sans
/// font; with no fonts at all, measurement falls back to the heuristic.
#[derive(Clone)]
pub struct FontBook {
    fonts: HashMap<FontFamily, FontArc>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FontBook {
    /// A book holding the embedded sans face.
    pub fn new() -> Self {
        let mut book = Self::empty();
        match FontArc::try_from_slice(DEFAULT_FONT) {
            Ok(font) => {
                book.fonts.insert(FontFamily::Sans, font);
            }
            Err(e) => log::error!("embedded font unusable: {e}"),
        }
        book
    }

    /// A book with no fonts; text is measured by the heuristic and not drawn.
    pub fn empty() -> Self {
        Self { fonts: HashMap::new() }
    }

    /// Loads every configured font file over the embedded face. Unreadable
    /// files are logged and skipped.
    pub fn load(paths: &HashMap<FontFamily, PathBuf>) -> Self {
        let mut book = Self::new();
        for (family, path) in paths {
            let loaded = std::fs::read(path)
                .with_context(|| format!("reading font {}", path.display()))
                .and_then(|bytes| book.insert_bytes(*family, bytes));
            match loaded {
                Ok(()) => log::info!("loaded {family:?} font from {}", path.display()),
                Err(e) => log::warn!("font for {family:?} unavailable: {e:#}"),
            }
        }
        book
    }

    pub fn insert_bytes(&mut self, family: FontFamily, bytes: Vec<u8>) -> anyhow::Result<()> {
        let font = FontArc::try_from_vec(bytes).context("parsing font data")?;
        self.fonts.insert(family, font);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    fn font_for(&self, family: FontFamily) -> Option<&FontArc> {
        self.fonts
            .get(&family)
            .or_else(|| self.fonts.get(&FontFamily::Sans))
    }

    /// Glyph outlines of one line as a path in world coordinates, with the
    /// pen starting at `left` on the baseline `baseline_y`.
    pub fn line_path(&self, line: &str, style: &TextStyle, left: f32, baseline_y: f32) -> Option<Path> {
        let font = self.font_for(style.family)?;
        let scaled = font.as_scaled(PxScale::from(style.px()));
        let (sx, sy) = (scaled.h_scale_factor(), scaled.v_scale_factor());
        let skew = if style.italic { ITALIC_SKEW } else { 0.0 };

        let mut pb = PathBuilder::new();
        let mut pen_x = left;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(p) = prev {
                pen_x += scaled.kern(p, id);
            }
            if let Some(outline) = font.outline(id) {
                let map = |p: ab_glyph::Point| {
                    let up = p.y * sy;
                    Point::new(pen_x + p.x * sx + up * skew, baseline_y - up)
                };
                let mut cursor: Option<Point> = None;
                for curve in &outline.curves {
                    let (start, end) = match curve {
                        OutlineCurve::Line(a, b) => (map(*a), map(*b)),
                        OutlineCurve::Quad(a, _, b) => (map(*a), map(*b)),
                        OutlineCurve::Cubic(a, _, _, b) => (map(*a), map(*b)),
                    };
                    if cursor != Some(start) {
                        if cursor.is_some() {
                            pb.close();
                        }
                        pb.move_to(start.x, start.y);
                    }
                    match curve {
                        OutlineCurve::Line(_, _) => pb.line_to(end.x, end.y),
                        OutlineCurve::Quad(_, c, _) => {
                            let c = map(*c);
                            pb.quad_to(c.x, c.y, end.x, end.y);
                        }
                        OutlineCurve::Cubic(_, c1, c2, _) => {
                            let (c1, c2) = (map(*c1), map(*c2));
                            pb.cubic_to(c1.x, c1.y, c2.x, c2.y, end.x, end.y);
                        }
                    }
                    cursor = Some(end);
                }
                if cursor.is_some() {
                    pb.close();
                }
            }
            pen_x += scaled.h_advance(id);
            prev = Some(id);
        }
        pb.finish()
    }
}

impl TextMeasure for FontBook {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32 {
        let Some(font) = self.font_for(style.family) else {
            return crate::geometry::HeuristicMeasure.line_width(line, style);
        };
        let scaled = font.as_scaled(PxScale::from(style.px()));
        let mut width = 0.0;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        if style.bold { width * BOLD_WIDTH_FACTOR } else { width }
    }

    fn metrics(&self, style: &TextStyle) -> Option<LineMetrics> {
        let font = self.font_for(style.family)?;
        let scaled = font.as_scaled(PxScale::from(style.px()));
        Some(LineMetrics {
            ascent: scaled.ascent(),
            descent: -scaled.descent(),
            line_gap: scaled.line_gap(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HeuristicMeasure;

    #[test]
    fn empty_book_measures_like_heuristic() {
        let book = FontBook::empty();
        let style = TextStyle::default();
        assert_eq!(
            book.line_width("hello", &style),
            HeuristicMeasure.line_width("hello", &style)
        );
        assert!(book.metrics(&style).is_none());
        assert!(book.line_path("hello", &style, 0.0, 0.0).is_none());
    }

    #[test]
    fn bad_font_bytes_are_rejected() {
        let mut book = FontBook::empty();
        assert!(book.insert_bytes(FontFamily::Mono, vec![0, 1, 2, 3]).is_err());
        assert!(book.is_empty());
    }

    #[test]
    fn missing_font_files_fall_back_to_embedded_face() {
        let mut paths = HashMap::new();
        paths.insert(FontFamily::Serif, PathBuf::from("/no/such/font.ttf"));
        let book = FontBook::load(&paths);
        let style = TextStyle {
            family: FontFamily::Serif,
            ..TextStyle::default()
        };
        assert!(book.metrics(&style).is_some());
        assert!(book.line_path("hello", &style, 0.0, 20.0).is_some());
    }

    #[test]
    fn default_book_outlines_every_family() {
        let book = FontBook::new();
        assert!(!book.is_empty());
        for family in FontFamily::ALL {
            let style = TextStyle {
                family,
                ..TextStyle::default()
            };
            let path = book.line_path("Hi", &style, 0.0, 20.0);
            assert!(path.is_some_and(|p| p.bounds().width() > 1.0), "{family:?}");
            assert!(book.line_width("Hi", &style) > 0.0);
        }
    }
}
