use super::{BBox, Point};
use crate::drawing::{FontFamily, FontSize, TextAlign};

/// Measured widths are widened by this factor so glyph overhang stays inside the box.
pub const TEXT_WIDTH_SAFETY: f32 = 1.05;
const HEURISTIC_CHAR_WIDTH: f32 = 0.6;
const HEURISTIC_LINE_HEIGHT: f32 = 1.25;
const HEURISTIC_ASCENT: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub family: FontFamily,
    pub size: FontSize,
    pub bold: bool,
    pub italic: bool,
    pub scale: f32,
}

impl TextStyle {
    pub fn px(&self) -> f32 {
        self.size.px() * self.scale
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: FontFamily::default(),
            size: FontSize::default(),
            bold: false,
            italic: false,
            scale: 1.0,
        }
    }
}

/// Vertical font metrics in pixels at the style's size. `descent` is positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

pub trait TextMeasure {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32;

    /// Real font metrics, or `None` when no font is loaded for the family.
    fn metrics(&self, style: &TextStyle) -> Option<LineMetrics>;

    fn line_height(&self, style: &TextStyle) -> f32 {
        match self.metrics(style) {
            Some(m) => m.ascent + m.descent + m.line_gap,
            None => style.px() * HEURISTIC_LINE_HEIGHT,
        }
    }

    fn ascent(&self, style: &TextStyle) -> f32 {
        self.metrics(style)
            .map(|m| m.ascent)
            .unwrap_or(style.px() * HEURISTIC_ASCENT)
    }
}

/// Character-count estimate used when no measurement font is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMeasure;

impl TextMeasure for HeuristicMeasure {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32 {
        let bold = if style.bold { 1.05 } else { 1.0 };
        line.chars().count() as f32 * style.px() * HEURISTIC_CHAR_WIDTH * bold
    }

    fn metrics(&self, _style: &TextStyle) -> Option<LineMetrics> {
        None
    }
}

/// A block of (possibly multi-line) text anchored at `anchor`.
/// Horizontal alignment positions lines relative to the anchor; the top of the
/// first line is always at `anchor.y`.
#[derive(Debug, Clone, Copy)]
pub struct TextLayout<'a> {
    pub anchor: Point,
    pub text: &'a str,
    pub align: TextAlign,
    pub style: TextStyle,
}

impl<'a> TextLayout<'a> {
    pub fn lines(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.text.split('\n')
    }

    pub fn line_count(&self) -> usize {
        self.lines().count()
    }

    pub fn line_height(&self, measure: &dyn TextMeasure) -> f32 {
        measure.line_height(&self.style)
    }

    /// Left x of a line of width `line_width`.
    pub fn line_start_x(&self, line_width: f32) -> f32 {
        self.anchor.x - line_width * self.align.factor()
    }

    pub fn bbox(&self, measure: &dyn TextMeasure) -> BBox {
        let max_width = self
            .lines()
            .map(|l| measure.line_width(l, &self.style))
            .fold(0.0f32, f32::max)
            * TEXT_WIDTH_SAFETY;
        let height = self.line_height(measure) * self.line_count() as f32;
        BBox::new(
            self.anchor.x - max_width * self.align.factor(),
            self.anchor.y,
            max_width,
            height,
        )
    }

    /// Top point and height of the caret drawn before char index `caret`.
    pub fn caret_rect(&self, caret: usize, measure: &dyn TextMeasure) -> (Point, f32) {
        let (line_idx, col) = line_col(self.text, caret);
        let lh = self.line_height(measure);
        let line = self.lines().nth(line_idx).unwrap_or("");
        let start = self.line_start_x(measure.line_width(line, &self.style));
        let prefix = &line[..byte_offset(line, col)];
        let x = start + measure.line_width(prefix, &self.style);
        (Point::new(x, self.anchor.y + lh * line_idx as f32), lh)
    }
}

pub fn text_bbox(layout: &TextLayout<'_>, measure: &dyn TextMeasure) -> BBox {
    layout.bbox(measure)
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

/// `(line, column)` of a char index, both counted in chars.
pub fn line_col(text: &str, caret: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    for (i, ch) in text.chars().enumerate() {
        if i == caret {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Char index of the caret boundary nearest to a click in world coordinates.
pub fn caret_pos_from_click(
    layout: &TextLayout<'_>,
    click: Point,
    measure: &dyn TextMeasure,
) -> usize {
    let lines: Vec<&str> = layout.lines().collect();
    let lh = layout.line_height(measure);
    let row = if lh > 0.0 {
        ((click.y - layout.anchor.y) / lh).floor()
    } else {
        0.0
    };
    // `as usize` saturates negatives and NaN to 0.
    let line_idx = (row.max(0.0) as usize).min(lines.len() - 1);
    let line = lines[line_idx];

    let line_width = measure.line_width(line, &layout.style);
    let local_x = click.x - layout.line_start_x(line_width);

    let boundaries: Vec<usize> = line
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(line.len()))
        .collect();
    let width_at = |b: usize| measure.line_width(&line[..boundaries[b]], &layout.style);

    let last = boundaries.len() - 1;
    let col = if local_x <= 0.0 {
        0
    } else if local_x >= line_width {
        last
    } else {
        let (mut lo, mut hi) = (0, last);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if width_at(mid) < local_x {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo > 0 && local_x - width_at(lo - 1) < width_at(lo) - local_x {
            lo - 1
        } else {
            lo
        }
    };

    let preceding: usize = lines[..line_idx].iter().map(|l| l.chars().count() + 1).sum();
    preceding + col
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(text: &str, align: TextAlign) -> TextLayout<'_> {
        TextLayout {
            anchor: Point::new(100.0, 50.0),
            text,
            align,
            style: TextStyle::default(),
        }
    }

    #[test]
    fn bbox_spans_longest_line_and_all_rows() {
        let m = HeuristicMeasure;
        let l = layout("ab\nabcd", TextAlign::Left);
        let px = l.style.px();
        let b = l.bbox(&m);
        assert!((b.w - 4.0 * px * 0.6 * TEXT_WIDTH_SAFETY).abs() < 0.01);
        assert!((b.h - 2.0 * px * 1.25).abs() < 0.01);
        assert_eq!(b.x, 100.0);
        assert_eq!(b.y, 50.0);
    }

    #[test]
    fn alignment_shifts_box() {
        let m = HeuristicMeasure;
        let right = layout("abcd", TextAlign::Right).bbox(&m);
        assert!((right.right() - 100.0).abs() < 0.01);
        let center = layout("abcd", TextAlign::Center).bbox(&m);
        assert!((center.center().x - 100.0).abs() < 0.01);
    }

    #[test]
    fn click_at_box_origin_is_caret_zero() {
        let m = HeuristicMeasure;
        for align in [TextAlign::Left, TextAlign::Center, TextAlign::Right] {
            let l = layout("hello\nworld!", align);
            let b = l.bbox(&m);
            assert_eq!(caret_pos_from_click(&l, Point::new(b.x, b.y), &m), 0);
        }
    }

    #[test]
    fn click_at_end_of_last_line_is_text_len() {
        let m = HeuristicMeasure;
        let text = "hello\nworld!";
        let l = layout(text, TextAlign::Left);
        let lh = l.line_height(&m);
        let w = m.line_width("world!", &l.style);
        let click = Point::new(100.0 + w, 50.0 + lh * 1.5);
        assert_eq!(caret_pos_from_click(&l, click, &m), text.chars().count());
    }

    #[test]
    fn click_picks_nearest_boundary() {
        let m = HeuristicMeasure;
        let l = layout("abcd", TextAlign::Left);
        let cw = l.style.px() * 0.6;
        assert_eq!(caret_pos_from_click(&l, Point::new(100.0 + cw * 1.2, 55.0), &m), 1);
        assert_eq!(caret_pos_from_click(&l, Point::new(100.0 + cw * 1.8, 55.0), &m), 2);
    }

    #[test]
    fn click_below_text_clamps_to_last_line() {
        let m = HeuristicMeasure;
        let l = layout("a\nbc", TextAlign::Left);
        assert_eq!(caret_pos_from_click(&l, Point::new(0.0, 10_000.0), &m), 2);
    }

    #[test]
    fn line_col_counts_newlines() {
        assert_eq!(line_col("ab\ncd", 0), (0, 0));
        assert_eq!(line_col("ab\ncd", 2), (0, 2));
        assert_eq!(line_col("ab\ncd", 3), (1, 0));
        assert_eq!(line_col("ab\ncd", 5), (1, 2));
    }

    #[test]
    fn caret_rect_tracks_line_and_column() {
        let m = HeuristicMeasure;
        let l = layout("ab\ncd", TextAlign::Left);
        let lh = l.line_height(&m);
        let (top, h) = l.caret_rect(4, &m);
        assert!((top.y - (50.0 + lh)).abs() < 0.01);
        assert!((top.x - (100.0 + l.style.px() * 0.6)).abs() < 0.01);
        assert_eq!(h, lh);
    }
}
