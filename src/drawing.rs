use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::geometry::{
    BBox, Point, TextLayout, TextMeasure, TextStyle, polyline_hit, shape_to_points,
};

/// Padding around text boxes when hit-testing.
pub const TEXT_HIT_PADDING: f32 = 4.0;

/// Runtime identity of a stroke inside a session. Never persisted; a nil id
/// means the stroke has not been placed in a session yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct StrokeId(Uuid);

impl StrokeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_assigned(&self) -> bool {
        !self.0.is_nil()
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stroke({})", &self.0.to_string()[..8])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Line,
    #[default]
    Rectangle,
    Circle,
    Triangle,
    Star,
    Arrow,
    Pentagon,
    Hexagon,
    Diamond,
    Lightning,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 10] = [
        ShapeKind::Line,
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::Triangle,
        ShapeKind::Star,
        ShapeKind::Arrow,
        ShapeKind::Pentagon,
        ShapeKind::Hexagon,
        ShapeKind::Diamond,
        ShapeKind::Lightning,
    ];

    /// Line and arrow are defined by their endpoints, not by a bounding box.
    pub fn is_directional(self) -> bool {
        matches!(self, ShapeKind::Line | ShapeKind::Arrow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Mono,
    Hand,
}

impl FontFamily {
    pub const ALL: [FontFamily; 4] = [
        FontFamily::Sans,
        FontFamily::Serif,
        FontFamily::Mono,
        FontFamily::Hand,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    XLarge,
}

impl FontSize {
    pub fn px(self) -> f32 {
        match self {
            FontSize::Small => 16.0,
            FontSize::Medium => 24.0,
            FontSize::Large => 36.0,
            FontSize::XLarge => 56.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Fraction of the line width that sits left of the anchor.
    pub fn factor(self) -> f32 {
        match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => 0.5,
            TextAlign::Right => 1.0,
        }
    }
}

/// How a stroke is interpreted, derived from which fields are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeKind {
    Text,
    Shape(ShapeKind),
    Dot,
    Freehand,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One drawable unit.
///
/// Exactly one interpretation applies: a shape has two points (opposite
/// bounding-box corners), text has one anchor point, a single point is a dot,
/// anything else is freehand ink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    #[serde(skip)]
    pub id: StrokeId,
    pub points: Vec<Point>,
    #[serde(default)]
    pub style: LineStyle,
    pub line_width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_gap: Option<f32>,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeKind>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub highlight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<FontFamily>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widths: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fill: bool,
}

impl Stroke {
    fn base(points: Vec<Point>, color: &str, line_width: f32) -> Self {
        Self {
            id: StrokeId::default(),
            points,
            style: LineStyle::Solid,
            line_width,
            dash_gap: None,
            color: color.to_string(),
            shape: None,
            highlight: false,
            text: None,
            font_family: None,
            font_size: None,
            bold: false,
            italic: false,
            text_align: None,
            font_scale: None,
            widths: None,
            seed: None,
            fill: false,
        }
    }

    pub fn freehand(points: Vec<Point>, color: &str, line_width: f32) -> Self {
        Self::base(points, color, line_width)
    }

    pub fn shape(kind: ShapeKind, a: Point, b: Point, color: &str, line_width: f32) -> Self {
        let mut stroke = Self::base(vec![a, b], color, line_width);
        stroke.shape = Some(kind);
        stroke
    }

    pub fn text(
        anchor: Point,
        text: &str,
        color: &str,
        style: &TextStyle,
        align: TextAlign,
    ) -> Self {
        let mut stroke = Self::base(vec![anchor], color, 1.0);
        stroke.text = Some(text.to_string());
        stroke.font_family = Some(style.family);
        stroke.font_size = Some(style.size);
        stroke.bold = style.bold;
        stroke.italic = style.italic;
        stroke.text_align = Some(align);
        if style.scale != 1.0 {
            stroke.font_scale = Some(style.scale);
        }
        stroke
    }

    pub fn with_dashes(mut self, gap: f32) -> Self {
        self.style = LineStyle::Dashed;
        self.dash_gap = Some(gap);
        self
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn filled(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_widths(mut self, widths: Vec<f32>) -> Self {
        self.widths = Some(widths);
        self
    }

    pub fn kind(&self) -> StrokeKind {
        if self.text.is_some() {
            StrokeKind::Text
        } else if let (Some(kind), 2) = (self.shape, self.points.len()) {
            StrokeKind::Shape(kind)
        } else if self.points.len() == 1 {
            StrokeKind::Dot
        } else {
            StrokeKind::Freehand
        }
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn font_scale(&self) -> f32 {
        self.font_scale.unwrap_or(1.0)
    }

    pub fn align(&self) -> TextAlign {
        self.text_align.unwrap_or_default()
    }

    pub fn anchor(&self) -> Point {
        self.points.first().copied().unwrap_or_default()
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            family: self.font_family.unwrap_or_default(),
            size: self.font_size.unwrap_or_default(),
            bold: self.bold,
            italic: self.italic,
            scale: self.font_scale(),
        }
    }

    pub fn text_layout(&self) -> Option<TextLayout<'_>> {
        let text = self.text.as_deref()?;
        Some(TextLayout {
            anchor: self.anchor(),
            text,
            align: self.align(),
            style: self.text_style(),
        })
    }

    /// Outline as a point sequence: shape vertices for shapes, raw points otherwise.
    pub fn outline(&self) -> Vec<Point> {
        match self.kind() {
            StrokeKind::Shape(kind) => shape_to_points(kind, self.points[0], self.points[1]),
            _ => self.points.clone(),
        }
    }

    /// World-space bounds. Ink is widened by half the line width.
    pub fn bbox(&self, measure: &dyn TextMeasure) -> BBox {
        if let Some(layout) = self.text_layout() {
            return layout.bbox(measure);
        }
        let outline = self.outline();
        let bounds = BBox::from_points(&outline).unwrap_or_default();
        match self.kind() {
            StrokeKind::Shape(_) => bounds,
            _ => bounds.padded(self.line_width * 0.5),
        }
    }

    /// Proximity test used by the eraser: vertices and segments within `radius`,
    /// text by its padded box.
    pub fn hit_test(&self, p: Point, radius: f32, measure: &dyn TextMeasure) -> bool {
        if let Some(layout) = self.text_layout() {
            return layout.bbox(measure).padded(TEXT_HIT_PADDING).contains(p);
        }
        polyline_hit(&self.outline(), p, radius + self.line_width * 0.5)
    }

    /// Picking test for selection: shapes and text by box, ink by proximity.
    pub fn picks(&self, p: Point, tolerance: f32, measure: &dyn TextMeasure) -> bool {
        match self.kind() {
            StrokeKind::Text | StrokeKind::Shape(_) => {
                self.bbox(measure).padded(tolerance).contains(p)
            }
            StrokeKind::Dot | StrokeKind::Freehand => self.hit_test(p, tolerance, measure),
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }
}

/// Points of `start` shifted by `(dx, dy)`.
pub fn translated(start: &[Point], dx: f32, dy: f32) -> Vec<Point> {
    start.iter().map(|p| Point::new(p.x + dx, p.y + dy)).collect()
}

/// Union of the bounds of several strokes.
pub fn combined_bbox<'a>(
    strokes: impl IntoIterator<Item = &'a Stroke>,
    measure: &dyn TextMeasure,
) -> Option<BBox> {
    strokes
        .into_iter()
        .map(|s| s.bbox(measure))
        .reduce(|a, b| a.union(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HeuristicMeasure;

    #[test]
    fn kind_follows_fields() {
        let dot = Stroke::freehand(vec![Point::new(1.0, 1.0)], "#000000", 2.0);
        assert_eq!(dot.kind(), StrokeKind::Dot);

        let ink = Stroke::freehand(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)], "#000000", 2.0);
        assert_eq!(ink.kind(), StrokeKind::Freehand);

        let rect = Stroke::shape(
            ShapeKind::Rectangle,
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            "#000000",
            2.0,
        );
        assert_eq!(rect.kind(), StrokeKind::Shape(ShapeKind::Rectangle));

        let text = Stroke::text(
            Point::new(0.0, 0.0),
            "hi",
            "#000000",
            &TextStyle::default(),
            TextAlign::Left,
        );
        assert_eq!(text.kind(), StrokeKind::Text);
    }

    #[test]
    fn serializes_camel_case_and_skips_defaults() {
        let stroke = Stroke::freehand(vec![Point::new(1.0, 2.0)], "#ff0000", 3.0).with_dashes(1.5);
        let json = serde_json::to_value(&stroke).unwrap();
        assert_eq!(json["lineWidth"], 3.0);
        assert_eq!(json["dashGap"], 1.5);
        assert_eq!(json["style"], "dashed");
        assert!(json.get("highlight").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn shape_picks_inside_box_but_erases_on_outline() {
        let m = HeuristicMeasure;
        let rect = Stroke::shape(
            ShapeKind::Rectangle,
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
            "#000000",
            2.0,
        );
        assert!(rect.picks(Point::new(25.0, 25.0), 4.0, &m));
        assert!(!rect.hit_test(Point::new(25.0, 25.0), 4.0, &m));
        assert!(rect.hit_test(Point::new(50.0, 25.0), 4.0, &m));
    }

    #[test]
    fn ink_bbox_includes_half_width() {
        let m = HeuristicMeasure;
        let ink = Stroke::freehand(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)], "#000000", 4.0);
        let b = ink.bbox(&m);
        assert_eq!(b, BBox::new(-2.0, -2.0, 14.0, 4.0));
    }
}
