//! Raster output for the engine.
//!
//! A frame is composed from two memoized bitmaps, the grid and the completed
//! strokes, plus everything that changes while the pointer moves (the stroke
//! being drawn, trails, the text buffer, selection chrome), which is painted
//! on top every frame. Each cache stores the structured key it was built from
//! and is rebuilt when the key of the next frame differs.

mod color;
mod grid;
mod overlay;
mod strokes;

pub use color::{paint_color, parse_hex};
pub use grid::{BASE_SPACING, GridCacheKey, LEVEL_RATIO, render_grid};
pub use overlay::{ERASE_TRAIL_COLOR, LASER_COLOR};
pub use strokes::{FILL_ALPHA, HIGHLIGHT_ALPHA, HIGHLIGHT_WIDTH_FACTOR, draw_stroke, view_transform};

use anyhow::Context;
use std::io::Cursor;
use std::time::Instant;
use tiny_skia::{Pixmap, PixmapPaint, Transform};

use crate::canvas::Viewport;
use crate::drawing::{Stroke, StrokeId, combined_bbox};
use crate::geometry::BBox;
use crate::settings::{GridType, Theme};
use crate::state::TextSession;
use crate::text_renderer::FontBook;
use crate::trail::Trail;

/// Opacity of strokes marked for erasing.
pub const PENDING_ERASE_OPACITY: f32 = 0.3;
const TRAIL_WIDTH: f32 = 6.0;

/// Everything the renderer needs to paint one frame.
pub struct Scene<'a> {
    pub strokes: &'a [Stroke],
    pub view: Viewport,
    pub theme: Theme,
    pub grid: GridType,
    /// The stroke under construction; painted uncached on top.
    pub in_progress: Option<StrokeId>,
    /// A text stroke currently open in the editor; not painted.
    pub hidden: Option<StrokeId>,
    /// Set while erasing. Bypasses the stroke cache.
    pub pending_erase: Option<&'a [StrokeId]>,
    pub selection: &'a [StrokeId],
    pub selection_handles: bool,
    pub select_box: Option<BBox>,
    pub text: Option<&'a TextSession>,
    pub erase_trail: &'a Trail,
    pub laser_trail: &'a Trail,
    pub now: Instant,
}

/// Inputs the completed-strokes bitmap depends on. Attribute edits do not
/// change it; those call [`Renderer::invalidate_strokes`].
#[derive(Debug, Clone, PartialEq)]
struct StrokeCacheKey {
    count: usize,
    view: Viewport,
    width: u32,
    height: u32,
    theme: Theme,
    excluded: [Option<StrokeId>; 2],
}

pub struct Renderer {
    pub fonts: FontBook,
    grid_cache: Option<(GridCacheKey, Pixmap)>,
    stroke_cache: Option<(StrokeCacheKey, Pixmap)>,
    stroke_rebuilds: usize,
}

impl Renderer {
    pub fn new(fonts: FontBook) -> Self {
        Self {
            fonts,
            grid_cache: None,
            stroke_cache: None,
            stroke_rebuilds: 0,
        }
    }

    pub fn invalidate_strokes(&mut self) {
        self.stroke_cache = None;
    }

    pub fn invalidate_grid(&mut self) {
        self.grid_cache = None;
    }

    /// How many times the completed-strokes bitmap has been rebuilt.
    pub fn stroke_rebuilds(&self) -> usize {
        self.stroke_rebuilds
    }

    pub fn render(&mut self, pixmap: &mut Pixmap, scene: &Scene<'_>) {
        let (width, height) = (pixmap.width(), pixmap.height());
        pixmap.fill(paint_color(scene.theme.background(), 1.0));

        if scene.grid != GridType::Off {
            let key = GridCacheKey {
                view: scene.view,
                width,
                height,
                theme: scene.theme,
                grid: scene.grid,
            };
            if self.grid_cache.as_ref().is_none_or(|(k, _)| *k != key) {
                log::debug!("render: rebuilding grid cache");
                self.grid_cache = render_grid(&key).map(|p| (key, p));
            }
            if let Some((_, grid)) = &self.grid_cache {
                pixmap.draw_pixmap(0, 0, grid.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
            }
        }

        let ts = view_transform(&scene.view);
        let skip = |s: &Stroke| Some(s.id) == scene.in_progress || Some(s.id) == scene.hidden;

        match scene.pending_erase {
            Some(pending) => {
                // Two passes so marked strokes read as faded regardless of order.
                for stroke in scene.strokes.iter().filter(|s| !skip(s) && !pending.contains(&s.id)) {
                    draw_stroke(pixmap, stroke, &self.fonts, ts, 1.0);
                }
                for stroke in scene.strokes.iter().filter(|s| !skip(s) && pending.contains(&s.id)) {
                    draw_stroke(pixmap, stroke, &self.fonts, ts, PENDING_ERASE_OPACITY);
                }
            }
            None => {
                let key = StrokeCacheKey {
                    count: scene.strokes.len(),
                    view: scene.view,
                    width,
                    height,
                    theme: scene.theme,
                    excluded: [scene.in_progress, scene.hidden],
                };
                if self.stroke_cache.as_ref().is_none_or(|(k, _)| *k != key) {
                    self.stroke_cache = Pixmap::new(width, height).map(|mut layer| {
                        for stroke in scene.strokes.iter().filter(|s| !skip(s)) {
                            draw_stroke(&mut layer, stroke, &self.fonts, ts, 1.0);
                        }
                        (key, layer)
                    });
                    self.stroke_rebuilds += 1;
                    log::debug!("render: rebuilt stroke cache ({} strokes)", scene.strokes.len());
                }
                if let Some((_, layer)) = &self.stroke_cache {
                    pixmap.draw_pixmap(0, 0, layer.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
                }
            }
        }

        if let Some(stroke) = scene
            .in_progress
            .and_then(|id| scene.strokes.iter().find(|s| s.id == id))
        {
            draw_stroke(pixmap, stroke, &self.fonts, ts, 1.0);
        }

        let accent = scene.theme.accent();
        let selected: Vec<&Stroke> = scene
            .strokes
            .iter()
            .filter(|s| scene.selection.contains(&s.id) && !skip(s))
            .collect();
        if selected.len() == 1 {
            let b = selected[0].bbox(&self.fonts);
            overlay::draw_selection(pixmap, b, &scene.view, accent, scene.selection_handles);
        } else if selected.len() > 1 {
            for stroke in &selected {
                overlay::draw_selection(pixmap, stroke.bbox(&self.fonts), &scene.view, accent, false);
            }
            if let Some(group) = combined_bbox(selected.iter().copied(), &self.fonts) {
                overlay::draw_selection(pixmap, group.padded(4.0), &scene.view, accent, false);
            }
        }
        if let Some(b) = scene.select_box {
            overlay::draw_select_box(pixmap, b, &scene.view, accent);
        }

        if let Some(session) = scene.text {
            overlay::draw_text_session(pixmap, session, &self.fonts, ts);
        }

        let erase = scene.erase_trail.segments(scene.now);
        overlay::draw_trail(pixmap, &erase, &scene.view, ERASE_TRAIL_COLOR, TRAIL_WIDTH);
        let laser = scene.laser_trail.segments(scene.now);
        overlay::draw_trail(pixmap, &laser, &scene.view, LASER_COLOR, TRAIL_WIDTH);
    }
}

/// Flat export: the current view on the theme background, grid omitted.
pub fn export_view(
    strokes: &[Stroke],
    view: Viewport,
    width: u32,
    height: u32,
    theme: Theme,
    fonts: &FontBook,
) -> anyhow::Result<Pixmap> {
    let mut pixmap = Pixmap::new(width, height).context("export size must be non-zero")?;
    pixmap.fill(paint_color(theme.background(), 1.0));
    let ts = view_transform(&view);
    for stroke in strokes {
        draw_stroke(&mut pixmap, stroke, fonts, ts, 1.0);
    }
    Ok(pixmap)
}

/// Transparent export: all content at 100% zoom, cropped with `padding`
/// world units of margin.
pub fn export_content(strokes: &[Stroke], fonts: &FontBook, padding: f32) -> anyhow::Result<Pixmap> {
    let bounds = combined_bbox(strokes, fonts)
        .context("nothing to export")?
        .padded(padding);
    let width = bounds.w.ceil().max(1.0) as u32;
    let height = bounds.h.ceil().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height).context("export is too large")?;
    let ts = Transform::from_translate(-bounds.x, -bounds.y);
    for stroke in strokes {
        draw_stroke(&mut pixmap, stroke, fonts, ts, 1.0);
    }
    Ok(pixmap)
}

/// PNG bytes of a pixmap, un-premultiplying alpha on the way out.
pub fn encode_png(pixmap: &Pixmap) -> anyhow::Result<Vec<u8>> {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let image = image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .context("pixel buffer does not match image size")?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .context("encoding png")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use std::time::Duration;

    struct Fixture {
        strokes: Vec<Stroke>,
        erase: Trail,
        laser: Trail,
    }

    impl Fixture {
        fn new() -> Self {
            let mut a = Stroke::freehand(vec![Point::new(5.0, 5.0), Point::new(40.0, 40.0)], "#ff0000", 4.0);
            a.id = StrokeId::new();
            let mut b = Stroke::shape(
                crate::drawing::ShapeKind::Rectangle,
                Point::new(10.0, 10.0),
                Point::new(50.0, 30.0),
                "#0000ff",
                2.0,
            );
            b.id = StrokeId::new();
            Self {
                strokes: vec![a, b],
                erase: Trail::new(8, Duration::from_millis(300)),
                laser: Trail::new(8, Duration::from_millis(300)),
            }
        }

        fn scene(&self) -> Scene<'_> {
            Scene {
                strokes: &self.strokes,
                view: Viewport::default(),
                theme: Theme::Light,
                grid: GridType::Dot,
                in_progress: None,
                hidden: None,
                pending_erase: None,
                selection: &[],
                selection_handles: false,
                select_box: None,
                text: None,
                erase_trail: &self.erase,
                laser_trail: &self.laser,
                now: Instant::now(),
            }
        }
    }

    #[test]
    fn stroke_cache_rebuilds_only_on_key_change() {
        let mut fixture = Fixture::new();
        let mut renderer = Renderer::new(FontBook::new());
        let mut pixmap = Pixmap::new(64, 64).unwrap();

        renderer.render(&mut pixmap, &fixture.scene());
        renderer.render(&mut pixmap, &fixture.scene());
        assert_eq!(renderer.stroke_rebuilds(), 1);

        fixture.strokes[0].color = "#00ff00".into();
        renderer.render(&mut pixmap, &fixture.scene());
        assert_eq!(renderer.stroke_rebuilds(), 1);
        renderer.invalidate_strokes();
        renderer.render(&mut pixmap, &fixture.scene());
        assert_eq!(renderer.stroke_rebuilds(), 2);

        fixture.strokes.pop();
        renderer.render(&mut pixmap, &fixture.scene());
        assert_eq!(renderer.stroke_rebuilds(), 3);
    }

    #[test]
    fn erasing_bypasses_cache() {
        let fixture = Fixture::new();
        let mut renderer = Renderer::new(FontBook::new());
        let mut pixmap = Pixmap::new(64, 64).unwrap();
        let pending = [fixture.strokes[0].id];
        let scene = Scene {
            pending_erase: Some(&pending),
            ..fixture.scene()
        };
        renderer.render(&mut pixmap, &scene);
        assert_eq!(renderer.stroke_rebuilds(), 0);
    }

    #[test]
    fn transparent_export_crops_to_content() {
        let fixture = Fixture::new();
        let pixmap = export_content(&fixture.strokes, &FontBook::new(), 20.0).unwrap();
        // Ink spans x 3..50 and y 3..42 once half the line width is included.
        assert_eq!(pixmap.width(), 87);
        assert_eq!(pixmap.height(), 79);
        assert_eq!(pixmap.pixels()[0].alpha(), 0);
        assert!(export_content(&[], &FontBook::new(), 20.0).is_err());
    }

    #[test]
    fn png_has_signature() {
        let fixture = Fixture::new();
        let pixmap = export_view(&fixture.strokes, Viewport::default(), 32, 32, Theme::Dark, &FontBook::new()).unwrap();
        let png = encode_png(&pixmap).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
