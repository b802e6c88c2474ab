use tiny_skia::{Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use super::color::paint_color;
use crate::canvas::Viewport;
use crate::settings::{GridType, Theme};

/// Finest grid spacing in world units; each coarser level is `LEVEL_RATIO` times wider.
pub const BASE_SPACING: f32 = 20.0;
pub const LEVEL_RATIO: u32 = 5;
const LEVELS: u32 = 4;
/// On-screen spacing (px) where a level starts to appear and where it is fully opaque.
const FADE_IN: (f32, f32) = (6.0, 18.0);

/// Inputs that decide what the grid bitmap looks like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCacheKey {
    pub view: Viewport,
    pub width: u32,
    pub height: u32,
    pub theme: Theme,
    pub grid: GridType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Level {
    spacing: f32,
    alpha: f32,
    visible_coarser: bool,
}

fn levels(scale: f32) -> Vec<Level> {
    let mut out: Vec<Level> = (0..LEVELS)
        .map(|k| {
            let spacing = BASE_SPACING * (LEVEL_RATIO.pow(k)) as f32;
            let on_screen = spacing * scale;
            let t = ((on_screen - FADE_IN.0) / (FADE_IN.1 - FADE_IN.0)).clamp(0.0, 1.0);
            Level {
                spacing,
                alpha: t,
                visible_coarser: false,
            }
        })
        .collect();
    for k in 0..out.len().saturating_sub(1) {
        out[k].visible_coarser = out[k + 1].alpha > 0.0;
    }
    out.retain(|l| l.alpha > 0.0);
    out
}

/// Paints the grid for `key` into a transparent bitmap the size of the canvas.
pub fn render_grid(key: &GridCacheKey) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(key.width.max(1), key.height.max(1))?;
    if key.grid == GridType::Off {
        return Some(pixmap);
    }
    let view = key.view;
    let world = view.visible_world(key.width as f32, key.height as f32);

    for level in levels(view.scale) {
        let sp = level.spacing;
        let (i0, i1) = ((world.x / sp).floor() as i64, (world.right() / sp).ceil() as i64);
        let (j0, j1) = ((world.y / sp).floor() as i64, (world.bottom() / sp).ceil() as i64);
        let mut paint = Paint::default();
        paint.set_color(paint_color(key.theme.grid_color(), level.alpha));
        paint.anti_alias = true;

        match key.grid {
            GridType::Dot => {
                let r = (1.0 + (sp / BASE_SPACING).log(LEVEL_RATIO as f32) * 0.5).min(2.5);
                let step = LEVEL_RATIO as i64;
                for i in i0..=i1 {
                    for j in j0..=j1 {
                        if level.visible_coarser && i % step == 0 && j % step == 0 {
                            continue;
                        }
                        let p = view.world_to_screen(crate::geometry::Point::new(
                            i as f32 * sp,
                            j as f32 * sp,
                        ));
                        if let Some(rect) = Rect::from_xywh(p.x - r, p.y - r, r * 2.0, r * 2.0) {
                            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
                        }
                    }
                }
            }
            GridType::Square => {
                let mut pb = PathBuilder::new();
                for i in i0..=i1 {
                    let x = i as f32 * sp * view.scale + view.x;
                    pb.move_to(x, 0.0);
                    pb.line_to(x, key.height as f32);
                }
                for j in j0..=j1 {
                    let y = j as f32 * sp * view.scale + view.y;
                    pb.move_to(0.0, y);
                    pb.line_to(key.width as f32, y);
                }
                if let Some(path) = pb.finish() {
                    let stroke = Stroke {
                        width: 1.0,
                        ..Default::default()
                    };
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
            GridType::Off => {}
        }
    }
    Some(pixmap)
}
