pub mod animation;
pub mod cache;
pub mod session;
pub mod viewport;

pub use animation::ViewAnimation;
pub use cache::{SessionCache, swap_stroke_colors, swap_theme_colors};
pub use session::{CANVAS_COUNT, CanvasIndex, CanvasSession};
pub use viewport::{MAX_SCALE, MIN_SCALE, Viewport};
