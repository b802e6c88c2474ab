mod app;
mod app_state;
pub mod canvas;
pub mod drawing;
pub mod error;
mod event_handler;
pub mod events;
pub mod file_format;
pub mod geometry;
pub mod gestures;
pub mod history;
pub mod persistence;
pub mod render;
pub mod rough;
mod selection;
pub mod settings;
pub mod state;
pub mod text_input;
pub mod text_renderer;
pub mod trail;
mod update_logic;

// Re-export the main public interface
pub use app::run;
pub use app_state::Engine;
pub use canvas::{CanvasIndex, Viewport};
pub use drawing::{ShapeKind, Stroke, StrokeId};
pub use error::ImportError;
pub use events::{Command, EngineEvent};
pub use geometry::{BBox, Point};
pub use settings::{EngineConfig, Settings, Theme};
pub use state::{PointerButton, PointerId, PointerInput, PointerKind, Tool};
pub use update_logic::RedrawScheduler;
