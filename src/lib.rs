#![warn(clippy::all, rust_2018_idioms)]

pub mod compositor;
pub mod error;
pub mod event;
pub mod geometry;
pub mod history;
pub mod image_loader;
pub mod input;
pub mod layer;
pub mod manager;
pub mod persistence;
pub mod settings;
pub mod stack;
pub mod stroke;
pub mod tool;

pub use compositor::{Compositor, Overlay, ViewTransform};
pub use error::{CanvasError, CanvasResult};
pub use event::{ChangeEvent, EventBus, EventHandler, EventLog, LayerProperty};
pub use history::{HistoryEntry, HistoryManager};
pub use image_loader::{ImageCrateDecoder, ImageDecoder};
pub use input::{CanvasSession, PointerEvent};
pub use layer::{BlendMode, ContentType, ImageContent, ImageHandle, Layer, LayerContent, LayerId};
pub use manager::{LayerManager, PendingImage};
pub use persistence::{JsonFileStore, MemoryProjectStore, ProjectData, ProjectStore};
pub use settings::{Background, CanvasSettings};
pub use stack::{LayerStack, create_document};
pub use stroke::{DrawingContent, LineCap, PressurePoint, StrokeEntry, StrokeStyle};
pub use tool::{BrushKind, StrokeCapture, Tool, ToolMode, ToolSettings};
