use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CanvasError, CanvasResult};
use crate::stroke::DrawingContent;

/// Pixel-combination function used when a layer is composited onto the
/// layers beneath it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub const ALL: [BlendMode; 16] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Hue,
        BlendMode::Saturation,
        BlendMode::Color,
        BlendMode::Luminosity,
    ];

    pub fn is_normal(self) -> bool {
        self == BlendMode::Normal
    }
}

/// A unique identifier for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag of a [`LayerContent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Drawing,
    Image,
}

// Static counter for generating unique image ids
static NEXT_IMAGE_ID: AtomicUsize = AtomicUsize::new(1);

/// Decoded, premultiplied pixels shared between every copy of a layer.
struct ImageData {
    id: usize,
    pixmap: tiny_skia::Pixmap,
}

/// Cheap-to-clone handle to a decoded raster image.
///
/// Handles are immutable, so history snapshots share them with the live
/// stack instead of copying pixels.
#[derive(Clone)]
pub struct ImageHandle(Arc<ImageData>);

impl ImageHandle {
    /// Builds a handle from straight (non-premultiplied) RGBA8 pixels
    pub fn from_rgba(image: &image::RgbaImage) -> CanvasResult<Self> {
        let (width, height) = image.dimensions();
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| CanvasError::ImageDecode(format!("invalid size {width}x{height}")))?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self(Arc::new(ImageData {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::SeqCst),
            pixmap,
        })))
    }

    /// Identity of the decoded pixels, stable across clones
    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn width(&self) -> u32 {
        self.0.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.0.pixmap.height()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32)
    }

    pub fn pixmap(&self) -> tiny_skia::PixmapRef<'_> {
        self.0.pixmap.as_ref()
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("id", &self.id())
            .field("size", &(self.width(), self.height()))
            .finish()
    }
}

/// Payload of an image layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Pixels are not part of the plain data handed to persistence;
    /// collaborators re-decode and re-attach them.
    #[serde(skip)]
    pub handle: Option<ImageHandle>,
    pub position: Pos2,
    pub scale: f32,
    pub is_selected: bool,
}

impl Default for ImageContent {
    fn default() -> Self {
        Self {
            handle: None,
            position: Pos2::ZERO,
            scale: 1.0,
            is_selected: false,
        }
    }
}

impl ImageContent {
    pub fn new(handle: ImageHandle, position: Pos2) -> Self {
        Self {
            handle: Some(handle),
            position,
            ..Self::default()
        }
    }

    /// Bounds in canvas space, or `None` while no pixels are attached
    pub fn rect(&self) -> Option<Rect> {
        self.handle
            .as_ref()
            .map(|handle| Rect::from_min_size(self.position, handle.size() * self.scale))
    }
}

/// Tagged payload of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerContent {
    Drawing(DrawingContent),
    Image(ImageContent),
}

impl Default for LayerContent {
    fn default() -> Self {
        LayerContent::Drawing(DrawingContent::default())
    }
}

impl LayerContent {
    /// Empty payload for the given tag
    pub fn default_for(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Drawing => LayerContent::Drawing(DrawingContent::default()),
            ContentType::Image => LayerContent::Image(ImageContent::default()),
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            LayerContent::Drawing(_) => ContentType::Drawing,
            LayerContent::Image(_) => ContentType::Image,
        }
    }

    pub fn drawing(&self) -> CanvasResult<&DrawingContent> {
        match self {
            LayerContent::Drawing(drawing) => Ok(drawing),
            LayerContent::Image(_) => Err(mismatch(ContentType::Drawing, ContentType::Image)),
        }
    }

    pub fn drawing_mut(&mut self) -> CanvasResult<&mut DrawingContent> {
        match self {
            LayerContent::Drawing(drawing) => Ok(drawing),
            LayerContent::Image(_) => Err(mismatch(ContentType::Drawing, ContentType::Image)),
        }
    }

    pub fn image(&self) -> CanvasResult<&ImageContent> {
        match self {
            LayerContent::Image(image) => Ok(image),
            LayerContent::Drawing(_) => Err(mismatch(ContentType::Image, ContentType::Drawing)),
        }
    }

    pub fn image_mut(&mut self) -> CanvasResult<&mut ImageContent> {
        match self {
            LayerContent::Image(image) => Ok(image),
            LayerContent::Drawing(_) => Err(mismatch(ContentType::Image, ContentType::Drawing)),
        }
    }
}

fn mismatch(expected: ContentType, found: ContentType) -> CanvasError {
    CanvasError::PayloadTypeMismatch { expected, found }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique identifier for the layer
    pub id: LayerId,
    /// Display name of the layer
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    /// Always within `[0, 1]`
    opacity: f32,
    pub blend_mode: BlendMode,
    pub content: LayerContent,
}

impl Layer {
    /// A visible, fully opaque drawing layer with no strokes
    pub fn new(name: &str) -> Self {
        Self {
            id: LayerId::new(),
            name: name.to_string(),
            visible: true,
            locked: false,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            content: LayerContent::default(),
        }
    }

    pub fn new_image(name: &str, handle: ImageHandle) -> Self {
        Self {
            content: LayerContent::Image(ImageContent::new(handle, Pos2::ZERO)),
            ..Self::new(name)
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamps into `[0, 1]`; NaN is ignored
    pub fn set_opacity(&mut self, opacity: f32) {
        if !opacity.is_nan() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content.content_type()
    }

    /// Switches the payload tag, lazily defaulting the new payload.
    ///
    /// Returns `false` if the layer already had that tag.
    pub fn set_content_type(&mut self, content_type: ContentType) -> bool {
        if self.content_type() == content_type {
            return false;
        }
        self.content = LayerContent::default_for(content_type);
        true
    }

    /// Copy with a fresh id
    pub fn duplicate(&self) -> Self {
        Self {
            id: LayerId::new(),
            name: format!("{} Copy", self.name),
            ..self.clone()
        }
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_layer_defaults() {
        let layer = Layer::new("Sketch");
        assert_eq!(layer.name, "Sketch");
        assert!(layer.visible);
        assert!(!layer.locked);
        assert_eq!(layer.opacity(), 1.0);
        assert_eq!(layer.blend_mode, BlendMode::Normal);
        assert_eq!(layer.content, LayerContent::Drawing(DrawingContent::new()));
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut layer = Layer::new("a");
        layer.set_opacity(1.5);
        assert_eq!(layer.opacity(), 1.0);
        layer.set_opacity(-0.5);
        assert_eq!(layer.opacity(), 0.0);
        layer.set_opacity(f32::NAN);
        assert_eq!(layer.opacity(), 0.0);
    }

    #[test]
    fn test_wrong_payload_read_is_guarded() {
        let mut layer = Layer::new("a");
        assert!(layer.content.image().is_err());
        assert!(layer.set_content_type(ContentType::Image));
        assert_eq!(layer.content.image().unwrap(), &ImageContent::default());
        assert!(matches!(
            layer.content.drawing(),
            Err(CanvasError::PayloadTypeMismatch {
                expected: ContentType::Drawing,
                found: ContentType::Image
            })
        ));
        assert!(!layer.set_content_type(ContentType::Image));
    }

    #[test]
    fn test_image_handle_premultiplies() {
        let image = image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 0, 0, 128]));
        let handle = ImageHandle::from_rgba(&image).unwrap();
        assert_eq!(handle.size(), Vec2::new(2.0, 1.0));
        let pixel = handle.pixmap().pixel(0, 0).unwrap();
        assert_eq!(pixel.alpha(), 128);
        assert_eq!(pixel.red(), 128);
        assert_eq!(handle.clone(), handle);
    }

    #[test]
    fn test_duplicate_gets_fresh_id() {
        let layer = Layer::new("Ink");
        let copy = layer.duplicate();
        assert_ne!(layer.id, copy.id);
        assert_eq!(copy.name, "Ink Copy");
    }
}
