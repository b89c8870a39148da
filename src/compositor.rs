use egui::{Color32, Pos2, Rect, Vec2};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};

use crate::error::{CanvasError, CanvasResult};
use crate::geometry::{HANDLE_RADIUS, calculate_bounds, corners};
use crate::layer::{BlendMode, ImageContent, Layer, LayerContent};
use crate::settings::{Background, CanvasSettings};
use crate::stack::LayerStack;
use crate::stroke::{DrawingContent, LineCap, PressurePoint};

const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 64.0;

const BORDER_COLOR: Color32 = Color32::from_gray(128);
const SELECTION_COLOR: Color32 = Color32::from_rgb(0, 120, 215);

/// Upper bound on checkerboard squares along either axis
const MAX_CHECKER_TILES: f32 = 256.0;

/// Pan and zoom of the canvas inside the viewport.
///
/// `screen = pan + canvas * zoom`: the pan is applied on top of the scale, so
/// a drag of Δ screen pixels moves the canvas origin by exactly Δ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn to_screen(&self, pos: Pos2) -> Pos2 {
        (pos.to_vec2() * self.zoom + self.pan).to_pos2()
    }

    pub fn to_canvas(&self, pos: Pos2) -> Pos2 {
        ((pos.to_vec2() - self.pan) / self.zoom).to_pos2()
    }

    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max))
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Zooms by `factor`, keeping the canvas point under `anchor` in place
    pub fn zoom_about(&mut self, anchor: Pos2, factor: f32) {
        if !(factor > 0.0) {
            return;
        }
        let fixed = self.to_canvas(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = anchor.to_vec2() - fixed.to_vec2() * self.zoom;
    }

    pub fn to_skia(&self) -> Transform {
        Transform::from_translate(self.pan.x, self.pan.y).pre_scale(self.zoom, self.zoom)
    }
}

/// Transient feedback drawn above every layer
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// A stroke still being captured by the host, drawn like a segment
    Stroke(Vec<PressurePoint>),
    /// Reach of the eraser around the pointer, in canvas space
    EraserCursor { center: Pos2, radius: f32 },
}

fn map_blend_mode(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::Normal => tiny_skia::BlendMode::SourceOver,
        BlendMode::Multiply => tiny_skia::BlendMode::Multiply,
        BlendMode::Screen => tiny_skia::BlendMode::Screen,
        BlendMode::Overlay => tiny_skia::BlendMode::Overlay,
        BlendMode::Darken => tiny_skia::BlendMode::Darken,
        BlendMode::Lighten => tiny_skia::BlendMode::Lighten,
        BlendMode::ColorDodge => tiny_skia::BlendMode::ColorDodge,
        BlendMode::ColorBurn => tiny_skia::BlendMode::ColorBurn,
        BlendMode::HardLight => tiny_skia::BlendMode::HardLight,
        BlendMode::SoftLight => tiny_skia::BlendMode::SoftLight,
        BlendMode::Difference => tiny_skia::BlendMode::Difference,
        BlendMode::Exclusion => tiny_skia::BlendMode::Exclusion,
        BlendMode::Hue => tiny_skia::BlendMode::Hue,
        BlendMode::Saturation => tiny_skia::BlendMode::Saturation,
        BlendMode::Color => tiny_skia::BlendMode::Color,
        BlendMode::Luminosity => tiny_skia::BlendMode::Luminosity,
    }
}

fn map_line_cap(cap: LineCap) -> tiny_skia::LineCap {
    match cap {
        LineCap::Butt => tiny_skia::LineCap::Butt,
        LineCap::Round => tiny_skia::LineCap::Round,
        LineCap::Square => tiny_skia::LineCap::Square,
    }
}

fn solid_paint(color: Color32) -> Paint<'static> {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(rect.min.x, rect.min.y, rect.max.x, rect.max.y)
}

/// Renders a layer stack into a pixel surface the size of the viewport.
///
/// Rendering is a pure function of its inputs: the same stack, view and
/// settings always produce the same pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    width: u32,
    height: u32,
}

impl Compositor {
    /// A compositor for a `width` x `height` viewport, in pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn render(
        &self,
        stack: &LayerStack,
        view: &ViewTransform,
        settings: &CanvasSettings,
        overlay: Option<&Overlay>,
    ) -> CanvasResult<Pixmap> {
        settings.validate()?;
        let mut surface = self.surface()?;
        let transform = view.to_skia();
        let canvas_rect = settings.canvas_rect();
        let clip = self.canvas_clip(canvas_rect, transform)?;

        self.paint_background(&mut surface, settings, transform, &clip);
        self.paint_border(&mut surface, view.rect_to_screen(canvas_rect));

        for (index, layer) in stack.layers().enumerate() {
            if !layer.visible {
                trace!("Skipping hidden layer {}", index);
                continue;
            }
            if layer.opacity() < 1.0 || !layer.blend_mode.is_normal() {
                let mut group = self.surface()?;
                self.paint_layer(&mut group, layer, view, canvas_rect, &clip);
                let paint = PixmapPaint {
                    opacity: layer.opacity(),
                    blend_mode: map_blend_mode(layer.blend_mode),
                    ..Default::default()
                };
                surface.draw_pixmap(0, 0, group.as_ref(), &paint, Transform::identity(), None);
            } else {
                self.paint_layer(&mut surface, layer, view, canvas_rect, &clip);
            }

            // Selection chrome sits above the composited layer at full strength.
            if let Some(rect) = selected_rect(&layer.content) {
                self.paint_selection(&mut surface, view.rect_to_screen(rect));
            }
        }

        if let Some(overlay) = overlay {
            self.paint_overlay(&mut surface, overlay, view, &clip);
        }
        debug!("Rendered {} layers at {}x{}", stack.len(), self.width, self.height);
        Ok(surface)
    }

    fn surface(&self) -> CanvasResult<Pixmap> {
        Pixmap::new(self.width, self.height).ok_or(CanvasError::EmptySurface)
    }

    /// Everything drawn in canvas space is confined to the canvas rectangle
    fn canvas_clip(&self, canvas_rect: Rect, transform: Transform) -> CanvasResult<Mask> {
        let mut mask = Mask::new(self.width, self.height).ok_or(CanvasError::EmptySurface)?;
        if let Some(rect) = skia_rect(canvas_rect) {
            mask.fill_path(&PathBuilder::from_rect(rect), FillRule::Winding, false, transform);
        }
        Ok(mask)
    }

    fn paint_background(&self, surface: &mut Pixmap, settings: &CanvasSettings, transform: Transform, clip: &Mask) {
        let Some(rect) = skia_rect(settings.canvas_rect()) else {
            return;
        };
        match settings.background {
            Background::Solid(color) => {
                surface.fill_rect(rect, &solid_paint(color), transform, Some(clip));
            }
            Background::Transparent => {
                surface.fill_rect(rect, &solid_paint(Color32::WHITE), transform, Some(clip));
                let alpha = (settings.checker_pattern_opacity * 255.0).round() as u8;
                let dark = solid_paint(Color32::from_black_alpha(alpha));
                let size = settings
                    .checker_square_size
                    .max(settings.width.max(settings.height) / MAX_CHECKER_TILES);
                let columns = (settings.width / size).ceil() as u32;
                let rows = (settings.height / size).ceil() as u32;
                for row in 0..rows {
                    for column in (row % 2..columns).step_by(2) {
                        let square = tiny_skia::Rect::from_xywh(column as f32 * size, row as f32 * size, size, size);
                        if let Some(square) = square {
                            surface.fill_rect(square, &dark, transform, Some(clip));
                        }
                    }
                }
            }
        }
    }

    /// One screen pixel wide whatever the zoom
    fn paint_border(&self, surface: &mut Pixmap, screen_rect: Rect) {
        let Some(rect) = skia_rect(screen_rect) else {
            return;
        };
        let stroke = Stroke {
            width: 1.0,
            ..Default::default()
        };
        surface.stroke_path(
            &PathBuilder::from_rect(rect),
            &solid_paint(BORDER_COLOR),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    fn paint_layer(&self, target: &mut Pixmap, layer: &Layer, view: &ViewTransform, canvas_rect: Rect, clip: &Mask) {
        match &layer.content {
            LayerContent::Drawing(drawing) => self.paint_strokes(target, drawing, view.to_skia(), canvas_rect, clip),
            LayerContent::Image(image) => self.paint_image(target, image, view.to_skia(), clip),
        }
    }

    fn paint_strokes(
        &self,
        target: &mut Pixmap,
        drawing: &DrawingContent,
        transform: Transform,
        canvas_rect: Rect,
        clip: &Mask,
    ) {
        for segment in drawing.segments().filter(|segment| segment.is_drawable()) {
            let max_width = segment.points().map(|p| p.style.width).fold(0.0, f32::max);
            let visible = calculate_bounds(segment.points().map(|p| p.position), max_width)
                .is_some_and(|bounds| bounds.intersects(canvas_rect));
            if !visible {
                continue;
            }

            let points: Vec<_> = segment.points().collect();
            self.paint_pieces(target, &points, transform, Some(clip));
        }
    }

    /// Line pieces between consecutive points, each in the style of its
    /// first point
    fn paint_pieces(&self, target: &mut Pixmap, points: &[&PressurePoint], transform: Transform, clip: Option<&Mask>) {
        for pair in points.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let mut builder = PathBuilder::new();
            builder.move_to(from.position.x, from.position.y);
            builder.line_to(to.position.x, to.position.y);
            let Some(path) = builder.finish() else {
                continue;
            };
            let mut paint = solid_paint(from.style.color);
            paint.blend_mode = map_blend_mode(from.style.blend_mode);
            let stroke = Stroke {
                width: from.style.width,
                line_cap: map_line_cap(from.style.cap),
                ..Default::default()
            };
            target.stroke_path(&path, &paint, &stroke, transform, clip);
        }
    }

    fn paint_image(&self, target: &mut Pixmap, image: &ImageContent, transform: Transform, clip: &Mask) {
        let Some(handle) = &image.handle else {
            return;
        };
        let transform = transform
            .pre_translate(image.position.x, image.position.y)
            .pre_scale(image.scale, image.scale);
        let paint = PixmapPaint {
            quality: tiny_skia::FilterQuality::Bilinear,
            ..Default::default()
        };
        target.draw_pixmap(0, 0, handle.pixmap(), &paint, transform, Some(clip));
    }

    /// Outline and corner handles, constant in screen space
    fn paint_selection(&self, target: &mut Pixmap, screen_rect: Rect) {
        let outline_paint = solid_paint(SELECTION_COLOR);
        if let Some(rect) = skia_rect(screen_rect) {
            let outline = Stroke {
                width: 2.0,
                ..Default::default()
            };
            target.stroke_path(&PathBuilder::from_rect(rect), &outline_paint, &outline, Transform::identity(), None);
        }

        let handle_fill = solid_paint(Color32::WHITE);
        let handle_stroke = Stroke {
            width: 1.0,
            ..Default::default()
        };
        for corner in corners(screen_rect) {
            let Some(circle) = PathBuilder::from_circle(corner.x, corner.y, HANDLE_RADIUS) else {
                continue;
            };
            target.fill_path(&circle, &handle_fill, FillRule::Winding, Transform::identity(), None);
            target.stroke_path(&circle, &outline_paint, &handle_stroke, Transform::identity(), None);
        }
    }

    fn paint_overlay(&self, target: &mut Pixmap, overlay: &Overlay, view: &ViewTransform, clip: &Mask) {
        match overlay {
            Overlay::Stroke(points) => {
                let points: Vec<_> = points.iter().collect();
                self.paint_pieces(target, &points, view.to_skia(), Some(clip));
            }
            Overlay::EraserCursor { center, radius } => {
                let center = view.to_screen(*center);
                let Some(circle) = PathBuilder::from_circle(center.x, center.y, (*radius * view.zoom).max(1.0)) else {
                    return;
                };
                let stroke = Stroke {
                    width: 1.0,
                    ..Default::default()
                };
                target.stroke_path(&circle, &solid_paint(BORDER_COLOR), &stroke, Transform::identity(), None);
            }
        }
    }
}

fn selected_rect(content: &LayerContent) -> Option<Rect> {
    match content {
        LayerContent::Image(image) if image.is_selected => image.rect(),
        _ => None,
    }
}
