use egui::{Pos2, Rect};
use log::debug;

use crate::compositor::{Overlay, ViewTransform};
use crate::error::CanvasResult;
use crate::manager::LayerManager;
use crate::settings::CanvasSettings;
use crate::tool::{BrushKind, ImageInteraction, StrokeCapture, ToolMode, ToolSettings};

/// A pointer sample delivered by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Button or stylus pressed
    Down { pos: Pos2, pressure: f32 },
    /// Pointer moved, pressed or not
    Move { pos: Pos2, pressure: f32 },
    /// Button or stylus released
    Up { pos: Pos2 },
}

impl PointerEvent {
    pub fn pos(&self) -> Pos2 {
        match *self {
            PointerEvent::Down { pos, .. } | PointerEvent::Move { pos, .. } | PointerEvent::Up { pos } => pos,
        }
    }

    /// Same event with its position mapped from screen into canvas space
    pub fn to_canvas(self, view: &ViewTransform) -> Self {
        match self {
            PointerEvent::Down { pos, pressure } => PointerEvent::Down {
                pos: view.to_canvas(pos),
                pressure,
            },
            PointerEvent::Move { pos, pressure } => PointerEvent::Move {
                pos: view.to_canvas(pos),
                pressure,
            },
            PointerEvent::Up { pos } => PointerEvent::Up { pos: view.to_canvas(pos) },
        }
    }
}

/// Routes pointer events to stroke capture or image interaction, depending
/// on the tool mode.
///
/// Positions given to [`CanvasSession::handle`] are in canvas space.
#[derive(Debug)]
pub struct CanvasSession {
    pub settings: ToolSettings,
    capture: StrokeCapture,
    images: ImageInteraction,
    canvas_rect: Rect,
    last_pos: Option<Pos2>,
}

impl CanvasSession {
    pub fn new(canvas: &CanvasSettings) -> Self {
        Self {
            settings: ToolSettings::default(),
            capture: StrokeCapture::new(),
            images: ImageInteraction::new(),
            canvas_rect: canvas.canvas_rect(),
            last_pos: None,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.images.mode()
    }

    pub fn capture(&self) -> &StrokeCapture {
        &self.capture
    }

    pub fn images(&self) -> &ImageInteraction {
        &self.images
    }

    pub fn canvas_rect(&self) -> Rect {
        self.canvas_rect
    }

    /// Feeds one event. Returns whether the document changed.
    pub fn handle(&mut self, manager: &mut LayerManager, event: PointerEvent) -> CanvasResult<bool> {
        self.last_pos = Some(event.pos());
        if self.images.mode().is_image_mode() {
            return match event {
                PointerEvent::Down { pos, .. } => self.images.pointer_down(manager, pos),
                PointerEvent::Move { pos, .. } => self.images.pointer_move(manager, pos),
                PointerEvent::Up { .. } => self.images.pointer_up(manager),
            };
        }
        match event {
            PointerEvent::Down { pos, .. } => self.capture.begin(manager, &self.settings, pos, self.canvas_rect),
            PointerEvent::Move { pos, pressure } => self.capture.extend(manager, pos, pressure, self.canvas_rect),
            PointerEvent::Up { .. } => {
                let was_active = self.capture.is_active();
                self.capture.end(manager)?;
                Ok(was_active)
            }
        }
    }

    /// Like [`CanvasSession::handle`], for events in screen space
    pub fn handle_screen(
        &mut self,
        manager: &mut LayerManager,
        event: PointerEvent,
        view: &ViewTransform,
    ) -> CanvasResult<bool> {
        self.handle(manager, event.to_canvas(view))
    }

    /// Choosing any brush returns to drawing
    pub fn choose_brush(&mut self, manager: &mut LayerManager, kind: BrushKind) -> CanvasResult<()> {
        self.settings.choose_brush(kind);
        self.enter_draw(manager)
    }

    pub fn choose_eraser(&mut self, manager: &mut LayerManager) -> CanvasResult<()> {
        self.settings.choose_eraser();
        self.enter_draw(manager)
    }

    pub fn set_mode(&mut self, manager: &mut LayerManager, mode: ToolMode) -> CanvasResult<ToolMode> {
        self.capture.end(manager)?;
        self.images.set_mode(mode, manager)
    }

    fn enter_draw(&mut self, manager: &mut LayerManager) -> CanvasResult<()> {
        self.set_mode(manager, ToolMode::Draw)?;
        Ok(())
    }

    pub fn undo(&mut self, manager: &mut LayerManager) -> CanvasResult<()> {
        self.capture.end(manager)?;
        manager.undo()?;
        self.images.validate(manager);
        Ok(())
    }

    pub fn redo(&mut self, manager: &mut LayerManager) -> CanvasResult<()> {
        self.capture.end(manager)?;
        manager.redo()?;
        self.images.validate(manager);
        Ok(())
    }

    /// Cursor feedback to draw above the layers
    pub fn overlay(&self) -> Option<Overlay> {
        if !self.mode().is_draw() || !self.settings.tool.is_eraser() {
            return None;
        }
        let center = self.last_pos?;
        debug!("Eraser cursor at {:?}", center);
        Some(Overlay::EraserCursor {
            center,
            radius: self.settings.eraser_radius(),
        })
    }
}
