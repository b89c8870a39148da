mod capture;
mod image_interaction;
mod mode;

pub use capture::{CaptureState, StrokeCapture, StrokeMode};
pub use image_interaction::{DragState, ImageInteraction};
pub use mode::ToolMode;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::layer::BlendMode;
use crate::stroke::{LineCap, StrokeStyle};

/// Flavours of the paint brush; each comes with its own cap/blend defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushKind {
    #[default]
    Pen,
    Marker,
    Highlighter,
}

impl BrushKind {
    pub fn default_cap(self) -> LineCap {
        match self {
            BrushKind::Pen => LineCap::Round,
            BrushKind::Marker => LineCap::Square,
            BrushKind::Highlighter => LineCap::Butt,
        }
    }

    pub fn default_blend_mode(self) -> BlendMode {
        match self {
            BrushKind::Pen | BrushKind::Marker => BlendMode::Normal,
            BrushKind::Highlighter => BlendMode::Multiply,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    Brush(BrushKind),
    Eraser,
}

impl Default for Tool {
    fn default() -> Self {
        Self::Brush(BrushKind::default())
    }
}

impl Tool {
    pub fn is_eraser(self) -> bool {
        matches!(self, Tool::Eraser)
    }
}

/// Ambient, user-editable tool state.
///
/// Strokes never read this directly: [`ToolSettings::stroke_style`] is
/// captured once at stroke start and carried by the stroke from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub tool: Tool,
    pub color: Color32,
    /// Brush width; the eraser removes points within half of it
    pub stroke_width: f32,
    pub cap: LineCap,
    pub blend_mode: BlendMode,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            color: Color32::BLACK,
            stroke_width: 4.0,
            cap: LineCap::Round,
            blend_mode: BlendMode::Normal,
        }
    }
}

impl ToolSettings {
    /// Switches to a brush and applies its cap/blend defaults
    pub fn choose_brush(&mut self, kind: BrushKind) {
        self.tool = Tool::Brush(kind);
        self.cap = kind.default_cap();
        self.blend_mode = kind.default_blend_mode();
    }

    pub fn choose_eraser(&mut self) {
        self.tool = Tool::Eraser;
    }

    /// Freezes the current settings into the style of a new stroke
    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle {
            color: self.color,
            width: self.stroke_width,
            cap: self.cap,
            blend_mode: self.blend_mode,
        }
    }

    pub fn eraser_radius(&self) -> f32 {
        self.stroke_width / 2.0
    }
}
