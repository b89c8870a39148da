use egui::{Color32, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};
use crate::history::DEFAULT_HISTORY_LIMIT;

/// How the area under the canvas rectangle is filled before layers are drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Background {
    Solid(Color32),
    /// Rendered as a checkerboard
    Transparent,
}

impl Default for Background {
    fn default() -> Self {
        Background::Solid(Color32::WHITE)
    }
}

/// Read-only per-render canvas parameters.
///
/// Supplied by the host (or loaded from JSON); any missing field falls back
/// to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: f32,
    pub height: f32,
    pub background: Background,
    pub checker_square_size: f32,
    pub checker_pattern_opacity: f32,
    /// Maximum number of undo steps kept
    pub history_limit: usize,
    /// Name given to the single layer of a new document
    pub base_layer_name: String,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
            background: Background::default(),
            checker_square_size: 10.0,
            checker_pattern_opacity: 0.2,
            history_limit: DEFAULT_HISTORY_LIMIT,
            base_layer_name: "Background".to_string(),
        }
    }
}

impl CanvasSettings {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Parses and validates settings from JSON
    pub fn from_json_str(json: &str) -> CanvasResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> CanvasResult<()> {
        if !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()) {
            return Err(CanvasError::InvalidSettings(format!(
                "canvas size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.checker_square_size > 0.0) {
            return Err(CanvasError::InvalidSettings(format!(
                "checker square size must be positive, got {}",
                self.checker_square_size
            )));
        }
        if !(0.0..=1.0).contains(&self.checker_pattern_opacity) {
            return Err(CanvasError::InvalidSettings(format!(
                "checker opacity must be within [0, 1], got {}",
                self.checker_pattern_opacity
            )));
        }
        if self.history_limit == 0 {
            return Err(CanvasError::InvalidSettings(
                "history limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// The canvas rectangle in canvas space, anchored at the origin
    pub fn canvas_rect(&self) -> Rect {
        Rect::from_min_size(egui::Pos2::ZERO, self.size())
    }
}
