use egui::{Pos2, Rect};
use log::{debug, info};

use crate::error::{CanvasError, CanvasResult};
use crate::layer::{ContentType, LayerId};
use crate::manager::LayerManager;
use crate::stroke::{PressurePoint, StrokeStyle};
use crate::tool::{Tool, ToolSettings};

/// What an active stroke does with each pointer sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeMode {
    /// Appends points carrying the captured style
    Paint(StrokeStyle),
    /// Splits strokes at points within `radius` of the pointer
    Erase { radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    StrokeActive {
        /// Target layer, tracked by id so reordering mid-stroke is harmless
        layer_id: LayerId,
        mode: StrokeMode,
        /// The gesture's history entry has been recorded
        snapshotted: bool,
    },
}

/// Turns pointer gestures into stroke geometry on the current layer.
///
/// `Idle -> StrokeActive` on pointer-down, back to `Idle` on pointer-up.
/// A stroke records at most one history entry, taken with its first change,
/// so one undo removes one whole gesture regardless of how many samples it
/// had and a gesture that changes nothing leaves history untouched.
/// Every sample leaves the point stream valid, so a pointer-up that never
/// arrives costs nothing but an unterminated final stroke.
#[derive(Debug, Default)]
pub struct StrokeCapture {
    state: CaptureState,
}

impl StrokeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CaptureState::StrokeActive { .. })
    }

    /// Starts a stroke at `pos`.
    ///
    /// Paint strokes must start inside `canvas_rect`; the eraser may start
    /// anywhere. Returns `Ok(false)` when the pointer-down was ignored.
    pub fn begin(
        &mut self,
        manager: &mut LayerManager,
        settings: &ToolSettings,
        pos: Pos2,
        canvas_rect: Rect,
    ) -> CanvasResult<bool> {
        if self.is_active() {
            debug!("Pointer-down while a stroke is active; closing the previous stroke");
            self.end(manager)?;
        }
        if !settings.tool.is_eraser() && !canvas_rect.contains(pos) {
            return Ok(false);
        }

        let current = manager.current_layer();
        match current.content_type() {
            ContentType::Image => {
                let name = format!("{} Drawing", current.name);
                info!("Current layer holds an image; drawing on new layer '{}'", name);
                manager.add_layer(Some(&name));
            }
            ContentType::Drawing if current.locked => {
                return Err(CanvasError::LayerLocked(manager.current_index()));
            }
            ContentType::Drawing => {}
        }

        let mode = match settings.tool {
            Tool::Brush(_) => StrokeMode::Paint(settings.stroke_style()),
            Tool::Eraser => StrokeMode::Erase {
                radius: settings.eraser_radius(),
            },
        };
        self.state = CaptureState::StrokeActive {
            layer_id: manager.current_layer().id,
            mode,
            snapshotted: false,
        };
        debug!("Stroke started: {:?}", mode);

        if let StrokeMode::Erase { radius } = mode {
            let index = manager.current_index();
            self.erase(manager, index, pos, radius)?;
        }
        Ok(true)
    }

    /// Feeds one pointer-move sample. Returns whether the layer changed.
    pub fn extend(
        &mut self,
        manager: &mut LayerManager,
        pos: Pos2,
        pressure: f32,
        canvas_rect: Rect,
    ) -> CanvasResult<bool> {
        let CaptureState::StrokeActive { layer_id, mode, snapshotted } = self.state else {
            return Ok(false);
        };
        let Some(index) = manager.stack().index_of(layer_id) else {
            debug!("Stroke target {} disappeared; abandoning stroke", layer_id);
            self.state = CaptureState::Idle;
            return Ok(false);
        };

        match mode {
            StrokeMode::Paint(style) => {
                if !canvas_rect.contains(pos) {
                    return Ok(false);
                }
                let point = PressurePoint::new(pos, pressure, style);
                manager.edit_payload(index, !snapshotted, |content| {
                    content.drawing_mut()?.push_point(point);
                    Ok(true)
                })?;
                self.mark_snapshotted();
                Ok(true)
            }
            StrokeMode::Erase { radius } => self.erase(manager, index, pos, radius),
        }
    }

    /// Closes the active stroke; a no-op while idle
    pub fn end(&mut self, manager: &mut LayerManager) -> CanvasResult<()> {
        let CaptureState::StrokeActive { layer_id, mode, .. } = std::mem::take(&mut self.state) else {
            return Ok(());
        };
        let Some(index) = manager.stack().index_of(layer_id) else {
            return Ok(());
        };
        if let StrokeMode::Paint(_) = mode {
            manager.edit_payload(index, false, |content| Ok(content.drawing_mut()?.end_stroke()))?;
        }
        debug!("Stroke committed on layer {}", index);
        Ok(())
    }

    /// Leaves the payload, the history and the listeners alone when nothing
    /// is in reach
    fn erase(&mut self, manager: &mut LayerManager, index: usize, pos: Pos2, radius: f32) -> CanvasResult<bool> {
        let in_reach = match manager.layer(index) {
            Some(layer) => layer.content.drawing()?.any_within(pos, radius),
            None => false,
        };
        if !in_reach {
            return Ok(false);
        }
        let snapshotted = matches!(self.state, CaptureState::StrokeActive { snapshotted: true, .. });
        let changed =
            manager.edit_payload(index, !snapshotted, |content| Ok(content.drawing_mut()?.erase_at(pos, radius)))?;
        self.mark_snapshotted();
        Ok(changed)
    }

    fn mark_snapshotted(&mut self) {
        if let CaptureState::StrokeActive { snapshotted, .. } = &mut self.state {
            *snapshotted = true;
        }
    }
}
