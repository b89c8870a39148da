use egui::Pos2;
use log::debug;

use crate::error::{CanvasError, CanvasResult};
use crate::geometry::image_at;
use crate::layer::{ContentType, LayerId};
use crate::manager::LayerManager;
use crate::tool::ToolMode;

/// Tracking for one pointer gesture over the selected image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub layer_id: LayerId,
    /// Image position when the pointer went down
    pub initial_position: Pos2,
    pub drag_start: Pos2,
    pub moved: bool,
    /// The pointer-down of this gesture is what selected the image
    pub just_selected: bool,
}

/// Selection and movement of image layers.
///
/// Selecting or deselecting only flips the `is_selected` flag and makes no
/// history entry. A drag snapshots once, on its first movement.
#[derive(Debug, Default)]
pub struct ImageInteraction {
    mode: ToolMode,
    selected: Option<LayerId>,
    drag: Option<DragState>,
}

impl ImageInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.selected
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Enters `target`, which may resolve to a different mode.
    ///
    /// Leaving for `Draw` drops any selection.
    pub fn set_mode(&mut self, target: ToolMode, manager: &mut LayerManager) -> CanvasResult<ToolMode> {
        self.drag = None;
        if target.is_draw() {
            self.deselect(manager)?;
        }
        self.mode = ToolMode::resolve(target, self.selected.is_some());
        debug!("Tool mode: {:?}", self.mode);
        Ok(self.mode)
    }

    /// Handles a pointer-down in either image mode. Returns whether the
    /// document changed.
    pub fn pointer_down(&mut self, manager: &mut LayerManager, pos: Pos2) -> CanvasResult<bool> {
        if !self.mode.is_image_mode() {
            return Ok(false);
        }
        let Some((index, layer_id)) = image_at(manager.stack(), pos) else {
            debug!("Tap on empty canvas; leaving image mode");
            let changed = self.deselect(manager)?;
            self.mode = ToolMode::Draw;
            return Ok(changed);
        };

        let mut changed = false;
        let just_selected = self.selected != Some(layer_id);
        if just_selected {
            changed |= self.deselect(manager)?;
            changed |= manager.edit_payload(index, false, |content| {
                let image = content.image_mut()?;
                let was_selected = std::mem::replace(&mut image.is_selected, true);
                Ok(!was_selected)
            })?;
            self.selected = Some(layer_id);
            self.mode = ToolMode::MoveImage;
            debug!("Selected image layer {}", layer_id);
        }

        let initial_position = manager
            .layer(index)
            .map(|layer| layer.content.image().map(|image| image.position))
            .transpose()?
            .unwrap_or(Pos2::ZERO);
        self.drag = Some(DragState {
            layer_id,
            initial_position,
            drag_start: pos,
            moved: false,
            just_selected,
        });
        Ok(changed)
    }

    /// Moves the image under an active drag
    pub fn pointer_move(&mut self, manager: &mut LayerManager, pos: Pos2) -> CanvasResult<bool> {
        let Some(mut drag) = self.drag else {
            return Ok(false);
        };
        let Some(index) = manager.stack().index_of(drag.layer_id) else {
            debug!("Dragged layer {} disappeared", drag.layer_id);
            self.drag = None;
            return Ok(false);
        };
        if pos == drag.drag_start && !drag.moved {
            return Ok(false);
        }
        if manager.layer(index).is_some_and(|layer| layer.locked) {
            return Err(CanvasError::LayerLocked(index));
        }

        let position = drag.initial_position + (pos - drag.drag_start);
        let result = manager.edit_payload(index, !drag.moved, |content| {
            let image = content.image_mut()?;
            if image.position == position {
                return Ok(false);
            }
            image.position = position;
            Ok(true)
        });
        match result {
            Ok(changed) => {
                drag.moved = true;
                self.drag = Some(drag);
                Ok(changed)
            }
            Err(err) => {
                self.drag = None;
                Err(err)
            }
        }
    }

    /// Ends the gesture. A tap on the already selected image deselects it.
    pub fn pointer_up(&mut self, manager: &mut LayerManager) -> CanvasResult<bool> {
        let Some(drag) = self.drag.take() else {
            return Ok(false);
        };
        if drag.moved || drag.just_selected {
            return Ok(false);
        }
        debug!("Second tap on image layer {}; deselecting", drag.layer_id);
        let changed = self.deselect(manager)?;
        self.mode = ToolMode::Draw;
        Ok(changed)
    }

    /// Drops a selection whose layer vanished or stopped being an image,
    /// e.g. after an undo
    pub fn validate(&mut self, manager: &LayerManager) {
        let Some(id) = self.selected else {
            return;
        };
        let still_selected = manager.stack().find(id).is_some_and(|layer| {
            layer.content_type() == ContentType::Image
                && layer.content.image().is_ok_and(|image| image.is_selected)
        });
        if !still_selected {
            debug!("Selected layer {} no longer valid", id);
            self.selected = None;
            self.drag = None;
            self.mode = ToolMode::resolve(self.mode, false);
        }
    }

    fn deselect(&mut self, manager: &mut LayerManager) -> CanvasResult<bool> {
        let Some(id) = self.selected.take() else {
            return Ok(false);
        };
        let Some(index) = manager.stack().index_of(id) else {
            return Ok(false);
        };
        if manager.layer(index).map(|layer| layer.content_type()) != Some(ContentType::Image) {
            return Ok(false);
        }
        manager.edit_payload(index, false, |content| {
            let image = content.image_mut()?;
            Ok(std::mem::replace(&mut image.is_selected, false))
        })
    }
}
