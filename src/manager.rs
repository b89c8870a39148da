use log::{debug, info, warn};

use crate::error::{CanvasError, CanvasResult};
use crate::event::{ChangeEvent, EventBus, EventHandler, LayerProperty};
use crate::history::{HistoryEntry, HistoryManager};
use crate::layer::{BlendMode, ContentType, ImageHandle, Layer, LayerContent, LayerId};
use crate::settings::CanvasSettings;
use crate::stack::LayerStack;

/// Ticket for an image decode that is in flight.
///
/// The stack may change while decoding runs, so the result is only applied
/// if the layer with this id still exists and still carries `expected`
/// content when the decode completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingImage {
    pub layer_id: LayerId,
    pub expected: ContentType,
}

/// Owns the canonical layer stack and its history.
///
/// Every committed mutation fires a [`ChangeEvent`]; rejected calls return an
/// error and leave both the stack and the history untouched.
#[derive(Debug)]
pub struct LayerManager {
    stack: LayerStack,
    history: HistoryManager,
    event_bus: EventBus,
}

impl LayerManager {
    pub fn new(base_layer_name: &str) -> Self {
        Self::from_stack(LayerStack::new(base_layer_name), HistoryManager::default())
    }

    pub fn with_settings(settings: &CanvasSettings) -> Self {
        Self::from_stack(
            LayerStack::new(&settings.base_layer_name),
            HistoryManager::new(settings.history_limit),
        )
    }

    pub fn from_stack(stack: LayerStack, history: HistoryManager) -> Self {
        stack.assert_invariants();
        Self {
            stack,
            history,
            event_bus: EventBus::new(),
        }
    }

    /// Register a change-notification handler
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.event_bus.subscribe(handler);
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Always `false`: the stack never becomes empty
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.stack.get(index)
    }

    pub fn current_index(&self) -> usize {
        self.stack.current_index()
    }

    pub fn current_layer(&self) -> &Layer {
        self.stack.current_layer()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn emit(&self, event: ChangeEvent) {
        self.event_bus.emit(event);
    }

    /// Pushes a snapshot of the whole stack and clears the redo set
    pub fn save_state(&mut self) {
        self.history.save_state(&self.stack);
    }

    pub fn undo(&mut self) -> CanvasResult<()> {
        self.history.undo(&mut self.stack)?;
        self.stack.assert_invariants();
        self.emit(ChangeEvent::Undone);
        Ok(())
    }

    pub fn redo(&mut self) -> CanvasResult<()> {
        self.history.redo(&mut self.stack)?;
        self.stack.assert_invariants();
        self.emit(ChangeEvent::Redone);
        Ok(())
    }

    /// Appends an empty drawing layer on top and makes it current
    pub fn add_layer(&mut self, name: Option<&str>) -> LayerId {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("Layer {}", self.stack.len() + 1),
        };
        self.push_layer(Layer::new(&name))
    }

    /// Appends an image layer on top and makes it current
    pub fn add_image_layer(&mut self, name: &str, handle: ImageHandle) -> LayerId {
        self.push_layer(Layer::new_image(name, handle))
    }

    fn push_layer(&mut self, layer: Layer) -> LayerId {
        self.save_state();
        let id = layer.id;
        info!("Adding layer '{}' ({})", layer.name, id);
        self.stack.push(layer);
        self.emit(ChangeEvent::LayerAdded {
            index: self.stack.current_index(),
            id,
        });
        id
    }

    /// Copies a layer (with a new id) directly above the original
    pub fn duplicate_layer(&mut self, index: usize) -> CanvasResult<LayerId> {
        let copy = self.existing(index)?.duplicate();
        self.save_state();
        let id = copy.id;
        self.stack.insert(index + 1, copy);
        self.emit(ChangeEvent::LayerAdded { index: index + 1, id });
        Ok(id)
    }

    /// Removes a layer; the last remaining layer is protected
    pub fn delete_layer(&mut self, index: usize) -> CanvasResult<()> {
        self.existing(index)?;
        if self.stack.len() == 1 {
            warn!("Refusing to delete the last layer");
            return Err(CanvasError::LastLayerProtected);
        }
        self.save_state();
        let removed = self.stack.remove(index)?;
        info!("Deleted layer '{}' ({})", removed.name, removed.id);
        self.emit(ChangeEvent::LayerRemoved {
            index,
            id: removed.id,
        });
        Ok(())
    }

    pub fn select_layer(&mut self, index: usize) -> CanvasResult<()> {
        self.existing(index)?;
        if self.stack.current_index() != index {
            self.stack.set_current_index(index)?;
            self.emit(ChangeEvent::CurrentLayerChanged { index });
        }
        Ok(())
    }

    /// Reorders a layer; the moved layer becomes current
    pub fn move_layer(&mut self, from: usize, to: usize) -> CanvasResult<()> {
        self.existing(from)?;
        self.existing(to)?;
        if from == to {
            return Ok(());
        }
        self.save_state();
        self.stack.move_layer(from, to)?;
        self.emit(ChangeEvent::LayerMoved { from, to });
        Ok(())
    }

    pub fn toggle_visibility(&mut self, index: usize) -> CanvasResult<()> {
        self.update_layer(index, LayerProperty::Visibility, |layer| {
            layer.visible = !layer.visible;
        })
    }

    pub fn set_locked(&mut self, index: usize, locked: bool) -> CanvasResult<()> {
        self.update_layer(index, LayerProperty::Locked, |layer| layer.locked = locked)
    }

    /// Sets the layer opacity, clamped into `[0, 1]`
    pub fn set_opacity(&mut self, index: usize, opacity: f32) -> CanvasResult<()> {
        self.update_layer(index, LayerProperty::Opacity, |layer| layer.set_opacity(opacity))
    }

    pub fn set_blend_mode(&mut self, index: usize, blend_mode: BlendMode) -> CanvasResult<()> {
        self.update_layer(index, LayerProperty::BlendMode, |layer| {
            layer.blend_mode = blend_mode;
        })
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> CanvasResult<()> {
        self.update_layer(index, LayerProperty::Name, |layer| layer.set_name(name.to_string()))
    }

    /// Switches the payload tag; the new payload starts out empty
    pub fn set_content_type(&mut self, index: usize, content_type: ContentType) -> CanvasResult<()> {
        if self.existing(index)?.content_type() == content_type {
            return Ok(());
        }
        self.update_layer(index, LayerProperty::ContentType, |layer| {
            layer.set_content_type(content_type);
        })
    }

    /// In-place property edit; never snapshots
    fn update_layer(
        &mut self,
        index: usize,
        property: LayerProperty,
        update: impl FnOnce(&mut Layer),
    ) -> CanvasResult<()> {
        update(self.stack.get_mut(index)?);
        debug!("Layer {} {:?} changed", index, property);
        self.emit(ChangeEvent::LayerChanged { index, property });
        Ok(())
    }

    /// Replaces a layer's payload.
    ///
    /// With `save_state`, the pre-mutation stack is snapshotted first so a
    /// single undo restores the old payload.
    pub fn set_payload(&mut self, index: usize, payload: LayerContent, save_state: bool) -> CanvasResult<()> {
        self.existing(index)?;
        if save_state {
            self.save_state();
        }
        self.stack.get_mut(index)?.content = payload;
        self.emit(ChangeEvent::ContentChanged { index });
        Ok(())
    }

    /// Edits a layer's payload in place.
    ///
    /// `edit` reports whether it changed anything; no notification fires
    /// when it did not. With `save_state`, the pre-edit stack is recorded
    /// only once `edit` succeeds, and a failing `edit` is rolled back.
    pub fn edit_payload(
        &mut self,
        index: usize,
        save_state: bool,
        edit: impl FnOnce(&mut LayerContent) -> CanvasResult<bool>,
    ) -> CanvasResult<bool> {
        self.existing(index)?;
        let before = save_state.then(|| HistoryEntry::capture(&self.stack));
        let changed = match edit(&mut self.stack.get_mut(index)?.content) {
            Ok(changed) => changed,
            Err(err) => {
                if let Some(before) = before {
                    self.stack = before.stack().clone();
                }
                debug!("Payload edit on layer {} rejected: {}", index, err);
                return Err(err);
            }
        };
        if let Some(before) = before {
            self.history.record(before);
        }
        if changed {
            self.emit(ChangeEvent::ContentChanged { index });
        }
        Ok(changed)
    }

    /// Drops stroke runs that cannot render. No history entry is made since
    /// the rendered result is unchanged.
    pub fn compact_layer(&mut self, index: usize) -> CanvasResult<bool> {
        let needs_compaction = {
            let mut scratch = self.existing(index)?.content.drawing()?.clone();
            scratch.compact()
        };
        if !needs_compaction {
            return Ok(false);
        }
        self.edit_payload(index, false, |content| Ok(content.drawing_mut()?.compact()))
    }

    /// Starts tracking an image decode destined for the layer at `index`
    pub fn begin_image_load(&self, index: usize) -> CanvasResult<PendingImage> {
        let layer = self.existing(index)?;
        layer.content.image()?;
        Ok(PendingImage {
            layer_id: layer.id,
            expected: ContentType::Image,
        })
    }

    /// Applies a finished decode, if its target is still valid.
    ///
    /// The target is looked up by id, not index, so a deleted layer whose
    /// index was reused is never written to.
    pub fn finish_image_load(&mut self, pending: PendingImage, handle: ImageHandle) -> CanvasResult<()> {
        let index = self
            .stack
            .index_of(pending.layer_id)
            .ok_or(CanvasError::StaleImageTarget)?;
        if self.stack.get(index).map(Layer::content_type) != Some(pending.expected) {
            warn!("Dropping decoded image: layer {} changed content type", pending.layer_id);
            return Err(CanvasError::StaleImageTarget);
        }
        info!(
            "Attaching {}x{} image to layer {}",
            handle.width(),
            handle.height(),
            pending.layer_id
        );
        self.edit_payload(index, true, |content| {
            let image = content.image_mut()?;
            image.handle = Some(handle);
            image.is_selected = false;
            Ok(true)
        })?;
        Ok(())
    }

    /// Swaps in a whole new stack and forgets the history
    pub fn replace_document(&mut self, stack: LayerStack) {
        stack.assert_invariants();
        self.stack = stack;
        self.history.clear();
        self.emit(ChangeEvent::DocumentReplaced);
    }

    fn existing(&self, index: usize) -> CanvasResult<&Layer> {
        self.stack.get(index).ok_or_else(|| {
            debug!("Ignoring out-of-range layer index {}", index);
            CanvasError::InvalidIndex {
                index,
                len: self.stack.len(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;

    #[test]
    fn test_rejected_calls_do_not_notify() {
        let mut manager = LayerManager::new("Background");
        let log = EventLog::new();
        manager.subscribe(log.handler());

        assert!(manager.delete_layer(0).is_err());
        assert!(manager.select_layer(3).is_err());
        assert!(manager.undo().is_err());
        assert!(manager.set_opacity(9, 0.5).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_property_setters_do_not_snapshot() {
        let mut manager = LayerManager::new("Background");
        manager.toggle_visibility(0).unwrap();
        manager.set_opacity(0, 0.25).unwrap();
        manager.set_blend_mode(0, BlendMode::Screen).unwrap();
        manager.set_content_type(0, ContentType::Image).unwrap();
        assert!(!manager.can_undo());
        let layer = manager.current_layer();
        assert!(!layer.visible);
        assert_eq!(layer.opacity(), 0.25);
        assert_eq!(layer.blend_mode, BlendMode::Screen);
        assert_eq!(layer.content_type(), ContentType::Image);
    }

    #[test]
    fn test_compact_layer_without_history() {
        use crate::stroke::{DrawingContent, PressurePoint, StrokeEntry, StrokeStyle};
        let mut manager = LayerManager::new("Background");
        let lone = StrokeEntry::Point(PressurePoint::new(egui::pos2(1.0, 1.0), 1.0, StrokeStyle::default()));
        let payload = LayerContent::Drawing(DrawingContent::from_entries(vec![lone, StrokeEntry::Sentinel]));
        manager.set_payload(0, payload, false).unwrap();

        assert!(manager.compact_layer(0).unwrap());
        assert!(manager.current_layer().content.drawing().unwrap().is_empty());
        assert!(!manager.compact_layer(0).unwrap());
        assert!(!manager.can_undo());
    }

    #[test]
    fn test_failed_edit_leaves_history_alone() {
        let mut manager = LayerManager::new("Background");
        manager.add_layer(Some("Ink"));
        manager.undo().unwrap();
        let before = manager.stack().clone();
        let log = EventLog::new();
        manager.subscribe(log.handler());

        let result = manager.edit_payload(0, true, |content| {
            content.image_mut()?.position = egui::pos2(3.0, 3.0);
            Ok(true)
        });
        assert!(matches!(result, Err(CanvasError::PayloadTypeMismatch { .. })));
        assert!(!manager.can_undo());
        assert!(manager.can_redo());
        assert_eq!(manager.stack(), &before);
        assert!(log.is_empty());
    }

    #[test]
    fn test_successful_edit_records_one_entry() {
        let mut manager = LayerManager::new("Background");
        manager.set_content_type(0, ContentType::Image).unwrap();
        let changed = manager
            .edit_payload(0, true, |content| {
                content.image_mut()?.position = egui::pos2(3.0, 3.0);
                Ok(true)
            })
            .unwrap();
        assert!(changed);
        assert_eq!(manager.history().undo_len(), 1);
        manager.undo().unwrap();
        assert_eq!(manager.current_layer().content.image().unwrap().position, egui::Pos2::ZERO);
    }

    #[test]
    fn test_replace_document_resets_history() {
        let mut manager = LayerManager::new("Background");
        manager.add_layer(Some("Ink"));
        manager.add_layer(Some("Notes"));
        manager.undo().unwrap();
        let log = EventLog::new();
        manager.subscribe(log.handler());

        manager.replace_document(LayerStack::new("Fresh"));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.current_layer().name, "Fresh");
        assert!(!manager.can_undo());
        assert!(!manager.can_redo());
        assert_eq!(log.drain(), vec![ChangeEvent::DocumentReplaced]);
    }
}
