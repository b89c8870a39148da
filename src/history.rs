use log::debug;

use crate::error::{CanvasError, CanvasResult};
use crate::stack::LayerStack;

/// Default number of undo steps kept before the oldest is dropped
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Frozen copy of the whole layer stack and its current-layer pointer.
///
/// Entries have no mutating API; the live stack can only diverge from one
/// by copy-on-write, never by writing through it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    stack: LayerStack,
}

impl HistoryEntry {
    pub fn capture(stack: &LayerStack) -> Self {
        Self {
            stack: stack.clone(),
        }
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    fn into_stack(self) -> LayerStack {
        self.stack
    }
}

/// Snapshot-based undo/redo over the whole document.
///
/// Conceptually one ordered list with a position pointer: `undo_stack` holds
/// the entries before the pointer, `redo_stack` (top = nearest) the entries
/// after it.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    limit: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryManager {
    /// Creates an empty history keeping at most `limit` undo steps
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records `live` as an undo point and forgets everything redoable
    pub fn save_state(&mut self, live: &LayerStack) {
        self.record(HistoryEntry::capture(live));
    }

    /// Pushes an entry captured earlier, e.g. before an edit that could fail
    pub fn record(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.limit {
            let overflow = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..overflow);
            debug!("History limit {} reached, dropped {} oldest entries", self.limit, overflow);
        }
    }

    /// Replaces `live` wholesale with the previous snapshot
    pub fn undo(&mut self, live: &mut LayerStack) -> CanvasResult<()> {
        let entry = self.undo_stack.pop().ok_or(CanvasError::HistoryUnderflow)?;
        self.redo_stack.push(HistoryEntry::capture(live));
        *live = entry.into_stack();
        debug!(
            "Undo: {} undo / {} redo entries left",
            self.undo_stack.len(),
            self.redo_stack.len()
        );
        Ok(())
    }

    /// Replaces `live` wholesale with the next snapshot
    pub fn redo(&mut self, live: &mut LayerStack) -> CanvasResult<()> {
        let entry = self.redo_stack.pop().ok_or(CanvasError::HistoryOverflow)?;
        self.undo_stack.push(HistoryEntry::capture(live));
        *live = entry.into_stack();
        debug!(
            "Redo: {} undo / {} redo entries left",
            self.undo_stack.len(),
            self.redo_stack.len()
        );
        Ok(())
    }

    /// Returns true if there are snapshots that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are snapshots that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Most recent undo point, if any
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.undo_stack.last()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Clear the snapshot history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use crate::stack::create_document;

    #[test]
    fn test_undo_on_empty_history_is_rejected() {
        let mut history = HistoryManager::default();
        let mut live = create_document("a");
        let before = live.clone();
        assert!(matches!(history.undo(&mut live), Err(CanvasError::HistoryUnderflow)));
        assert!(matches!(history.redo(&mut live), Err(CanvasError::HistoryOverflow)));
        assert_eq!(live, before);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = HistoryManager::default();
        let mut live = create_document("a");
        let before = live.clone();

        history.save_state(&live);
        live.push(Layer::new("b"));
        let after = live.clone();

        history.undo(&mut live).unwrap();
        assert_eq!(live, before);
        assert!(history.can_redo());

        history.redo(&mut live).unwrap();
        assert_eq!(live, after);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_save_state_clears_redo() {
        let mut history = HistoryManager::default();
        let mut live = create_document("a");
        history.save_state(&live);
        live.push(Layer::new("b"));
        history.undo(&mut live).unwrap();
        assert!(history.can_redo());

        history.save_state(&live);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest_entries() {
        let mut history = HistoryManager::new(2);
        let mut live = create_document("a");
        for i in 0..4 {
            history.save_state(&live);
            live.push(Layer::new(&format!("layer {i}")));
        }
        assert_eq!(history.undo_len(), 2);
        history.undo(&mut live).unwrap();
        history.undo(&mut live).unwrap();
        assert_eq!(live.len(), 3);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_snapshot_is_isolated_from_live_edits() {
        let mut history = HistoryManager::default();
        let mut live = create_document("a");
        history.save_state(&live);
        live.current_layer_mut().name = "changed".to_string();
        let entry = history.last_entry().unwrap();
        assert_eq!(entry.stack().current_layer().name, "a");
    }
}
