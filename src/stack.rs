use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};
use crate::layer::{Layer, LayerId};

/// Ordered layers (bottom to top) plus the index of the layer being edited.
///
/// Layers are held behind `Arc` and mutated copy-on-write, so cloning a stack
/// shares every layer with the original until one side writes to it. A clone
/// is therefore an independent snapshot: nothing done to one is observable
/// through the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    layers: Vec<Arc<Layer>>,
    current_layer_index: usize,
}

/// Creates a document holding a single empty drawing layer
pub fn create_document(base_layer_name: &str) -> LayerStack {
    LayerStack::new(base_layer_name)
}

impl LayerStack {
    pub fn new(base_layer_name: &str) -> Self {
        Self {
            layers: vec![Arc::new(Layer::new(base_layer_name))],
            current_layer_index: 0,
        }
    }

    /// Builds a stack from plain layers, checking every stack invariant
    pub fn from_layers(layers: Vec<Layer>, current_layer_index: usize) -> CanvasResult<Self> {
        if layers.is_empty() {
            return Err(CanvasError::InvalidProject("no layers".to_string()));
        }
        if current_layer_index >= layers.len() {
            return Err(CanvasError::InvalidIndex {
                index: current_layer_index,
                len: layers.len(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = layers.iter().find(|layer| !seen.insert(layer.id)) {
            return Err(CanvasError::InvalidProject(format!("duplicate layer id {}", dup.id)));
        }
        Ok(Self {
            layers: layers.into_iter().map(Arc::new).collect(),
            current_layer_index,
        })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always `false`; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> impl DoubleEndedIterator<Item = &Layer> + ExactSizeIterator + '_ {
        self.layers.iter().map(|layer| layer.as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index).map(|layer| layer.as_ref())
    }

    /// Mutable access, detaching the layer from any snapshot sharing it
    pub fn get_mut(&mut self, index: usize) -> CanvasResult<&mut Layer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .map(Arc::make_mut)
            .ok_or(CanvasError::InvalidIndex { index, len })
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    pub fn find(&self, id: LayerId) -> Option<&Layer> {
        self.index_of(id).and_then(|index| self.get(index))
    }

    pub fn current_index(&self) -> usize {
        self.current_layer_index
    }

    pub fn current_layer(&self) -> &Layer {
        &self.layers[self.current_layer_index]
    }

    pub fn current_layer_mut(&mut self) -> &mut Layer {
        Arc::make_mut(&mut self.layers[self.current_layer_index])
    }

    pub fn set_current_index(&mut self, index: usize) -> CanvasResult<()> {
        self.check_index(index)?;
        self.current_layer_index = index;
        Ok(())
    }

    /// Appends on top and makes the new layer current
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(Arc::new(layer));
        self.current_layer_index = self.layers.len() - 1;
    }

    /// Inserts at `index` (clamped to the top) and makes it current
    pub fn insert(&mut self, index: usize, layer: Layer) {
        let index = index.min(self.layers.len());
        self.layers.insert(index, Arc::new(layer));
        self.current_layer_index = index;
    }

    /// Removes a layer, keeping the current index in range.
    ///
    /// The sole remaining layer can never be removed.
    pub fn remove(&mut self, index: usize) -> CanvasResult<Arc<Layer>> {
        self.check_index(index)?;
        if self.layers.len() == 1 {
            return Err(CanvasError::LastLayerProtected);
        }
        let removed = self.layers.remove(index);
        if self.current_layer_index >= self.layers.len() {
            self.current_layer_index = self.layers.len() - 1;
        }
        self.assert_invariants();
        Ok(removed)
    }

    /// Moves a layer to a new position; the current index follows it
    pub fn move_layer(&mut self, from: usize, to: usize) -> CanvasResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.current_layer_index = to;
        Ok(())
    }

    pub fn check_index(&self, index: usize) -> CanvasResult<()> {
        if index < self.layers.len() {
            Ok(())
        } else {
            Err(CanvasError::InvalidIndex {
                index,
                len: self.layers.len(),
            })
        }
    }

    /// Plain copies of the layers, for hand-off to persistence
    pub fn to_layers(&self) -> Vec<Layer> {
        self.layers.iter().map(|layer| layer.as_ref().clone()).collect()
    }

    /// Whether both stacks hold the very same allocation for `index`
    pub fn shares_layer_with(&self, other: &LayerStack, index: usize) -> bool {
        match (self.layers.get(index), other.layers.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn assert_invariants(&self) {
        assert!(!self.layers.is_empty(), "layer stack must never be empty");
        debug_assert!(self.current_layer_index < self.layers.len());
    }
}
