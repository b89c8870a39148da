use crate::layer::LayerId;

/// What kind of layer property a [`ChangeEvent::LayerChanged`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerProperty {
    Visibility,
    Locked,
    Opacity,
    BlendMode,
    ContentType,
    Name,
}

/// Fired after every committed mutation of the layer stack.
///
/// Re-render and auto-save collaborators subscribe to these; the core never
/// fires one for a rejected (no-op) call.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    LayerAdded {
        index: usize,
        id: LayerId,
    },
    LayerRemoved {
        index: usize,
        id: LayerId,
    },
    LayerMoved {
        from: usize,
        to: usize,
    },
    CurrentLayerChanged {
        index: usize,
    },
    LayerChanged {
        index: usize,
        property: LayerProperty,
    },
    /// The drawing or image payload of a layer was replaced or edited
    ContentChanged {
        index: usize,
    },
    Undone,
    Redone,
    /// The whole document was swapped in, e.g. from persistence
    DocumentReplaced,
}
