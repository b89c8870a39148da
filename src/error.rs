use thiserror::Error;

use crate::layer::ContentType;

/// Errors reported by the canvas core.
///
/// Every mutation that returns one of these has left the document exactly
/// as it was, so callers in an interactive loop can log and carry on.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("layer index {index} is out of range (stack has {len} layers)")]
    InvalidIndex { index: usize, len: usize },

    #[error("cannot delete the last remaining layer")]
    LastLayerProtected,

    #[error("nothing to undo")]
    HistoryUnderflow,

    #[error("nothing to redo")]
    HistoryOverflow,

    #[error("expected {expected:?} content, found {found:?}")]
    PayloadTypeMismatch {
        expected: ContentType,
        found: ContentType,
    },

    #[error("layer {0} is locked")]
    LayerLocked(usize),

    #[error("image target layer no longer exists or changed content type")]
    StaleImageTarget,

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("invalid canvas settings: {0}")]
    InvalidSettings(String),

    #[error("invalid project data: {0}")]
    InvalidProject(String),

    #[error("cannot allocate a render surface of zero size")]
    EmptySurface,

    #[error("failed to (de)serialize: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used throughout the canvas core
pub type CanvasResult<T> = Result<T, CanvasError>;
