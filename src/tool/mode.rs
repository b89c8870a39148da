/// Which interaction pointer events drive.
///
/// ```text
///         choose select mode        tap an image
///   Draw ────────────────────► SelectImage ───────────► MoveImage
///    ▲                             ▲                        │
///    │                             └──── no selection ──────┤
///    └── choose brush/eraser, tap same image, tap empty ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// Pointer events paint or erase strokes
    #[default]
    Draw,
    /// Waiting for a tap on an image
    SelectImage,
    /// An image is selected and drags move it
    MoveImage,
}

impl ToolMode {
    /// Mode actually entered when asking for `target`.
    ///
    /// `MoveImage` needs a selection to move; without one it falls back to
    /// `SelectImage`.
    pub fn resolve(target: ToolMode, has_selection: bool) -> ToolMode {
        match target {
            ToolMode::MoveImage if !has_selection => ToolMode::SelectImage,
            other => other,
        }
    }

    pub fn is_draw(self) -> bool {
        matches!(self, ToolMode::Draw)
    }

    /// Returns true for the two image sub-modes
    pub fn is_image_mode(self) -> bool {
        matches!(self, ToolMode::SelectImage | ToolMode::MoveImage)
    }
}
