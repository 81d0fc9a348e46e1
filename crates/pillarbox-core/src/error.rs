//! See [`Error`].

use thiserror::Error;

/// Error types shared by the decoding and suppression stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("`{name}` must lie strictly between 0 and 1, got {value}")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("batch has {boxes} box lists but {confidences} confidence lists")]
    BatchLengthMismatch { boxes: usize, confidences: usize },

    #[error("batch element {index} has {boxes} boxes but {confidences} confidences")]
    LengthMismatch {
        index: usize,
        boxes: usize,
        confidences: usize,
    },

    #[error("`{field}` has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("class score vectors must hold at least one class")]
    EmptyClassScores,

    #[error("no anchor prior for anchor index {index} ({available} anchors configured)")]
    AnchorLookup { index: usize, available: usize },

    #[error("invalid bounding box: {0}")]
    InvalidBox(String),

    #[error("cannot select the top {requested} cells of a grid with {available} cells")]
    InvalidCount { requested: usize, available: usize },

    #[error("rotated geometry backend failed: {0}")]
    Geometry(String),
}

/// Type alias for [`Result<T, Error>`].
pub type Result<T> = std::result::Result<T, Error>;

/// Checks that `value` lies in the open interval (0, 1).
pub fn ensure_unit_interval(name: &'static str, value: f32) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidThreshold { name, value })
    }
}
