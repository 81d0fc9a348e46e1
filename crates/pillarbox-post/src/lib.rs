//! Pillarbox post-processing
//!
//! Turns dense pillar-detector outputs into oriented 3D boxes and removes
//! duplicate detections with rotated non-maximum suppression.

pub mod detection;
pub mod diagnostics;
pub mod utils;

// Re-export commonly used types
pub use detection::{
    BatchOutput, BoxDecoder, DecodeConfig, DetectionConfig, DetectionPipeline, GridConfig,
    NmsConfig, PredictionGrid, SequencePredictions,
};
pub use diagnostics::{MatchReport, flatten_boxes, match_occupancy, unflatten_rows};
pub use pillarbox_core::{AnchorPrior, BoundingBox, BoxRow, Error, OrientedRect, Result};
pub use utils::{PolygonNms, RotationalNms, rotational_nms};

/// Core traits for the post-processing stages
pub mod traits {
    use pillarbox_core::{OrientedRect, Result};

    /// Rotated-rectangle non-maximum suppression primitive.
    ///
    /// Returns the indices of the surviving rectangles, highest confidence
    /// first. Boxes below `confidence_floor` never survive; a box is suppressed
    /// when its IoU with a kept, more confident box exceeds `iou_threshold`.
    /// `rects` and `confidences` have equal length.
    pub trait RotatedNms: Send + Sync {
        fn suppress(
            &self,
            rects: &[OrientedRect],
            confidences: &[f32],
            confidence_floor: f32,
            iou_threshold: f32,
        ) -> Result<Vec<usize>>;
    }
}
