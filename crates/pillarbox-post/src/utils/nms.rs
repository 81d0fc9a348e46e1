//! Rotational non-maximum suppression utilities

use super::geometry::rotated_iou;
use crate::detection::config::NmsConfig;
use crate::traits::RotatedNms;
use pillarbox_core::{BoundingBox, Error, OrientedRect, Result};

/// Greedy rotated NMS on polygon IoU.
///
/// Boxes under the confidence floor are dropped, the rest are visited in
/// descending confidence (ties keep input order) and kept when their IoU with
/// every already kept box is at most the IoU threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonNms;

impl RotatedNms for PolygonNms {
    fn suppress(
        &self,
        rects: &[OrientedRect],
        confidences: &[f32],
        confidence_floor: f32,
        iou_threshold: f32,
    ) -> Result<Vec<usize>> {
        if rects.len() != confidences.len() {
            return Err(Error::LengthMismatch {
                index: 0,
                boxes: rects.len(),
                confidences: confidences.len(),
            });
        }

        let mut order: Vec<usize> = (0..rects.len())
            .filter(|&i| confidences[i] >= confidence_floor)
            .collect();
        order.sort_by(|&a, &b| confidences[b].total_cmp(&confidences[a]));

        let iou_threshold = f64::from(iou_threshold);
        let mut keep: Vec<usize> = Vec::new();

        for candidate in order {
            let overlaps_kept = keep
                .iter()
                .any(|&kept| rotated_iou(&rects[kept], &rects[candidate]) > iou_threshold);

            if !overlaps_kept {
                keep.push(candidate);
            }
        }

        Ok(keep)
    }
}

/// Batched rotational NMS with validated thresholds
#[derive(Debug, Clone)]
pub struct RotationalNms<B = PolygonNms> {
    config: NmsConfig,
    backend: B,
}

impl RotationalNms<PolygonNms> {
    /// Create with the default polygon backend
    pub fn new(config: NmsConfig) -> Result<Self> {
        Self::with_backend(config, PolygonNms)
    }
}

impl<B: RotatedNms> RotationalNms<B> {
    /// Create with a custom geometry backend
    pub fn with_backend(config: NmsConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &NmsConfig {
        &self.config
    }

    /// Suppress each batch element, returning the surviving rectangles.
    pub fn apply(
        &self,
        batch_rects: &[Vec<OrientedRect>],
        batch_confidences: &[Vec<f32>],
    ) -> Result<Vec<Vec<OrientedRect>>> {
        let kept = self.keep_indices(batch_rects, batch_confidences)?;

        Ok(batch_rects
            .iter()
            .zip(kept)
            .map(|(rects, indices)| indices.into_iter().map(|i| rects[i]).collect())
            .collect())
    }

    /// Suppress full boxes, scoring each by its own confidence.
    pub fn apply_boxes(&self, batch: &[Vec<BoundingBox>]) -> Result<Vec<Vec<BoundingBox>>> {
        let batch_rects: Vec<Vec<OrientedRect>> = batch
            .iter()
            .map(|boxes| boxes.iter().map(BoundingBox::rotated_rect).collect())
            .collect();
        let batch_confidences: Vec<Vec<f32>> = batch
            .iter()
            .map(|boxes| boxes.iter().map(BoundingBox::confidence).collect())
            .collect();

        let kept = self.keep_indices(&batch_rects, &batch_confidences)?;

        Ok(batch
            .iter()
            .zip(kept)
            .map(|(boxes, indices)| indices.into_iter().map(|i| boxes[i]).collect())
            .collect())
    }

    fn keep_indices(
        &self,
        batch_rects: &[Vec<OrientedRect>],
        batch_confidences: &[Vec<f32>],
    ) -> Result<Vec<Vec<usize>>> {
        validate_batch(batch_rects, batch_confidences)?;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            batch_rects
                .par_iter()
                .zip(batch_confidences.par_iter())
                .enumerate()
                .map(|(index, (rects, confidences))| self.suppress_one(index, rects, confidences))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            batch_rects
                .iter()
                .zip(batch_confidences)
                .enumerate()
                .map(|(index, (rects, confidences))| self.suppress_one(index, rects, confidences))
                .collect()
        }
    }

    fn suppress_one(
        &self,
        index: usize,
        rects: &[OrientedRect],
        confidences: &[f32],
    ) -> Result<Vec<usize>> {
        let kept = self.backend.suppress(
            rects,
            confidences,
            self.config.confidence_floor,
            self.config.iou_threshold,
        )?;
        tracing::debug!(
            batch_index = index,
            candidates = rects.len(),
            kept = kept.len(),
            "rotational nms"
        );
        Ok(kept)
    }
}

/// Apply rotational NMS with the default backend
pub fn rotational_nms(
    batch_rects: &[Vec<OrientedRect>],
    batch_confidences: &[Vec<f32>],
    config: &NmsConfig,
) -> Result<Vec<Vec<OrientedRect>>> {
    RotationalNms::new(*config)?.apply(batch_rects, batch_confidences)
}

fn validate_batch(batch_rects: &[Vec<OrientedRect>], batch_confidences: &[Vec<f32>]) -> Result<()> {
    if batch_rects.len() != batch_confidences.len() {
        return Err(Error::BatchLengthMismatch {
            boxes: batch_rects.len(),
            confidences: batch_confidences.len(),
        });
    }

    for (index, (rects, confidences)) in batch_rects.iter().zip(batch_confidences).enumerate() {
        if rects.len() != confidences.len() {
            return Err(Error::LengthMismatch {
                index,
                boxes: rects.len(),
                confidences: confidences.len(),
            });
        }
    }

    Ok(())
}
