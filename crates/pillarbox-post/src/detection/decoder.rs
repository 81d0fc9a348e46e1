//! Anchor-relative box decoding
//!
//! Inverts the pillar target encoding: position offsets are scaled by the
//! anchor's planar diagonal (height for z) and added to the cell origin, sizes
//! are log-scale ratios against the anchor extents, yaw is an additive offset.

use super::config::DecodeConfig;
use super::grid::PredictionGrid;
use ndarray::{Array2, ArrayView1};
use pillarbox_core::{AnchorPrior, BoundingBox, Error, Result};

/// Turns dense prediction grids into sparse oriented boxes
#[derive(Debug, Clone)]
pub struct BoxDecoder {
    config: DecodeConfig,
}

impl BoxDecoder {
    /// Create new decoder
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode one box per cell whose occupancy reaches the threshold.
    ///
    /// Boxes come out in row-major `(row, column, anchor)` order.
    pub fn decode(&self, grid: &PredictionGrid<'_>) -> Result<Vec<BoundingBox>> {
        let threshold = self.config.occupancy_threshold;
        let mut boxes = Vec::new();

        for ((row, column, anchor_index), &occupancy) in grid.occupancy.indexed_iter() {
            let selected = occupancy >= threshold;
            if !selected {
                continue;
            }

            let anchor = self.anchor(anchor_index)?;
            let bbox = self.decode_cell(grid, (row, column, anchor_index), anchor, occupancy);

            if self.config.strict {
                if let Err(err) = bbox.validate(self.config.num_classes) {
                    tracing::warn!(row, column, anchor_index, "rejecting decoded box: {err}");
                    return Err(err);
                }
            }

            boxes.push(bbox);
        }

        tracing::debug!(
            selected = boxes.len(),
            cells = grid.occupancy.len(),
            threshold,
            "decoded boxes"
        );

        Ok(boxes)
    }

    /// Decode, also returning the boxes as an `(N, 10)` array of rows.
    pub fn decode_with_rows(
        &self,
        grid: &PredictionGrid<'_>,
    ) -> Result<(Vec<BoundingBox>, Array2<f32>)> {
        let boxes = self.decode(grid)?;
        let rows = Array2::from(boxes.iter().map(BoundingBox::to_row).collect::<Vec<_>>());
        Ok((boxes, rows))
    }

    /// Decode every batch element independently.
    pub fn decode_batch(&self, batch: &[PredictionGrid<'_>]) -> Result<Vec<Vec<BoundingBox>>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            batch.par_iter().map(|grid| self.decode(grid)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            batch.iter().map(|grid| self.decode(grid)).collect()
        }
    }

    fn anchor(&self, index: usize) -> Result<&AnchorPrior> {
        self.config.anchors.get(index).ok_or(Error::AnchorLookup {
            index,
            available: self.config.anchors.len(),
        })
    }

    fn decode_cell(
        &self,
        grid: &PredictionGrid<'_>,
        (row, column, anchor_index): (usize, usize, usize),
        anchor: &AnchorPrior,
        occupancy: f32,
    ) -> BoundingBox {
        let cell = [row, column, anchor_index];
        let position = |axis: usize| grid.position[[row, column, anchor_index, axis]];
        let size = |axis: usize| grid.size[[row, column, anchor_index, axis]];

        let diagonal = anchor.diagonal();
        let (origin_x, origin_y) = self.config.grid.cell_origin(row, column);

        let center = [
            position(0) * diagonal + origin_x,
            position(1) * diagonal + origin_y,
            position(2) * anchor.height + anchor.z_offset,
        ];
        let extents = [
            size(0).exp() * anchor.length,
            size(1).exp() * anchor.width,
            size(2).exp() * anchor.height,
        ];

        let yaw = grid.angle[cell] + anchor.yaw_offset;
        let heading = grid.heading[cell].round_ties_even();
        let class_id = argmax(
            grid.class_scores
                .slice(ndarray::s![row, column, anchor_index, ..]),
        );

        BoundingBox::new(center, extents, yaw, heading, class_id, occupancy)
    }
}

/// Index of the first maximum; NaN scores never win.
fn argmax(scores: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (index, &score) in scores.iter().enumerate() {
        if score > best_score {
            best = index;
            best_score = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::config::GridConfig;
    use crate::detection::grid::SequencePredictions;
    use ndarray::{arr1, s};

    fn unit_grid() -> GridConfig {
        GridConfig {
            x_step: 1.0,
            y_step: 1.0,
            downscaling_factor: 1.0,
            x_min: 0.0,
            y_min: 0.0,
        }
    }

    fn decoder(anchors: Vec<AnchorPrior>) -> BoxDecoder {
        BoxDecoder::new(DecodeConfig::new(unit_grid(), anchors))
    }

    fn car() -> AnchorPrior {
        AnchorPrior::new(4.0, 2.0, 1.5, 0.0, 0.0)
    }

    #[test]
    fn test_single_cell_scenario() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 1, 1, 2);
        predictions.occupancy[[0, 0, 0]] = 0.9;
        predictions.heading[[0, 0, 0]] = 1.0;
        predictions
            .class_scores
            .slice_mut(s![0, 0, 0, ..])
            .assign(&arr1(&[0.2, 0.8]));

        let boxes = decoder(vec![car()]).decode(&predictions.view()?)?;

        assert_eq!(boxes.len(), 1);
        let bbox = boxes[0];
        assert_eq!(bbox.extents(), [4.0, 2.0, 1.5]);
        assert_eq!(bbox.yaw(), 0.0);
        assert_eq!(bbox.heading(), 1.0);
        assert_eq!(bbox.class_id(), 1);
        assert_eq!(bbox.confidence(), 0.9);
        assert_eq!(bbox.x(), 0.0);
        assert_eq!(bbox.y(), 0.0);
        Ok(())
    }

    #[test]
    fn test_nothing_occupied_is_empty() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(3, 3, 1, 2);
        predictions.occupancy.fill(0.49);

        let boxes = decoder(vec![car()]).decode(&predictions.view()?)?;
        assert!(boxes.is_empty());
        Ok(())
    }

    #[test]
    fn test_threshold_is_inclusive() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 2, 1, 1);
        predictions.occupancy[[0, 0, 0]] = 0.5;
        predictions.occupancy[[0, 1, 0]] = 0.4999;

        let boxes = decoder(vec![car()]).decode(&predictions.view()?)?;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].confidence(), 0.5);
        Ok(())
    }

    #[test]
    fn test_nan_occupancy_is_skipped() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 1, 1, 1);
        predictions.occupancy[[0, 0, 0]] = f32::NAN;

        let boxes = decoder(vec![car()]).decode(&predictions.view()?)?;
        assert!(boxes.is_empty());
        Ok(())
    }

    #[test]
    fn test_position_and_size_inversion() -> Result<()> {
        let grid = GridConfig {
            x_step: 0.16,
            y_step: 0.25,
            downscaling_factor: 2.0,
            x_min: -4.0,
            y_min: 10.0,
        };
        let anchor = AnchorPrior::new(3.0, 4.0, 2.0, -1.0, 0.5);
        let decoder = BoxDecoder::new(DecodeConfig::new(grid, vec![anchor]));

        let mut predictions = SequencePredictions::zeros(3, 4, 1, 1);
        predictions.occupancy[[2, 3, 0]] = 0.8;
        predictions
            .position
            .slice_mut(s![2, 3, 0, ..])
            .assign(&arr1(&[0.1, -0.2, 0.5]));
        predictions
            .size
            .slice_mut(s![2, 3, 0, ..])
            .assign(&arr1(&[0.0, 2.0_f32.ln(), -(2.0_f32.ln())]));
        predictions.angle[[2, 3, 0]] = 0.25;

        let boxes = decoder.decode(&predictions.view()?)?;
        assert_eq!(boxes.len(), 1);
        let bbox = boxes[0];

        // diagonal of 3x4 is 5
        let expected_x = 0.1 * 5.0 + (2.0 * 0.16 * 2.0 - 4.0);
        let expected_y = -0.2 * 5.0 + (3.0 * 0.25 * 2.0 + 10.0);
        assert!((bbox.x() - expected_x).abs() < 1e-5);
        assert!((bbox.y() - expected_y).abs() < 1e-5);
        assert!((bbox.z() - 0.0).abs() < 1e-6);
        assert!((bbox.length() - 3.0).abs() < 1e-5);
        assert!((bbox.width() - 8.0).abs() < 1e-4);
        assert!((bbox.height() - 1.0).abs() < 1e-5);
        assert!((bbox.yaw() - 0.75).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_extents_stay_positive() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 4, 1, 1);
        predictions.occupancy.fill(1.0);
        for (column, offset) in [-20.0, -3.0, 0.5, 6.0].into_iter().enumerate() {
            predictions.size.slice_mut(s![0, column, 0, ..]).fill(offset);
        }

        let boxes = decoder(vec![car()]).decode(&predictions.view()?)?;
        assert_eq!(boxes.len(), 4);
        for bbox in boxes {
            assert!(bbox.length() > 0.0);
            assert!(bbox.width() > 0.0);
            assert!(bbox.height() > 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_anchor_axis_selects_prior() -> Result<()> {
        let pedestrian = AnchorPrior::new(0.8, 0.6, 1.7, -0.6, 1.5);
        let mut predictions = SequencePredictions::zeros(1, 1, 2, 1);
        predictions.occupancy[[0, 0, 1]] = 0.7;

        let boxes = decoder(vec![car(), pedestrian]).decode(&predictions.view()?)?;
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].length() - 0.8).abs() < 1e-6);
        assert!((boxes[0].z() + 0.6).abs() < 1e-6);
        assert!((boxes[0].yaw() - 1.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_missing_anchor_is_lookup_error() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 1, 3, 1);
        predictions.occupancy[[0, 0, 0]] = 0.9;
        predictions.occupancy[[0, 0, 2]] = 0.9;

        let err = decoder(vec![car(), car()])
            .decode(&predictions.view()?)
            .unwrap_err();
        assert_eq!(err, Error::AnchorLookup { index: 2, available: 2 });
        Ok(())
    }

    #[test]
    fn test_unselected_cells_do_not_need_anchors() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 1, 3, 1);
        predictions.occupancy[[0, 0, 0]] = 0.9;

        let boxes = decoder(vec![car()]).decode(&predictions.view()?)?;
        assert_eq!(boxes.len(), 1);
        Ok(())
    }

    #[test]
    fn test_row_major_order() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(2, 2, 2, 1);
        predictions.occupancy[[1, 0, 1]] = 0.6;
        predictions.occupancy[[0, 1, 0]] = 0.95;
        predictions.occupancy[[1, 1, 0]] = 0.7;

        let boxes = decoder(vec![car(), car()]).decode(&predictions.view()?)?;
        let confidences: Vec<f32> = boxes.iter().map(|b| b.confidence()).collect();
        assert_eq!(confidences, vec![0.95, 0.6, 0.7]);
        Ok(())
    }

    #[test]
    fn test_heading_rounds_half_to_even() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 3, 1, 1);
        predictions.occupancy.fill(0.9);
        predictions.heading[[0, 0, 0]] = 0.5;
        predictions.heading[[0, 1, 0]] = 0.51;
        predictions.heading[[0, 2, 0]] = 0.2;

        let boxes = decoder(vec![car()]).decode(&predictions.view()?)?;
        let headings: Vec<f32> = boxes.iter().map(|b| b.heading()).collect();
        assert_eq!(headings, vec![0.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_argmax_takes_first_maximum() {
        assert_eq!(argmax(arr1(&[0.3, 0.7, 0.7]).view()), 1);
        assert_eq!(argmax(arr1(&[f32::NAN, 0.1]).view()), 1);
        assert_eq!(argmax(arr1(&[0.5]).view()), 0);
    }

    #[test]
    fn test_rows_match_boxes() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(2, 3, 1, 3);
        predictions.occupancy[[0, 2, 0]] = 0.55;
        predictions.occupancy[[1, 1, 0]] = 0.85;
        predictions.position.fill(0.1);
        predictions.size.fill(-0.2);
        predictions.class_scores[[1, 1, 0, 2]] = 1.0;

        let (boxes, rows) = decoder(vec![car()]).decode_with_rows(&predictions.view()?)?;
        assert_eq!(rows.dim(), (2, 10));
        for (bbox, row) in boxes.iter().zip(rows.rows()) {
            assert_eq!(row.to_vec(), bbox.to_row().to_vec());
        }
        assert_eq!(rows[[1, 8]], 2.0);
        Ok(())
    }

    #[test]
    fn test_rows_for_empty_selection() -> Result<()> {
        let predictions = SequencePredictions::zeros(2, 2, 1, 1);
        let (boxes, rows) = decoder(vec![car()]).decode_with_rows(&predictions.view()?)?;
        assert!(boxes.is_empty());
        assert_eq!(rows.dim(), (0, 10));
        Ok(())
    }

    #[test]
    fn test_strict_mode_rejects_out_of_range_class() -> Result<()> {
        let mut predictions = SequencePredictions::zeros(1, 1, 1, 3);
        predictions.occupancy[[0, 0, 0]] = 0.9;
        predictions.class_scores[[0, 0, 0, 2]] = 1.0;

        let config = DecodeConfig::new(unit_grid(), vec![car()]).strict(Some(2));
        let err = BoxDecoder::new(config)
            .decode(&predictions.view()?)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBox(_)));
        Ok(())
    }

    #[test]
    fn test_decode_batch_keeps_batch_order() -> Result<()> {
        let mut first = SequencePredictions::zeros(1, 1, 1, 1);
        first.occupancy[[0, 0, 0]] = 0.6;
        let second = SequencePredictions::zeros(1, 1, 1, 1);
        let mut third = SequencePredictions::zeros(1, 2, 1, 1);
        third.occupancy.fill(0.9);

        let batch = [first.view()?, second.view()?, third.view()?];
        let decoded = decoder(vec![car()]).decode_batch(&batch)?;
        let lengths: Vec<usize> = decoded.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![1, 0, 2]);
        Ok(())
    }
}
