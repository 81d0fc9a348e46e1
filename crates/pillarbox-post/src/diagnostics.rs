//! Box-list conversion and occupancy matching diagnostics

use ndarray::ArrayView3;
use pillarbox_core::{BoundingBox, BoxRow, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Flatten a batch of box lists into rows, keeping batch and box order.
pub fn flatten_boxes(batch: &[Vec<BoundingBox>]) -> Vec<Vec<BoxRow>> {
    batch
        .iter()
        .map(|boxes| boxes.iter().map(BoundingBox::to_row).collect())
        .collect()
}

/// Inverse of [`flatten_boxes`].
pub fn unflatten_rows(batch: &[Vec<BoxRow>]) -> Vec<Vec<BoundingBox>> {
    batch
        .iter()
        .map(|rows| rows.iter().map(BoundingBox::from_row).collect())
        .collect()
}

/// Outcome of comparing predicted occupancy against ground truth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub matched: usize,
    pub unmatched_ground_truth: usize,
    pub unmatched_predictions: usize,
    /// Occupancy value of the n-th ranked prediction, `None` when nothing was ranked
    pub threshold: Option<f32>,
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#matched gt: {} #unmatched gt: {} #unmatched pred: {} occupancy threshold: ",
            self.matched, self.unmatched_ground_truth, self.unmatched_predictions
        )?;
        match self.threshold {
            Some(threshold) => write!(f, "{threshold}"),
            None => write!(f, "-"),
        }
    }
}

/// Count how many ground-truth cells the top-ranked predicted cells hit.
///
/// Ground-truth positives are cells equal to `1`. The `top_n` highest
/// predictions (default: as many as there are positives) set the occupancy
/// threshold; every cell reaching it counts as predicted, so ties may add
/// more. A positive is matched when its exact `(row, column, anchor)` is
/// predicted.
pub fn match_occupancy(
    ground_truth: ArrayView3<'_, f32>,
    predicted: ArrayView3<'_, f32>,
    top_n: Option<usize>,
) -> Result<MatchReport> {
    if ground_truth.shape() != predicted.shape() {
        return Err(Error::ShapeMismatch {
            field: "predicted",
            expected: ground_truth.shape().to_vec(),
            found: predicted.shape().to_vec(),
        });
    }

    let positives: Vec<(usize, usize, usize)> = ground_truth
        .indexed_iter()
        .filter(|&(_, &value)| value == 1.0)
        .map(|(index, _)| index)
        .collect();

    let top_n = top_n.unwrap_or(positives.len());
    if top_n > predicted.len() {
        return Err(Error::InvalidCount {
            requested: top_n,
            available: predicted.len(),
        });
    }

    let threshold = nth_largest(predicted, top_n);
    let predictions: HashSet<(usize, usize, usize)> = match threshold {
        Some(threshold) => predicted
            .indexed_iter()
            .filter(|&(_, &value)| value >= threshold)
            .map(|(index, _)| index)
            .collect(),
        None => HashSet::new(),
    };

    let matched = positives
        .iter()
        .filter(|&index| predictions.contains(index))
        .count();

    let report = MatchReport {
        matched,
        unmatched_ground_truth: positives.len() - matched,
        unmatched_predictions: predictions.len() - matched,
        threshold,
    };
    tracing::debug!("{report}");

    Ok(report)
}

fn nth_largest(values: ArrayView3<'_, f32>, n: usize) -> Option<f32> {
    if n == 0 {
        return None;
    }

    let mut sorted: Vec<f32> = values.iter().copied().collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted.get(n - 1).copied()
}
