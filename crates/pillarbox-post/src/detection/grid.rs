//! Dense per-cell network outputs for one batch element
//!
//! Every field is indexed by `(row, column, anchor)`; vector-valued fields add a
//! trailing axis.

use ndarray::{Array3, Array4, ArrayView3, ArrayView4};
use pillarbox_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Borrowed, shape-checked view of one sequence's prediction grids
#[derive(Debug, Clone, Copy)]
pub struct PredictionGrid<'a> {
    pub occupancy: ArrayView3<'a, f32>,
    pub position: ArrayView4<'a, f32>,
    pub size: ArrayView4<'a, f32>,
    pub angle: ArrayView3<'a, f32>,
    pub heading: ArrayView3<'a, f32>,
    pub class_scores: ArrayView4<'a, f32>,
}

/// Owned prediction grids as dumped by the network driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencePredictions {
    pub occupancy: Array3<f32>,
    pub position: Array4<f32>,
    pub size: Array4<f32>,
    pub angle: Array3<f32>,
    pub heading: Array3<f32>,
    pub class_scores: Array4<f32>,
}

impl<'a> PredictionGrid<'a> {
    /// Bundle the six grids, checking they share the occupancy grid's cells.
    pub fn new(
        occupancy: ArrayView3<'a, f32>,
        position: ArrayView4<'a, f32>,
        size: ArrayView4<'a, f32>,
        angle: ArrayView3<'a, f32>,
        heading: ArrayView3<'a, f32>,
        class_scores: ArrayView4<'a, f32>,
    ) -> Result<Self> {
        let (rows, columns, anchors) = occupancy.dim();
        let cells = [rows, columns, anchors];

        check_shape("position", position.shape(), &[rows, columns, anchors, 3])?;
        check_shape("size", size.shape(), &[rows, columns, anchors, 3])?;
        check_shape("angle", angle.shape(), &cells)?;
        check_shape("heading", heading.shape(), &cells)?;

        let num_classes = class_scores.dim().3;
        check_shape(
            "class_scores",
            class_scores.shape(),
            &[rows, columns, anchors, num_classes],
        )?;
        if num_classes == 0 {
            return Err(Error::EmptyClassScores);
        }

        Ok(Self {
            occupancy,
            position,
            size,
            angle,
            heading,
            class_scores,
        })
    }

    /// `(rows, columns, anchors)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.occupancy.dim()
    }

    pub fn num_classes(&self) -> usize {
        self.class_scores.dim().3
    }
}

impl SequencePredictions {
    pub fn view(&self) -> Result<PredictionGrid<'_>> {
        PredictionGrid::new(
            self.occupancy.view(),
            self.position.view(),
            self.size.view(),
            self.angle.view(),
            self.heading.view(),
            self.class_scores.view(),
        )
    }

    /// All-zero grids of the given cell shape
    pub fn zeros(rows: usize, columns: usize, anchors: usize, num_classes: usize) -> Self {
        Self {
            occupancy: Array3::zeros((rows, columns, anchors)),
            position: Array4::zeros((rows, columns, anchors, 3)),
            size: Array4::zeros((rows, columns, anchors, 3)),
            angle: Array3::zeros((rows, columns, anchors)),
            heading: Array3::zeros((rows, columns, anchors)),
            class_scores: Array4::zeros((rows, columns, anchors, num_classes)),
        }
    }
}

fn check_shape(field: &'static str, found: &[usize], expected: &[usize]) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            field,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}
