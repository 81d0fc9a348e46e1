//! Detection configuration

use pillarbox_core::AnchorPrior;
use pillarbox_core::error::{Result, ensure_unit_interval};
use serde::{Deserialize, Serialize};

/// Main detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub grid: GridConfig,
    pub anchors: Vec<AnchorPrior>,
    pub occupancy_threshold: f32,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub num_classes: Option<usize>,
    pub nms: NmsConfig,
}

/// Geometry of the network's output grid in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub x_step: f32,
    pub y_step: f32,
    pub downscaling_factor: f32,
    pub x_min: f32,
    pub y_min: f32,
}

/// Rotational NMS configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NmsConfig {
    pub confidence_floor: f32,
    pub iou_threshold: f32,
}

/// Everything the decoder needs, split out of [`DetectionConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeConfig {
    pub grid: GridConfig,
    pub anchors: Vec<AnchorPrior>,
    pub occupancy_threshold: f32,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub num_classes: Option<usize>,
}

impl GridConfig {
    /// World-frame origin of the cell at `(row, column)`.
    pub fn cell_origin(&self, row: usize, column: usize) -> (f32, f32) {
        (
            row as f32 * self.x_step * self.downscaling_factor + self.x_min,
            column as f32 * self.y_step * self.downscaling_factor + self.y_min,
        )
    }
}

impl NmsConfig {
    pub fn new(confidence_floor: f32, iou_threshold: f32) -> Result<Self> {
        let config = Self {
            confidence_floor,
            iou_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Both thresholds must lie strictly inside (0, 1)
    pub fn validate(&self) -> Result<()> {
        ensure_unit_interval("confidence_floor", self.confidence_floor)?;
        ensure_unit_interval("iou_threshold", self.iou_threshold)
    }
}

impl DecodeConfig {
    pub fn new(grid: GridConfig, anchors: Vec<AnchorPrior>) -> Self {
        Self {
            grid,
            anchors,
            occupancy_threshold: 0.5,
            strict: false,
            num_classes: None,
        }
    }

    pub fn with_threshold(mut self, occupancy_threshold: f32) -> Self {
        self.occupancy_threshold = occupancy_threshold;
        self
    }

    pub fn strict(mut self, num_classes: Option<usize>) -> Self {
        self.strict = true;
        self.num_classes = num_classes;
        self
    }
}

impl DetectionConfig {
    /// Decoder half of the configuration
    pub fn decode_config(&self) -> DecodeConfig {
        DecodeConfig {
            grid: self.grid,
            anchors: self.anchors.clone(),
            occupancy_threshold: self.occupancy_threshold,
            strict: self.strict,
            num_classes: self.num_classes,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x_step: 0.16,
            y_step: 0.16,
            downscaling_factor: 2.0,
            x_min: 0.0,
            y_min: -39.68,
        }
    }
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.7,
            iou_threshold: 0.5,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            anchors: vec![
                AnchorPrior::new(3.9, 1.6, 1.56, -1.0, 0.0),
                AnchorPrior::new(3.9, 1.6, 1.56, -1.0, 1.5708),
                AnchorPrior::new(0.8, 0.6, 1.73, -0.6, 0.0),
                AnchorPrior::new(0.8, 0.6, 1.73, -0.6, 1.5708),
            ],
            occupancy_threshold: 0.5,
            strict: false,
            num_classes: None,
            nms: NmsConfig::default(),
        }
    }
}
