use serde::{Deserialize, Serialize};

/// Reference box a grid cell's regression targets are expressed against.
///
/// Serialized as `[length, width, height, z_offset, yaw_offset]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 5]", into = "[f32; 5]")]
pub struct AnchorPrior {
    pub length: f32,
    pub width: f32,
    pub height: f32,
    pub z_offset: f32,
    pub yaw_offset: f32,
}

impl AnchorPrior {
    pub fn new(length: f32, width: f32, height: f32, z_offset: f32, yaw_offset: f32) -> Self {
        Self {
            length,
            width,
            height,
            z_offset,
            yaw_offset,
        }
    }

    /// Planar diagonal, the scale applied to x/y position offsets.
    pub fn diagonal(&self) -> f32 {
        self.length.hypot(self.width)
    }
}

impl From<[f32; 5]> for AnchorPrior {
    fn from(dims: [f32; 5]) -> Self {
        let [length, width, height, z_offset, yaw_offset] = dims;
        Self::new(length, width, height, z_offset, yaw_offset)
    }
}

impl From<AnchorPrior> for [f32; 5] {
    fn from(anchor: AnchorPrior) -> Self {
        [
            anchor.length,
            anchor.width,
            anchor.height,
            anchor.z_offset,
            anchor.yaw_offset,
        ]
    }
}
