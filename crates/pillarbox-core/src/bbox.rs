//! Oriented 3D bounding boxes
//!
//! Core abstraction for decoded detections. A [`BoundingBox`] carries the full
//! set of scalar attributes and projects itself onto an [`OrientedRect`] for the
//! 2D rotated-geometry routines used during suppression.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of scalars in the flat row form of a box.
pub const BOX_ROW_LEN: usize = 10;

/// Flat numeric form of a box:
/// `[x, y, z, length, width, height, yaw, heading, class_id, confidence]`.
pub type BoxRow = [f32; BOX_ROW_LEN];

/// Rotated rectangle in the ground plane, angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedRect {
    pub center: (f32, f32),
    pub size: (f32, f32),
    pub angle: f32,
}

impl OrientedRect {
    pub fn new(center: (f32, f32), size: (f32, f32), angle: f32) -> Self {
        Self {
            center,
            size,
            angle,
        }
    }

    /// Area of the rectangle
    pub fn area(&self) -> f64 {
        f64::from(self.size.0) * f64::from(self.size.1)
    }

    /// Corner points in counter-clockwise order.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (cx, cy) = (f64::from(self.center.0), f64::from(self.center.1));
        let half_l = f64::from(self.size.0) / 2.0;
        let half_w = f64::from(self.size.1) / 2.0;
        let (sin, cos) = f64::from(self.angle).to_radians().sin_cos();

        let corner = |dl: f64, dw: f64| (cx + dl * cos - dw * sin, cy + dl * sin + dw * cos);

        [
            corner(-half_l, -half_w),
            corner(half_l, -half_w),
            corner(half_l, half_w),
            corner(-half_l, half_w),
        ]
    }
}

/// Represents one decoded oriented box in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    x: f32,
    y: f32,
    z: f32,
    length: f32,
    width: f32,
    height: f32,
    yaw: f32,
    heading: f32,
    class_id: usize,
    confidence: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// Inputs are taken as-is; use [`BoundingBox::validate`] to check them.
    pub fn new(
        center: [f32; 3],
        extents: [f32; 3],
        yaw: f32,
        heading: f32,
        class_id: usize,
        confidence: f32,
    ) -> Self {
        let [x, y, z] = center;
        let [length, width, height] = extents;
        Self {
            x,
            y,
            z,
            length,
            width,
            height,
            yaw,
            heading,
            class_id,
            confidence,
        }
    }

    /// Rebuild a box from its flat row form
    pub fn from_row(row: &BoxRow) -> Self {
        Self::new(
            [row[0], row[1], row[2]],
            [row[3], row[4], row[5]],
            row[6],
            row[7],
            row[8] as usize,
            row[9],
        )
    }

    /// Flatten into the row form, fields in constructor order
    pub fn to_row(&self) -> BoxRow {
        [
            self.x,
            self.y,
            self.z,
            self.length,
            self.width,
            self.height,
            self.yaw,
            self.heading,
            self.class_id as f32,
            self.confidence,
        ]
    }

    /// Ground-plane projection used by rotated NMS.
    pub fn rotated_rect(&self) -> OrientedRect {
        OrientedRect::new(
            (self.x, self.y),
            (self.length, self.width),
            self.yaw.to_degrees(),
        )
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn center(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn extents(&self) -> [f32; 3] {
        [self.length, self.width, self.height]
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Check the box invariants.
    ///
    /// `num_classes` bounds the class id when the class set is known.
    pub fn validate(&self, num_classes: Option<usize>) -> Result<()> {
        if self.to_row().iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidBox(format!("non-finite field in {self}")));
        }

        if self.length <= 0.0 || self.width <= 0.0 || self.height <= 0.0 {
            return Err(Error::InvalidBox(format!(
                "extents must be positive, got {}x{}x{}",
                self.length, self.width, self.height
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidBox(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        if let Some(num_classes) = num_classes {
            if self.class_id >= num_classes {
                return Err(Error::InvalidBox(format!(
                    "class id {} outside {num_classes} classes",
                    self.class_id
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BB | Cls: {}, x: {:.6}, y: {:.6}, l: {:.6}, w: {:.6}, yaw: {:.6}",
            self.class_id, self.x, self.y, self.length, self.width, self.yaw
        )
    }
}

impl From<&BoundingBox> for OrientedRect {
    fn from(bbox: &BoundingBox) -> Self {
        bbox.rotated_rect()
    }
}
