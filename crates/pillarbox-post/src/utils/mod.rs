//! Utility modules

pub mod geometry;
pub mod nms;
#[cfg(feature = "opencv")]
pub mod opencv_backend;

pub use nms::{PolygonNms, RotationalNms, rotational_nms};
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvNms;
