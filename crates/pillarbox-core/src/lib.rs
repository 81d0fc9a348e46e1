//! Pillarbox core types
//!
//! Box entities, anchor priors and angle helpers shared by the decoding and
//! suppression stages.

pub mod anchor;
pub mod angle;
pub mod bbox;
pub mod error;

pub use anchor::AnchorPrior;
pub use angle::{inverse_yaw, limit_period, limit_period_default};
pub use bbox::{BOX_ROW_LEN, BoundingBox, BoxRow, OrientedRect};
pub use error::{Error, Result};
