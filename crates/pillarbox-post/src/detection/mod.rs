//! High-level detection module

pub mod config;
pub mod decoder;
pub mod grid;
pub mod pipeline;

pub use config::{DecodeConfig, DetectionConfig, GridConfig, NmsConfig};
pub use decoder::BoxDecoder;
pub use grid::{PredictionGrid, SequencePredictions};
pub use pipeline::{BatchOutput, DetectionPipeline};
