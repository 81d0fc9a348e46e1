//! End-to-end decoding and suppression

use super::config::DetectionConfig;
use super::decoder::BoxDecoder;
use super::grid::PredictionGrid;
use crate::diagnostics::flatten_boxes;
use crate::traits::RotatedNms;
use crate::utils::nms::{PolygonNms, RotationalNms};
use pillarbox_core::{BoundingBox, BoxRow, Result};
use serde::Serialize;
use std::io::Write;

/// Decoder and rotational NMS wired from one [`DetectionConfig`]
#[derive(Debug, Clone)]
pub struct DetectionPipeline<B = PolygonNms> {
    decoder: BoxDecoder,
    nms: RotationalNms<B>,
}

/// Per-batch result in either export form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchOutput {
    Boxes(Vec<Vec<BoundingBox>>),
    Rows(Vec<Vec<BoxRow>>),
}

impl DetectionPipeline<PolygonNms> {
    /// Create new pipeline with the default geometry backend
    pub fn new(config: DetectionConfig) -> Result<Self> {
        Self::with_backend(config, PolygonNms)
    }
}

impl<B: RotatedNms> DetectionPipeline<B> {
    pub fn with_backend(config: DetectionConfig, backend: B) -> Result<Self> {
        let nms = RotationalNms::with_backend(config.nms, backend)?;
        let decoder = BoxDecoder::new(config.decode_config());
        Ok(Self { decoder, nms })
    }

    pub fn decoder(&self) -> &BoxDecoder {
        &self.decoder
    }

    /// Decode every batch element, then suppress duplicates per element.
    pub fn process(&self, batch: &[PredictionGrid<'_>]) -> Result<Vec<Vec<BoundingBox>>> {
        let decoded = self.decoder.decode_batch(batch)?;
        let kept = self.nms.apply_boxes(&decoded)?;

        tracing::debug!(
            batch = batch.len(),
            decoded = decoded.iter().map(Vec::len).sum::<usize>(),
            kept = kept.iter().map(Vec::len).sum::<usize>(),
            "pipeline finished"
        );

        Ok(kept)
    }

    /// Like [`process`](Self::process), packaged for export.
    pub fn process_output(&self, batch: &[PredictionGrid<'_>], rows: bool) -> Result<BatchOutput> {
        let boxes = self.process(batch)?;
        Ok(if rows {
            BatchOutput::Rows(flatten_boxes(&boxes))
        } else {
            BatchOutput::Boxes(boxes)
        })
    }
}

impl BatchOutput {
    /// Write as pretty JSON
    pub fn export_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}
