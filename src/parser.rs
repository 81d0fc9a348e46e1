//! Loading prediction dumps and running the pillarbox pipeline

use crate::Cli;
use anyhow::{Context, Result, ensure};
use ndarray::Array3;
use pillarbox_post::{DetectionConfig, DetectionPipeline, SequencePredictions, match_occupancy};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Run decoding, suppression and the optional match report
pub fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_json::<DetectionConfig>(path)?,
        None => DetectionConfig::default(),
    };
    let sequences: Vec<SequencePredictions> = load_json(&cli.predictions)?;
    tracing::info!(
        "Loaded {} sequences from {:?}",
        sequences.len(),
        cli.predictions
    );

    let grids = sequences
        .iter()
        .enumerate()
        .map(|(index, sequence)| {
            sequence
                .view()
                .with_context(|| format!("Invalid prediction grids in sequence {index}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let pipeline = DetectionPipeline::new(config).context("Invalid detection configuration")?;
    let decode_config = pipeline.decoder().config();
    tracing::debug!(
        threshold = decode_config.occupancy_threshold,
        anchors = decode_config.anchors.len(),
        strict = decode_config.strict,
        "Pipeline ready"
    );
    let output = pipeline
        .process_output(&grids, cli.rows)
        .context("Failed to decode predictions")?;

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            output
                .export_json(BufWriter::new(file))
                .with_context(|| format!("Failed to write JSON to: {:?}", path))?;
            tracing::info!("Results saved: {:?}", path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            output
                .export_json(&mut handle)
                .context("Failed to write JSON to stdout")?;
            writeln!(handle)?;
        }
    }

    if let Some(path) = &cli.ground_truth {
        report_matches(path, &sequences)?;
    }

    Ok(())
}

fn report_matches(path: &Path, sequences: &[SequencePredictions]) -> Result<()> {
    let ground_truth: Vec<Array3<f32>> = load_json(path)?;
    ensure!(
        ground_truth.len() == sequences.len(),
        "{} ground-truth grids for {} sequences",
        ground_truth.len(),
        sequences.len()
    );

    for (index, (truth, sequence)) in ground_truth.iter().zip(sequences).enumerate() {
        let report = match_occupancy(truth.view(), sequence.occupancy.view(), None)
            .with_context(|| format!("Failed to match sequence {index}"))?;
        tracing::info!(sequence = index, "{report}");
    }

    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON from: {:?}", path))
}
