use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

mod parser;

/// Decode pillar detector outputs into oriented boxes
#[derive(Debug, Parser)]
#[command(name = "pillarbox", version)]
pub struct Cli {
    /// JSON list of per-sequence prediction grids
    #[arg(short, long)]
    pub predictions: PathBuf,

    /// JSON detection configuration, defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write results here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit numeric rows instead of box objects
    #[arg(long)]
    pub rows: bool,

    /// JSON list of ground-truth occupancy grids to match against
    #[arg(long)]
    pub ground_truth: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    parser::run(&cli)
}
