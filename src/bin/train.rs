//! Colour table training binary.
//!
//! Trains character embeddings on a JSON corpus, reduces them to colour axes
//! and writes the embeddings CSV, colour CSV, table checkpoint and per-epoch
//! JSONL metrics into the output directory.

use clap::{Parser, ValueEnum};
use hanzi_hue::checkpoint::{save_colors, save_embeddings, save_table};
use hanzi_hue::data::JsonCorpus;
use hanzi_hue::reduce::AxisStrategyKind;
use hanzi_hue::{train_color_table, Config};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Principal,
    Skewness,
}

impl From<Strategy> for AxisStrategyKind {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Principal => AxisStrategyKind::Principal,
            Strategy::Skewness => AxisStrategyKind::Skewness,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "hue-train",
    about = "Train a character colour table from a JSON corpus"
)]
struct Args {
    /// JSON array of text samples
    #[arg(long, default_value = "data/corpus.json")]
    corpus: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving embeddings.csv, hsl.csv, table.json and metrics.jsonl
    #[arg(long, default_value = "data/output")]
    output_dir: PathBuf,

    /// Embedding dimensionality
    #[arg(long)]
    dim: Option<usize>,

    /// Training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Context window
    #[arg(long)]
    window: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Axis selection strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Fail when two characters render to the same colour
    #[arg(long, default_value_t = false)]
    reject_collisions: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(dim) = args.dim {
        config.trainer.dim = dim;
    }
    if let Some(epochs) = args.epochs {
        config.trainer.epochs = epochs;
    }
    if let Some(window) = args.window {
        config.trainer.window = window;
    }
    if let Some(seed) = args.seed {
        config.trainer.seed = seed;
    }
    if let Some(strategy) = args.strategy {
        config.reducer.strategy = strategy.into();
    }
    config.reject_collisions |= args.reject_collisions;
    config.validate()?;

    fs::create_dir_all(&args.output_dir)?;
    info!(corpus = %args.corpus.display(), output = %args.output_dir.display(), "training");

    let start = Instant::now();
    let run = train_color_table(&JsonCorpus::new(&args.corpus), &config)?;
    let elapsed = start.elapsed().as_secs_f64();

    save_embeddings(&run.embeddings, &args.output_dir.join("embeddings.csv"))?;
    save_colors(&run.table, &args.output_dir.join("hsl.csv"))?;
    save_table(&run.table, &args.output_dir.join("table.json"))?;

    let mut metrics_file = BufWriter::new(File::create(args.output_dir.join("metrics.jsonl"))?);
    for m in &run.metrics {
        let event = serde_json::json!({
            "type": "epoch",
            "epoch": m.epoch,
            "loss": m.loss,
            "pairs": m.pairs,
            "learning_rate": m.learning_rate,
        });
        writeln!(metrics_file, "{event}")?;
    }
    let summary = serde_json::json!({
        "type": "complete",
        "vocabulary": run.table.len(),
        "dim": run.embeddings.dim(),
        "strategy": run.table.plan().strategy,
        "axis_order": run.table.plan().order,
        "axis_flip": run.table.plan().flip,
        "explained_variance": run.reduction.explained_variance,
        "collisions": run.table.collisions(config.render.precision).len(),
        "seconds": elapsed,
    });
    writeln!(metrics_file, "{summary}")?;
    metrics_file.flush()?;

    info!(entries = run.table.len(), seconds = elapsed, "done");
    Ok(())
}
