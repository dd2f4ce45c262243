//! Renders a character sequence as an SVG colour grid.

use clap::Parser;
use hanzi_hue::checkpoint::load_table;
use hanzi_hue::{Config, GridRenderer, CANONICAL_SEQUENCE};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "hue-render", about = "Render characters as an SVG colour grid")]
struct Args {
    /// Colour table checkpoint written by hue-train
    #[arg(long, default_value = "data/output/table.json")]
    table: PathBuf,

    /// Characters to render; length must be a perfect square
    #[arg(long, default_value = CANONICAL_SEQUENCE)]
    text: String,

    /// Output SVG file
    #[arg(long, default_value = "data/output/grid.svg")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Canvas width and height
    #[arg(long)]
    canvas_size: Option<f64>,

    /// Decimals printed per colour channel
    #[arg(long)]
    precision: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(size) = args.canvas_size {
        config.render.canvas_size = size;
    }
    if let Some(precision) = args.precision {
        config.render.precision = precision;
    }

    let table = load_table(&args.table)?;
    let renderer = GridRenderer::new(&table, config.render)?;
    let chars: Vec<char> = args.text.chars().filter(|c| !c.is_whitespace()).collect();
    renderer.render_to_file(&chars, &args.output)?;

    info!(characters = chars.len(), output = %args.output.display(), "rendered");
    Ok(())
}
