//! Decodes an SVG colour grid back into characters.

use clap::Parser;
use hanzi_hue::checkpoint::load_table;
use hanzi_hue::GridDecoder;
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "hue-decode", about = "Recover characters from an SVG colour grid")]
struct Args {
    /// Colour table checkpoint the grid was rendered with
    #[arg(long, default_value = "data/output/table.json")]
    table: PathBuf,

    /// SVG grid to decode
    input: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let table = load_table(&args.table)?;
    let chars = GridDecoder::new(&table).decode_file(&args.input)?;
    info!(cells = chars.len(), input = %args.input.display(), "decoded");

    println!("{}", chars.iter().collect::<String>());
    Ok(())
}
