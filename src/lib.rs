//! # hanzi-hue
//!
//! Deterministic colours for Han characters, derived from how they are used.
//!
//! ## Overview
//!
//! Characters are embedded with skip-gram training over a cleaned corpus, the
//! embeddings are projected onto three principal axes, and each axis is scaled
//! into one HSL channel. A sequence of `n²` characters renders as an `n × n`
//! SVG grid of squares. Because the colour table keeps its normalization
//! bounds, a rendered grid can be decoded back into the characters it shows.
//!
//! ```text
//! corpus ─▶ tokenize ─▶ train ─▶ reduce ─▶ normalize ─▶ ColorTable
//!                                                          │
//!                                  characters ─▶ render ───┤
//!                                  SVG ───────▶ decode ────┘
//! ```
//!
//! ## Structure
//!
//! - [`core`] — Error type, colour and grid primitives
//! - [`data`] — Corpus providers, tokenizer, vocabulary
//! - [`training`] — Seeded skip-gram embedding trainer
//! - [`reduce`] — PCA and axis-selection strategies
//! - [`color`] — HSL normalization and the colour table
//! - [`render`] — SVG grid renderer
//! - [`decode`] — SVG grid decoder
//! - [`checkpoint`] — CSV and JSON persistence
//! - [`config`] — TOML run configuration
//! - [`pipeline`] — End-to-end training
//! - [`utils`] — Math utilities and statistics

pub mod checkpoint;
pub mod color;
pub mod config;
pub mod core;
pub mod data;
pub mod decode;
pub mod pipeline;
pub mod reduce;
pub mod render;
pub mod training;
pub mod utils;

pub use crate::color::{ColorConfig, ColorEntry, ColorNormalizer, ColorTable};
pub use crate::config::Config;
pub use crate::core::{GridCell, HueError, HueResult, Hsl, CANONICAL_SEQUENCE};
pub use crate::decode::{GridDecoder, LinearScan, NearestIndex};
pub use crate::pipeline::{train_color_table, TrainedRun};
pub use crate::render::{GridRenderer, RenderConfig};
pub use crate::training::{EmbeddingTable, EmbeddingTrainer, EpochMetrics, TrainerConfig};
