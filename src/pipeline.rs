//! End-to-end training: corpus → tokens → embeddings → reduced axes → colours.

use crate::color::{ColorNormalizer, ColorTable};
use crate::config::Config;
use crate::core::{HueError, HueResult};
use crate::data::{CorpusProvider, Tokenizer};
use crate::reduce::{reduce, Reduction};
use crate::training::{EmbeddingTable, EmbeddingTrainer, EpochMetrics};

/// Everything produced by one training run.
#[derive(Debug, Clone)]
pub struct TrainedRun {
    pub embeddings: EmbeddingTable,
    pub reduction: Reduction,
    pub table: ColorTable,
    pub metrics: Vec<EpochMetrics>,
}

/// Train a colour table from `corpus`.
///
/// Deterministic for a fixed corpus and [`crate::training::TrainerConfig::seed`].
///
/// # Errors
///
/// - `InvalidConfig` if `config` does not validate
/// - `EmptyVocabulary` if cleaning leaves no tokens
/// - `ColorCollision` when `reject_collisions` is set and two characters
///   render identically
/// - errors from the corpus provider
pub fn train_color_table(corpus: &dyn CorpusProvider, config: &Config) -> HueResult<TrainedRun> {
    config.validate()?;

    let samples = corpus.samples()?;
    let tokenizer = Tokenizer::new(&config.tokenizer)?;
    let tokens = tokenizer.tokenize_corpus(&samples);
    tracing::info!(samples = samples.len(), tokens = tokens.len(), "corpus cleaned");
    if tokens.is_empty() {
        return Err(HueError::EmptyVocabulary);
    }

    let trainer = EmbeddingTrainer::new(config.trainer.clone())?;
    let (embeddings, metrics) = trainer.train(&tokens)?;

    let (reduction, plan, reduced) = reduce(&embeddings, &config.reducer)?;
    tracing::info!(
        explained_variance = ?reduction.explained_variance,
        "reduced embeddings"
    );

    let table = ColorNormalizer::new(config.color.clone())?.fit(&reduction.chars, &reduced, plan)?;

    let collisions = table.collisions(config.render.precision);
    if !collisions.is_empty() {
        if config.reject_collisions {
            table.validate_distinct(config.render.precision)?;
        }
        tracing::warn!(
            count = collisions.len(),
            first = ?collisions[0],
            "characters share a rendered colour"
        );
    }

    tracing::info!(entries = table.len(), axes = table.dims(), "colour table ready");
    Ok(TrainedRun {
        embeddings,
        reduction,
        table,
        metrics,
    })
}
