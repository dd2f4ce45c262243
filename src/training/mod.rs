//! Character embedding training.
//!
//! Skip-gram with negative sampling over a single flattened token stream.
//!
//! ## Update rule
//!
//! For a centre character `c` and one target `t` with label `y` (1 for the
//! observed context, 0 for a noise sample):
//! ```text
//! s    = σ(v_c · u_t)
//! g    = (y - s) · lr
//! u_t += g · v_c
//! v_c += Σ_t g · u_t        (accumulated over the positive and all negatives)
//! ```
//!
//! The effective window is shrunk uniformly at random per position, noise
//! targets are drawn from the unigram distribution raised to 0.75, and the
//! learning rate decays linearly from `alpha` to `min_alpha` over the run.
//! All randomness flows from one `StdRng` seeded by [`TrainerConfig::seed`].

use ndarray::{Array1, Array2, ArrayView1};
use ndarray_rand::RandomExt;
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::{HueError, HueResult};
use crate::data::Vocabulary;
use crate::utils::sigmoid;

/// Floor applied inside `ln` when accumulating the loss.
const LOSS_EPSILON: f32 = 1e-7;

/// Hyper-parameters for embedding training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Embedding dimensionality.
    pub dim: usize,
    /// Maximum distance between a centre and a context character.
    pub window: usize,
    /// Noise samples per positive pair.
    pub negative: usize,
    /// Passes over the token stream.
    pub epochs: usize,
    /// Initial learning rate.
    pub alpha: f32,
    /// Final learning rate.
    pub min_alpha: f32,
    /// Seed for initialisation, window shrinking and noise sampling.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            dim: 100,
            window: 5,
            negative: 5,
            epochs: 5,
            alpha: 0.025,
            min_alpha: 0.0001,
            seed: 1,
        }
    }
}

impl TrainerConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for zero sizes or an inverted learning-rate range.
    pub fn validate(&self) -> HueResult<()> {
        if self.dim == 0 {
            return Err(HueError::InvalidConfig("trainer.dim must be > 0".into()));
        }
        if self.window == 0 {
            return Err(HueError::InvalidConfig("trainer.window must be > 0".into()));
        }
        if self.epochs == 0 {
            return Err(HueError::InvalidConfig("trainer.epochs must be > 0".into()));
        }
        if !(self.alpha > 0.0) || !(self.min_alpha >= 0.0) || self.min_alpha > self.alpha {
            return Err(HueError::InvalidConfig(
                "trainer learning rates must satisfy 0 <= min_alpha <= alpha, alpha > 0".into(),
            ));
        }
        Ok(())
    }
}

/// One trained vector per vocabulary character.
///
/// Rows of `vectors` are parallel to `chars`, which keeps vocabulary order.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    pub chars: Vec<char>,
    pub vectors: Array2<f32>,
}

impl EmbeddingTable {
    /// # Errors
    ///
    /// Returns `MalformedTable` if the row count does not match `chars`,
    /// or `EmptyVocabulary` if there are no rows.
    pub fn new(chars: Vec<char>, vectors: Array2<f32>) -> HueResult<Self> {
        if chars.len() != vectors.nrows() {
            return Err(HueError::MalformedTable(format!(
                "{} characters but {} vectors",
                chars.len(),
                vectors.nrows()
            )));
        }
        if chars.is_empty() {
            return Err(HueError::EmptyVocabulary);
        }
        Ok(Self { chars, vectors })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    /// The vector for `c`, if it was trained.
    #[must_use]
    pub fn vector(&self, c: char) -> Option<ArrayView1<'_, f32>> {
        let idx = self.chars.iter().position(|&x| x == c)?;
        Some(self.vectors.row(idx))
    }
}

/// Per-epoch training statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Mean negative log-likelihood per (centre, context) pair.
    pub loss: f32,
    /// Number of (centre, context) pairs visited.
    pub pairs: usize,
    /// Learning rate at the end of the epoch.
    pub learning_rate: f32,
}

/// Seeded skip-gram trainer.
#[derive(Debug, Clone)]
pub struct EmbeddingTrainer {
    config: TrainerConfig,
}

impl EmbeddingTrainer {
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn new(config: TrainerConfig) -> HueResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train one vector per distinct token in `tokens`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyVocabulary` if `tokens` is empty.
    pub fn train(&self, tokens: &[char]) -> HueResult<(EmbeddingTable, Vec<EpochMetrics>)> {
        let cfg = &self.config;
        let vocab = Vocabulary::from_tokens(tokens);
        if vocab.is_empty() {
            return Err(HueError::EmptyVocabulary);
        }
        let stream = vocab.encode(tokens);

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let bound = 0.5 / cfg.dim as f32;
        let mut w_in = Array2::random_using(
            (vocab.size(), cfg.dim),
            Uniform::new(-bound, bound),
            &mut rng,
        );
        let mut w_out = Array2::<f32>::zeros((vocab.size(), cfg.dim));

        let noise_weights: Vec<f64> = vocab
            .counts
            .iter()
            .map(|&count| (count as f64).powf(0.75))
            .collect();
        let noise = WeightedIndex::new(&noise_weights)
            .map_err(|e| HueError::InvalidConfig(format!("noise distribution: {e}")))?;

        let total_steps = (cfg.epochs * stream.len()).max(1);
        let mut step = 0usize;
        let mut grad = Array1::<f32>::zeros(cfg.dim);
        let mut metrics = Vec::with_capacity(cfg.epochs);

        for epoch in 0..cfg.epochs {
            let mut loss = 0.0f64;
            let mut pairs = 0usize;
            let mut lr = cfg.alpha;

            for (pos, &center) in stream.iter().enumerate() {
                lr = self.learning_rate(step, total_steps);
                step += 1;

                let span = cfg.window - rng.gen_range(0..cfg.window);
                let start = pos.saturating_sub(span);
                let end = (pos + span).min(stream.len() - 1);

                for ctx_pos in start..=end {
                    if ctx_pos == pos {
                        continue;
                    }
                    loss += train_pair(
                        &mut w_in,
                        &mut w_out,
                        center,
                        stream[ctx_pos],
                        &noise,
                        &mut rng,
                        cfg.negative,
                        lr,
                        &mut grad,
                    );
                    pairs += 1;
                }
            }

            let mean_loss = if pairs > 0 {
                (loss / pairs as f64) as f32
            } else {
                0.0
            };
            tracing::debug!(epoch, loss = mean_loss, pairs, lr, "embedding epoch");
            metrics.push(EpochMetrics {
                epoch,
                loss: mean_loss,
                pairs,
                learning_rate: lr,
            });
        }

        tracing::info!(
            vocabulary = vocab.size(),
            tokens = stream.len(),
            dim = cfg.dim,
            seed = cfg.seed,
            "trained character embeddings"
        );
        let table = EmbeddingTable::new(vocab.chars, w_in)?;
        Ok((table, metrics))
    }

    /// Linear decay from `alpha` at step 0 to `min_alpha` at the last step.
    fn learning_rate(&self, step: usize, total_steps: usize) -> f32 {
        let progress = step as f32 / total_steps as f32;
        self.config.alpha - (self.config.alpha - self.config.min_alpha) * progress
    }
}

/// One positive update plus `negative` noise updates for a centre character.
///
/// Returns the pair's negative log-likelihood.
#[allow(clippy::too_many_arguments)]
fn train_pair<R: Rng>(
    w_in: &mut Array2<f32>,
    w_out: &mut Array2<f32>,
    center: usize,
    context: usize,
    noise: &WeightedIndex<f64>,
    rng: &mut R,
    negative: usize,
    lr: f32,
    grad: &mut Array1<f32>,
) -> f64 {
    grad.fill(0.0);
    let mut loss = 0.0f64;
    let input = w_in.row(center);

    for k in 0..=negative {
        let (target, label) = if k == 0 {
            (context, 1.0f32)
        } else {
            let sampled = noise.sample(rng);
            if sampled == context {
                continue;
            }
            (sampled, 0.0f32)
        };

        let mut output = w_out.row_mut(target);
        let score = sigmoid(input.dot(&output));
        let likelihood = if label > 0.5 { score } else { 1.0 - score };
        loss -= f64::from(likelihood.max(LOSS_EPSILON).ln());

        let g = (label - score) * lr;
        grad.scaled_add(g, &output);
        output.scaled_add(g, &input);
    }

    w_in.row_mut(center).scaled_add(1.0, &*grad);
    loss
}
