//! Corpus loading, text cleaning, and vocabulary management.
//!
//! ## Submodules
//!
//! - [`corpus`] — Corpus providers (in-memory, JSON file)
//! - [`tokenizer`] — Script filtering, phrase block-list, stop characters
//! - [`vocab`] — Frequency-ordered character vocabulary

pub mod corpus;
pub mod tokenizer;
pub mod vocab;

pub use corpus::{CorpusProvider, InMemoryCorpus, JsonCorpus};
pub use tokenizer::{Tokenizer, TokenizerConfig};
pub use vocab::Vocabulary;

/// Min-max bounds of `data`, or `None` when it is empty.
#[must_use]
pub fn min_max(data: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    data.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
