//! Corpus providers.
//!
//! The pipeline only needs a finite, deduplicated list of UTF-8 samples.
//! Where they come from is the provider's business.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::HueResult;

/// Source of training text.
pub trait CorpusProvider {
    /// Every sample, in a stable order, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn samples(&self) -> HueResult<Vec<String>>;
}

/// Samples held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    samples: Vec<String>,
}

impl InMemoryCorpus {
    #[must_use]
    pub fn new<I, S>(samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            samples: dedup(samples.into_iter().map(Into::into)),
        }
    }
}

impl CorpusProvider for InMemoryCorpus {
    fn samples(&self) -> HueResult<Vec<String>> {
        Ok(self.samples.clone())
    }
}

/// A JSON file holding an array of strings.
#[derive(Debug, Clone)]
pub struct JsonCorpus {
    path: PathBuf,
}

impl JsonCorpus {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CorpusProvider for JsonCorpus {
    fn samples(&self) -> HueResult<Vec<String>> {
        let json = std::fs::read_to_string(&self.path)?;
        let raw: Vec<String> = serde_json::from_str(&json)?;
        let samples = dedup(raw);
        tracing::debug!(
            path = %self.path.display(),
            samples = samples.len(),
            "loaded corpus"
        );
        Ok(samples)
    }
}

/// Drop repeated samples, keeping the first occurrence.
fn dedup<I: IntoIterator<Item = String>>(samples: I) -> Vec<String> {
    let mut seen = HashSet::new();
    samples
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
