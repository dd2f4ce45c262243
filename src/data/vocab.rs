//! Character vocabulary built from a token stream.
//!
//! Characters are ordered by descending frequency, ties broken by first
//! occurrence. This order is the iteration order of every downstream table,
//! so it also decides which entry wins a nearest-neighbour tie at decode time.

use std::collections::HashMap;

/// Character-to-index vocabulary with occurrence counts.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Ordered list of characters in the vocabulary.
    pub chars: Vec<char>,
    /// Occurrence count per character, parallel to `chars`.
    pub counts: Vec<usize>,
    /// Reverse mapping from character to index.
    pub char_to_idx: HashMap<char, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from every distinct token in `tokens`.
    #[must_use]
    pub fn from_tokens(tokens: &[char]) -> Self {
        let mut first_seen: Vec<char> = Vec::new();
        let mut tally: HashMap<char, usize> = HashMap::new();
        for &c in tokens {
            let count = tally.entry(c).or_insert(0);
            if *count == 0 {
                first_seen.push(c);
            }
            *count += 1;
        }

        // Stable sort keeps first-occurrence order among equal counts.
        let mut chars = first_seen;
        chars.sort_by(|a, b| tally[b].cmp(&tally[a]));

        let counts = chars.iter().map(|c| tally[c]).collect();
        let char_to_idx = chars.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self {
            chars,
            counts,
            char_to_idx,
        }
    }

    /// Number of characters in the vocabulary.
    #[must_use]
    pub fn size(&self) -> usize {
        self.chars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Get the index for a character, or `None` if not in vocabulary.
    #[must_use]
    pub fn char_to_index(&self, c: char) -> Option<usize> {
        self.char_to_idx.get(&c).copied()
    }

    /// Get the character for an index, or `None` if out of bounds.
    #[must_use]
    pub fn index_to_char(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }

    /// Map a token stream to vocabulary indices, skipping unknown characters.
    #[must_use]
    pub fn encode(&self, tokens: &[char]) -> Vec<usize> {
        tokens
            .iter()
            .filter_map(|&c| self.char_to_index(c))
            .collect()
    }
}
