//! Raw text to character tokens.
//!
//! Cleaning happens in three passes:
//! 1. every character outside the target script is dropped
//! 2. block-listed phrases are removed by substring match
//! 3. the remainder is split into characters and stop characters are dropped
//!
//! Phrase removal runs before splitting so that thematically related phrases
//! do not pull their characters towards each other during training.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::{HueError, HueResult};

/// Phrases whose characters should not learn from each other.
const THEMATIC_PHRASES: &[&str] = &[
    "光復", "香港", "時代", "革命", "五大訴求", "訴求", "缺一不可",
];

/// Multi-character Cantonese function words.
const STOP_PHRASES: &[&str] = &[
    "一啲", "一定", "不如", "不過", "之後", "乜嘢", "人哋", "但係", "你哋", "佢哋", "其他",
    "即係", "原來", "可以", "可能", "同埋", "哩個", "哩啲", "哩度", "哩樣", "唔使", "唔係",
    "喺度", "嗰個", "嗰啲", "嗰度", "噉樣", "因為", "如果", "已經", "幾多", "應該", "成日",
    "我哋", "或者", "所以", "有冇", "有啲", "梗係", "然之後", "真係", "而家", "自己", "覺得",
    "譬如", "跟住", "邊個", "點樣", "點解",
];

/// Single-character Cantonese function words.
const STOP_CHARS: &[char] = &[
    '乜', '你', '佢', '係', '個', '冇', '再', '到', '即', '去', '又', '同', '吖', '呀', '呢',
    '咁', '咗', '咩', '咪', '哦', '哩', '唔', '啊', '啲', '喎', '喺', '嗯', '嗰', '嘅', '嘢',
    '噉', '多', '太', '好', '就', '幾', '得', '想', '我', '最', '會', '有', '未', '由', '睇',
    '知', '而', '要', '話', '諗', '講', '返', '過', '都', '點',
];

/// Configuration for text cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Unicode script name accepted by `\p{..}`, e.g. `Han`.
    pub script: String,
    /// Phrases removed by substring match before splitting.
    pub blocked_phrases: Vec<String>,
    /// Characters removed after splitting.
    pub stop_chars: Vec<char>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            script: "Han".to_string(),
            blocked_phrases: THEMATIC_PHRASES
                .iter()
                .chain(STOP_PHRASES)
                .map(|s| (*s).to_string())
                .collect(),
            stop_chars: STOP_CHARS.to_vec(),
        }
    }
}

impl TokenizerConfig {
    /// Script filter only: no phrases, no stop characters.
    #[must_use]
    pub fn script_only(script: &str) -> Self {
        Self {
            script: script.to_string(),
            blocked_phrases: Vec::new(),
            stop_chars: Vec::new(),
        }
    }
}

/// Compiled tokenizer. Pure: holds no state between calls.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    off_script: Regex,
    phrases: Option<Regex>,
    stop_chars: HashSet<char>,
}

impl Tokenizer {
    /// Compile the cleaning patterns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the script name is not a Unicode script.
    pub fn new(config: &TokenizerConfig) -> HueResult<Self> {
        let off_script = Regex::new(&format!(r"[^\p{{{}}}]", config.script))
            .map_err(|e| HueError::InvalidConfig(format!("script '{}': {e}", config.script)))?;

        // Longest first so that a phrase is never shadowed by its own prefix.
        let mut phrases: Vec<&str> = config
            .blocked_phrases
            .iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .collect();
        phrases.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        phrases.dedup();

        let phrases = if phrases.is_empty() {
            None
        } else {
            let pattern = phrases
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                Regex::new(&pattern)
                    .map_err(|e| HueError::InvalidConfig(format!("blocked phrases: {e}")))?,
            )
        };

        Ok(Self {
            off_script,
            phrases,
            stop_chars: config.stop_chars.iter().copied().collect(),
        })
    }

    /// Clean one sample into its character tokens. An empty result is valid.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<char> {
        let in_script = self.off_script.replace_all(text, "");
        let unblocked = match &self.phrases {
            Some(re) => re.replace_all(&in_script, "").into_owned(),
            None => in_script.into_owned(),
        };
        unblocked
            .chars()
            .filter(|c| !self.stop_chars.contains(c))
            .collect()
    }

    /// Tokenize every sample and concatenate the results in sample order.
    #[must_use]
    pub fn tokenize_corpus<S: AsRef<str>>(&self, samples: &[S]) -> Vec<char> {
        samples
            .iter()
            .flat_map(|s| self.tokenize(s.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_tokenizer() -> Tokenizer {
        Tokenizer::new(&TokenizerConfig::default()).expect("default config compiles")
    }

    #[test]
    fn test_drops_non_han() {
        let tok = Tokenizer::new(&TokenizerConfig::script_only("Han")).unwrap();
        assert_eq!(tok.tokenize("abc 山, 水! 123"), vec!['山', '水']);
    }

    #[test]
    fn test_empty_result_is_valid() {
        let tok = default_tokenizer();
        assert!(tok.tokenize("hello world").is_empty());
        assert!(tok.tokenize("").is_empty());
    }

    #[test]
    fn test_removes_blocked_phrases_before_splitting() {
        let tok = default_tokenizer();
        // 香港 is removed as a unit; 香 on its own survives.
        assert_eq!(tok.tokenize("香港山香"), vec!['山', '香']);
    }

    #[test]
    fn test_phrase_spanning_removed_punctuation() {
        let tok = default_tokenizer();
        assert_eq!(tok.tokenize("香，港山"), vec!['山']);
    }

    #[test]
    fn test_longest_phrase_wins() {
        let tok = default_tokenizer();
        // 五大訴求 must go whole, not leave 五大 behind after 訴求 matches.
        assert_eq!(tok.tokenize("五大訴求山"), vec!['山']);
    }

    #[test]
    fn test_removes_stop_chars_after_splitting() {
        let tok = default_tokenizer();
        assert_eq!(tok.tokenize("我食飯"), vec!['食', '飯']);
    }

    #[test]
    fn test_invalid_script_is_config_error() {
        let result = Tokenizer::new(&TokenizerConfig::script_only("NotAScript"));
        assert!(matches!(result, Err(HueError::InvalidConfig(_))));
    }

    #[test]
    fn test_tokenize_corpus_keeps_sample_order() {
        let tok = Tokenizer::new(&TokenizerConfig::script_only("Han")).unwrap();
        let tokens = tok.tokenize_corpus(&["山水", "火"]);
        assert_eq!(tokens, vec!['山', '水', '火']);
    }
}
