//! Run configuration loaded from TOML.
//!
//! Every section is optional; missing keys fall back to their defaults.
//!
//! ```toml
//! reject_collisions = true
//!
//! [trainer]
//! dim = 50
//! seed = 7
//!
//! [reducer]
//! strategy = "principal"
//!
//! [color.hue]
//! low = 0.0
//! high = 300.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::color::ColorConfig;
use crate::core::{HueError, HueResult};
use crate::data::{Tokenizer, TokenizerConfig};
use crate::reduce::ReducerConfig;
use crate::render::RenderConfig;
use crate::training::TrainerConfig;

/// Configuration for a full training and rendering run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tokenizer: TokenizerConfig,
    pub trainer: TrainerConfig,
    pub reducer: ReducerConfig,
    pub color: ColorConfig,
    pub render: RenderConfig,
    /// Fail training when two characters render to the same colour string.
    pub reject_collisions: bool,
}

impl Config {
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Config::from_toml_str`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> HueResult<Self> {
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// `Toml` for malformed input, `InvalidConfig` for out-of-range values.
    pub fn from_toml_str(toml_str: &str) -> HueResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending value.
    pub fn validate(&self) -> HueResult<()> {
        Tokenizer::new(&self.tokenizer)?;
        self.trainer.validate()?;
        self.reducer.validate()?;
        if self.reducer.components > self.trainer.dim {
            return Err(HueError::InvalidConfig(format!(
                "reducer.components = {} exceeds trainer.dim = {}",
                self.reducer.components, self.trainer.dim
            )));
        }
        self.color.validate()?;
        self.render.validate()
    }
}
