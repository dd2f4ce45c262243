//! Shared types used across every pipeline stage.
//!
//! - [`HueError`] / [`HueResult`] — the crate-wide error taxonomy
//! - [`Hsl`] — a colour in the HSL model, the unit rendered into each grid cell
//! - [`GridCell`] — one positioned cell of a rendered grid
//! - [`grid_side`] — the square-grid size check shared by renderer and decoder

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The sequence rendered when no characters are requested explicitly.
pub const CANONICAL_SEQUENCE: &str = "光復香港時代革命五大訴求缺一不可";

/// Error type for every stage of the encode/decode pipeline.
#[derive(Error, Debug)]
pub enum HueError {
    /// Requested character has no entry in the trained colour table.
    #[error("Unknown character: '{0}' is not in the trained vocabulary")]
    UnknownCharacter(char),

    /// Requested cell count has no positive integer square root.
    #[error("Invalid grid size: {0} cells cannot form a square grid")]
    InvalidGridSize(usize),

    /// A rendered artifact could not be parsed back into cells.
    #[error("Malformed artifact at cell {cell}: {reason}")]
    MalformedArtifact { cell: usize, reason: String },

    /// Training saw no tokens, so no embeddings exist.
    #[error("Empty vocabulary: the corpus produced no tokens after cleaning")]
    EmptyVocabulary,

    /// Configuration values out of range or inconsistent.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A persisted embedding or colour table could not be read.
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    /// Checkpoint written by an incompatible format version.
    #[error("Checkpoint version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Two characters render to the same colour string.
    #[error("Colour collision: '{first}' and '{second}' render identically")]
    ColorCollision { first: char, second: char },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type HueResult<T> = Result<T, HueError>;

/// A colour in the HSL model.
///
/// Hue is in degrees, saturation and lightness are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Hsl {
    #[must_use]
    pub fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Channel values in hue, saturation, lightness order.
    #[must_use]
    pub fn channels(&self) -> [f64; 3] {
        [self.hue, self.saturation, self.lightness]
    }

    /// CSS notation with every number printed to `precision` decimals.
    ///
    /// This string is exactly what the renderer embeds, so two colours that
    /// format identically cannot be told apart after rendering.
    #[must_use]
    pub fn to_css(&self, precision: usize) -> String {
        format!(
            "hsl({:.p$}, {:.p$}%, {:.p$}%)",
            self.hue,
            self.saturation,
            self.lightness,
            p = precision
        )
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

/// One cell of a square grid, addressed row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub row: usize,
    pub column: usize,
    pub color: Hsl,
}

/// Side length of the square grid holding `len` cells.
///
/// Returns `None` unless `len` is a positive perfect square.
#[must_use]
pub fn grid_side(len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let side = (len as f64).sqrt().round() as usize;
    (side * side == len).then_some(side)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_side_perfect_squares() {
        assert_eq!(grid_side(1), Some(1));
        assert_eq!(grid_side(16), Some(4));
        assert_eq!(grid_side(10_000), Some(100));
    }

    #[test]
    fn test_grid_side_rejects_non_squares() {
        assert_eq!(grid_side(0), None);
        assert_eq!(grid_side(5), None);
        assert_eq!(grid_side(15), None);
    }

    #[test]
    fn test_css_precision() {
        let c = Hsl::new(12.4, 60.0, 75.25);
        assert_eq!(c.to_css(2), "hsl(12.40, 60.00%, 75.25%)");
        assert_eq!(c.to_css(0), "hsl(12, 60%, 75%)");
    }

    #[test]
    fn test_canonical_sequence_is_square() {
        assert_eq!(grid_side(CANONICAL_SEQUENCE.chars().count()), Some(4));
    }

    #[test]
    fn test_error_messages() {
        let err = HueError::UnknownCharacter('龍');
        assert!(err.to_string().contains('龍'));
        let err = HueError::InvalidGridSize(5);
        assert!(err.to_string().contains('5'));
    }
}
