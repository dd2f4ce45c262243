//! Square-grid SVG rendering of a character sequence.
//!
//! A sequence of `n²` characters becomes an `n × n` grid of flat-coloured
//! squares filling a fixed canvas, row-major, with no spacing or padding.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::color::ColorTable;
use crate::core::{grid_side, GridCell, HueError, HueResult, CANONICAL_SEQUENCE};

const SVG_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<svg
   width="{size}"
   height="{size}"
   viewBox="0 0 {size} {size}"
   version="1.1"
   xmlns="http://www.w3.org/2000/svg"
   xmlns:svg="http://www.w3.org/2000/svg"
   xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
   xmlns:cc="http://creativecommons.org/ns#"
   xmlns:dc="http://purl.org/dc/elements/1.1/">
  <metadata>
    <rdf:RDF>
      <cc:Work
         rdf:about="">
        <dc:format>image/svg+xml</dc:format>
        <dc:type
           rdf:resource="http://purl.org/dc/dcmitype/StillImage" />
      </cc:Work>
    </rdf:RDF>
  </metadata>
  <g
     id="layer1">
"#;

const SVG_FOOTER: &str = "  </g>\n</svg>\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Width and height of the square canvas, in user units.
    pub canvas_size: f64,
    /// Decimals printed for each colour channel.
    pub precision: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas_size: 1000.0,
            precision: 6,
        }
    }
}

impl RenderConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a non-positive canvas or more than 15 decimals.
    pub fn validate(&self) -> HueResult<()> {
        if !(self.canvas_size.is_finite() && self.canvas_size > 0.0) {
            return Err(HueError::InvalidConfig(format!(
                "render.canvas_size must be positive, got {}",
                self.canvas_size
            )));
        }
        if self.precision > 15 {
            return Err(HueError::InvalidConfig(format!(
                "render.precision must be at most 15, got {}",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Renders character sequences against a borrowed colour table.
#[derive(Debug, Clone)]
pub struct GridRenderer<'t> {
    table: &'t ColorTable,
    config: RenderConfig,
}

impl<'t> GridRenderer<'t> {
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn new(table: &'t ColorTable, config: RenderConfig) -> HueResult<Self> {
        config.validate()?;
        Ok(Self { table, config })
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Place `chars` on a square grid, row-major.
    ///
    /// # Errors
    ///
    /// - `InvalidGridSize` unless `chars.len()` is a positive perfect square
    /// - `UnknownCharacter` for the first character missing from the table
    pub fn layout(&self, chars: &[char]) -> HueResult<Vec<GridCell>> {
        let side = grid_side(chars.len()).ok_or(HueError::InvalidGridSize(chars.len()))?;
        chars
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Ok(GridCell {
                    row: i / side,
                    column: i % side,
                    color: self.table.color_of(c)?,
                })
            })
            .collect()
    }

    /// Render `chars` as an SVG document.
    ///
    /// # Errors
    ///
    /// Same as [`GridRenderer::layout`].
    pub fn render(&self, chars: &[char]) -> HueResult<String> {
        let cells = self.layout(chars)?;
        let side = grid_side(cells.len()).ok_or(HueError::InvalidGridSize(cells.len()))?;
        let size = self.config.canvas_size;
        let cell = size / side as f64;

        let mut svg = SVG_HEADER.replace("{size}", &size.to_string());
        for c in &cells {
            svg.push_str(&format!(
                concat!(
                    "    <rect\n",
                    "       width=\"{w}\"\n",
                    "       height=\"{w}\"\n",
                    "       x=\"{x}\"\n",
                    "       y=\"{y}\"\n",
                    "       style=\"fill:{fill};stroke-width:0;stroke:rgb(0,0,0)\" />\n",
                ),
                w = cell,
                x = c.column as f64 * cell,
                y = c.row as f64 * cell,
                fill = c.color.to_css(self.config.precision),
            ));
        }
        svg.push_str(SVG_FOOTER);

        tracing::debug!(cells = cells.len(), side, "rendered grid");
        Ok(svg)
    }

    /// Render [`CANONICAL_SEQUENCE`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownCharacter` if the table lacks one of its characters.
    pub fn render_canonical(&self) -> HueResult<String> {
        let chars: Vec<char> = CANONICAL_SEQUENCE.chars().collect();
        self.render(&chars)
    }

    /// Render `chars` and write the document to `path`.
    ///
    /// # Errors
    ///
    /// Rendering errors, or `Io` if the file cannot be written.
    pub fn render_to_file<P: AsRef<Path>>(&self, chars: &[char], path: P) -> HueResult<()> {
        let svg = self.render(chars)?;
        fs::write(path.as_ref(), svg)?;
        tracing::info!(path = %path.as_ref().display(), "wrote grid");
        Ok(())
    }
}
