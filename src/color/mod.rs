//! Reduced coordinates to HSL colours, and back.
//!
//! ## Forward transform
//!
//! Reduced axis `i` feeds channel `i` (hue, saturation, lightness). Each axis
//! is min-max scaled over the whole table into its channel's target range:
//! ```text
//! target = low + (v - min) / (max - min) · (high - low)
//! ```
//! Channels without an axis take a fixed value.
//!
//! ## Inverse transform
//!
//! ```text
//! v = (observed - low) / (high - low) · (max - min) + min
//! ```
//! Exact in real arithmetic. The only loss in a render/decode round trip is
//! the decimal precision the colour is printed with.
//!
//! An axis whose values are all equal maps to `low` and inverts to `min`.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{HueError, HueResult, Hsl};
use crate::data::min_max;
use crate::reduce::{AxisPlan, MAX_COMPONENTS};

/// An HSL channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Hue,
    Saturation,
    Lightness,
}

impl Channel {
    /// Channels in the order reduced axes are assigned to them.
    pub const ALL: [Channel; MAX_COMPONENTS] =
        [Channel::Hue, Channel::Saturation, Channel::Lightness];
}

/// Closed target interval for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub low: f64,
    pub high: f64,
}

impl ChannelRange {
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    #[must_use]
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    fn check(&self, name: &str, ceiling: f64, inclusive: bool) -> HueResult<()> {
        let below_ceiling = if inclusive {
            self.high <= ceiling
        } else {
            self.high < ceiling
        };
        if !(self.low >= 0.0 && self.low < self.high && below_ceiling) {
            return Err(HueError::InvalidConfig(format!(
                "color.{name} range [{}, {}] must satisfy 0 <= low < high {} {ceiling}",
                self.low,
                self.high,
                if inclusive { "<=" } else { "<" }
            )));
        }
        Ok(())
    }
}

/// Target ranges for the colour channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Hue range in degrees. The upper end stays below 360 so the table's
    /// two extremes never meet at the wrap-around.
    pub hue: ChannelRange,
    pub saturation: ChannelRange,
    pub lightness: ChannelRange,
    /// Saturation used when fewer than two axes are kept.
    pub fixed_saturation: f64,
    /// Lightness used when fewer than three axes are kept.
    pub fixed_lightness: f64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            hue: ChannelRange::new(0.0, 359.0),
            saturation: ChannelRange::new(50.0, 100.0),
            lightness: ChannelRange::new(50.0, 100.0),
            fixed_saturation: 100.0,
            fixed_lightness: 50.0,
        }
    }
}

impl ColorConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for empty, inverted or out-of-gamut ranges.
    pub fn validate(&self) -> HueResult<()> {
        self.hue.check("hue", 360.0, false)?;
        self.saturation.check("saturation", 100.0, true)?;
        self.lightness.check("lightness", 100.0, true)?;
        for (name, value) in [
            ("fixed_saturation", self.fixed_saturation),
            ("fixed_lightness", self.fixed_lightness),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(HueError::InvalidConfig(format!(
                    "color.{name} = {value} must lie in [0, 100]"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn range(&self, channel: Channel) -> ChannelRange {
        match channel {
            Channel::Hue => self.hue,
            Channel::Saturation => self.saturation,
            Channel::Lightness => self.lightness,
        }
    }
}

/// Observed extent of one reduced axis and the channel range it was scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub channel: Channel,
    pub min: f64,
    pub max: f64,
    pub target: ChannelRange,
}

impl AxisBounds {
    /// Reduced value to channel value.
    #[must_use]
    pub fn forward(&self, value: f64) -> f64 {
        let extent = self.max - self.min;
        if extent == 0.0 {
            return self.target.low;
        }
        self.target.low + (value - self.min) / extent * self.target.span()
    }

    /// Channel value to reduced value.
    #[must_use]
    pub fn inverse(&self, observed: f64) -> f64 {
        let extent = self.max - self.min;
        if extent == 0.0 {
            return self.min;
        }
        (observed - self.target.low) / self.target.span() * extent + self.min
    }
}

/// One character's colour and the reduced coordinates it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorEntry {
    pub character: char,
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    /// Coordinates in colour-axis order, after the axis plan.
    pub reduced: Vec<f64>,
}

impl ColorEntry {
    #[must_use]
    pub fn color(&self) -> Hsl {
        Hsl::new(self.hue, self.saturation, self.lightness)
    }
}

/// The trained character → colour mapping.
///
/// Immutable once built. Renderer and decoder both borrow the same table,
/// which carries everything needed to invert its colours.
#[derive(Debug, Clone)]
pub struct ColorTable {
    entries: Vec<ColorEntry>,
    bounds: Vec<AxisBounds>,
    plan: AxisPlan,
    fixed_saturation: f64,
    fixed_lightness: f64,
    index: HashMap<char, usize>,
}

impl PartialEq for ColorTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
            && self.bounds == other.bounds
            && self.plan == other.plan
            && self.fixed_saturation == other.fixed_saturation
            && self.fixed_lightness == other.fixed_lightness
    }
}

impl ColorTable {
    /// Assemble a table, checking that every piece agrees on the axis count.
    ///
    /// # Errors
    ///
    /// - `EmptyVocabulary` if `entries` is empty
    /// - `MalformedTable` on inconsistent axis counts or channel order
    pub fn from_parts(
        entries: Vec<ColorEntry>,
        bounds: Vec<AxisBounds>,
        plan: AxisPlan,
        fixed_saturation: f64,
        fixed_lightness: f64,
    ) -> HueResult<Self> {
        if entries.is_empty() {
            return Err(HueError::EmptyVocabulary);
        }
        let k = bounds.len();
        if k == 0 || k > MAX_COMPONENTS {
            return Err(HueError::MalformedTable(format!(
                "expected 1..={MAX_COMPONENTS} axis bounds, found {k}"
            )));
        }
        if plan.len() != k {
            return Err(HueError::MalformedTable(format!(
                "axis plan covers {} axes but table has {k}",
                plan.len()
            )));
        }
        for (bound, expected) in bounds.iter().zip(Channel::ALL) {
            if bound.channel != expected {
                return Err(HueError::MalformedTable(format!(
                    "axis bound for {:?} found where {expected:?} was expected",
                    bound.channel
                )));
            }
        }
        if let Some(entry) = entries.iter().find(|e| e.reduced.len() != k) {
            return Err(HueError::MalformedTable(format!(
                "entry '{}' has {} reduced coordinates, expected {k}",
                entry.character,
                entry.reduced.len()
            )));
        }

        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            index.entry(entry.character).or_insert(i);
        }

        Ok(Self {
            entries,
            bounds,
            plan,
            fixed_saturation,
            fixed_lightness,
            index,
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[ColorEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of reduced axes.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.bounds.len()
    }

    #[must_use]
    pub fn bounds(&self) -> &[AxisBounds] {
        &self.bounds
    }

    #[must_use]
    pub fn plan(&self) -> &AxisPlan {
        &self.plan
    }

    #[must_use]
    pub fn fixed_saturation(&self) -> f64 {
        self.fixed_saturation
    }

    #[must_use]
    pub fn fixed_lightness(&self) -> f64 {
        self.fixed_lightness
    }

    #[must_use]
    pub fn get(&self, c: char) -> Option<&ColorEntry> {
        self.index.get(&c).map(|&i| &self.entries[i])
    }

    /// # Errors
    ///
    /// Returns `UnknownCharacter` if `c` has no entry.
    pub fn color_of(&self, c: char) -> HueResult<Hsl> {
        self.get(c)
            .map(ColorEntry::color)
            .ok_or(HueError::UnknownCharacter(c))
    }

    /// Recover approximate reduced coordinates from an observed colour.
    #[must_use]
    pub fn invert(&self, color: &Hsl) -> Vec<f64> {
        let channels = color.channels();
        self.bounds
            .iter()
            .zip(channels)
            .map(|(bound, observed)| bound.inverse(observed))
            .collect()
    }

    /// Character pairs whose colours print identically at `precision` decimals.
    #[must_use]
    pub fn collisions(&self, precision: usize) -> Vec<(char, char)> {
        let mut seen: HashMap<String, char> = HashMap::new();
        let mut pairs = Vec::new();
        for entry in &self.entries {
            let css = entry.color().to_css(precision);
            match seen.get(&css) {
                Some(&first) => pairs.push((first, entry.character)),
                None => {
                    seen.insert(css, entry.character);
                }
            }
        }
        pairs
    }

    /// # Errors
    ///
    /// Returns `ColorCollision` for the first colliding pair, if any.
    pub fn validate_distinct(&self, precision: usize) -> HueResult<()> {
        match self.collisions(precision).first() {
            Some(&(first, second)) => Err(HueError::ColorCollision { first, second }),
            None => Ok(()),
        }
    }
}

/// Fits per-axis bounds over a reduced table and emits its colours.
#[derive(Debug, Clone)]
pub struct ColorNormalizer {
    config: ColorConfig,
}

impl ColorNormalizer {
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the channel ranges do not validate.
    pub fn new(config: ColorConfig) -> HueResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build the colour table for `chars` from their reduced coordinates.
    ///
    /// # Errors
    ///
    /// - `EmptyVocabulary` for an empty table
    /// - `MalformedTable` if `chars`, `reduced` and `plan` disagree in shape
    pub fn fit(
        &self,
        chars: &[char],
        reduced: &Array2<f64>,
        plan: AxisPlan,
    ) -> HueResult<ColorTable> {
        if chars.is_empty() {
            return Err(HueError::EmptyVocabulary);
        }
        if chars.len() != reduced.nrows() {
            return Err(HueError::MalformedTable(format!(
                "{} characters but {} reduced rows",
                chars.len(),
                reduced.nrows()
            )));
        }
        let k = reduced.ncols();
        if k == 0 || k > MAX_COMPONENTS {
            return Err(HueError::MalformedTable(format!(
                "expected 1..={MAX_COMPONENTS} reduced axes, found {k}"
            )));
        }

        let bounds: Vec<AxisBounds> = Channel::ALL
            .iter()
            .take(k)
            .enumerate()
            .map(|(axis, &channel)| {
                let (min, max) = min_max(reduced.column(axis).iter().copied())
                    .unwrap_or((0.0, 0.0));
                AxisBounds {
                    channel,
                    min,
                    max,
                    target: self.config.range(channel),
                }
            })
            .collect();

        let entries = chars
            .iter()
            .zip(reduced.rows())
            .map(|(&character, row)| {
                let channel = |axis: usize, fixed: f64| {
                    bounds.get(axis).map_or(fixed, |b| b.forward(row[axis]))
                };
                ColorEntry {
                    character,
                    hue: channel(0, 0.0),
                    saturation: channel(1, self.config.fixed_saturation),
                    lightness: channel(2, self.config.fixed_lightness),
                    reduced: row.to_vec(),
                }
            })
            .collect();

        for b in &bounds {
            tracing::debug!(channel = ?b.channel, min = b.min, max = b.max, "axis bounds");
        }

        ColorTable::from_parts(
            entries,
            bounds,
            plan,
            self.config.fixed_saturation,
            self.config.fixed_lightness,
        )
    }
}
