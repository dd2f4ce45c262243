//! Recovering a character sequence from a rendered grid.
//!
//! Each `<rect>` is parsed for its geometry and `hsl(...)` fill, the colour is
//! mapped back into reduced space through the table's axis bounds, and the
//! nearest table entry wins. Decoding is all-or-nothing: one bad cell fails the
//! whole artifact.

use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::color::ColorTable;
use crate::core::{grid_side, GridCell, HueError, HueResult, Hsl};
use crate::utils::squared_distance;

/// SVG cell patterns, compiled once per process.
static CELL_PATTERNS: OnceLock<CellPatterns> = OnceLock::new();

#[derive(Debug)]
struct CellPatterns {
    rect: Regex,
    attr: Regex,
    fill: Regex,
}

impl CellPatterns {
    fn new() -> Self {
        Self {
            rect: Regex::new(r"(?s)<rect\b([^>]*)>").expect("rect regex must compile"),
            attr: Regex::new(r#"(?:^|\s)(x|y|width)\s*=\s*"([^"]*)""#)
                .expect("attribute regex must compile"),
            fill: Regex::new(r"(?s)fill\s*:\s*hsl\(([^)]*)\)").expect("fill regex must compile"),
        }
    }

    fn get() -> &'static Self {
        CELL_PATTERNS.get_or_init(Self::new)
    }
}

/// Nearest-neighbour lookup over a table's reduced coordinates.
pub trait NearestIndex: Sync {
    /// Position of the entry closest to `point`, earliest on ties.
    fn nearest(&self, point: &[f64]) -> Option<usize>;
}

/// Brute-force scan over every entry.
#[derive(Debug, Clone)]
pub struct LinearScan {
    points: Vec<Vec<f64>>,
}

impl LinearScan {
    #[must_use]
    pub fn from_table(table: &ColorTable) -> Self {
        Self {
            points: table.entries().iter().map(|e| e.reduced.clone()).collect(),
        }
    }
}

impl NearestIndex for LinearScan {
    fn nearest(&self, point: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let d = squared_distance(p, point);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Extract every cell of an SVG grid, ordered row-major by geometry.
///
/// # Errors
///
/// - `MalformedArtifact` if there are no rects, or a rect lacks readable
///   geometry or an `hsl(...)` fill, or two rects share a position
/// - `InvalidGridSize` if the rect count is not a perfect square
pub fn parse_cells(svg: &str) -> HueResult<Vec<GridCell>> {
    let patterns = CellPatterns::get();
    let (rect_re, attr_re, fill_re) = (&patterns.rect, &patterns.attr, &patterns.fill);

    let mut located = Vec::new();
    for (cell, caps) in rect_re.captures_iter(svg).enumerate() {
        let body = &caps[1];
        let malformed = |reason: String| HueError::MalformedArtifact { cell, reason };

        let (mut x, mut y, mut width) = (None, None, None);
        for attr in attr_re.captures_iter(body) {
            let value = parse_number(&attr[2]).map_err(&malformed)?;
            match &attr[1] {
                "x" => x = Some(value),
                "y" => y = Some(value),
                _ => width = Some(value),
            }
        }
        let width = width.ok_or_else(|| malformed("missing width".into()))?;
        if width <= 0.0 {
            return Err(malformed(format!("non-positive width {width}")));
        }
        let x = x.unwrap_or(0.0);
        let y = y.unwrap_or(0.0);

        let fill = fill_re
            .captures(body)
            .ok_or_else(|| malformed("missing hsl fill".into()))?;
        let color = parse_hsl(&fill[1]).map_err(&malformed)?;

        let row = grid_index(y / width).map_err(&malformed)?;
        let column = grid_index(x / width).map_err(&malformed)?;
        located.push((cell, GridCell { row, column, color }));
    }

    if located.is_empty() {
        return Err(HueError::MalformedArtifact {
            cell: 0,
            reason: "no <rect> elements".into(),
        });
    }
    let side = grid_side(located.len()).ok_or(HueError::InvalidGridSize(located.len()))?;

    let mut seen = HashSet::with_capacity(located.len());
    for (cell, c) in &located {
        if c.row >= side || c.column >= side {
            return Err(HueError::MalformedArtifact {
                cell: *cell,
                reason: format!("position ({}, {}) outside a {side}×{side} grid", c.row, c.column),
            });
        }
        if !seen.insert((c.row, c.column)) {
            return Err(HueError::MalformedArtifact {
                cell: *cell,
                reason: format!("duplicate position ({}, {})", c.row, c.column),
            });
        }
    }

    located.sort_by_key(|(_, c)| (c.row, c.column));
    Ok(located.into_iter().map(|(_, c)| c).collect())
}

fn parse_number(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim().trim_end_matches('%').trim_end();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("unreadable number {raw:?}")),
    }
}

fn parse_hsl(raw: &str) -> Result<Hsl, String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 hsl components, found {}", parts.len()));
    }
    Ok(Hsl::new(
        parse_number(parts[0])?,
        parse_number(parts[1])?,
        parse_number(parts[2])?,
    ))
}

fn grid_index(ratio: f64) -> Result<usize, String> {
    let rounded = ratio.round();
    if rounded < 0.0 || (ratio - rounded).abs() > 1e-6 {
        return Err(format!("position {ratio} is not on the grid"));
    }
    Ok(rounded as usize)
}

/// Decodes grids rendered from a borrowed colour table.
pub struct GridDecoder<'t, I: NearestIndex = LinearScan> {
    table: &'t ColorTable,
    index: I,
}

impl<'t> GridDecoder<'t, LinearScan> {
    #[must_use]
    pub fn new(table: &'t ColorTable) -> Self {
        Self {
            table,
            index: LinearScan::from_table(table),
        }
    }
}

impl<'t, I: NearestIndex> GridDecoder<'t, I> {
    /// Use a custom nearest-neighbour index built over `table`'s entries.
    pub fn with_index(table: &'t ColorTable, index: I) -> Self {
        Self { table, index }
    }

    /// Decode an SVG document into characters, row-major.
    ///
    /// # Errors
    ///
    /// See [`parse_cells`].
    pub fn decode(&self, svg: &str) -> HueResult<Vec<char>> {
        let cells = parse_cells(svg)?;
        let chars = self.resolve(&cells)?;
        tracing::debug!(cells = cells.len(), "decoded grid");
        Ok(chars)
    }

    /// # Errors
    ///
    /// `Io` if `path` cannot be read, otherwise as [`GridDecoder::decode`].
    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> HueResult<Vec<char>> {
        let svg = fs::read_to_string(path.as_ref())?;
        self.decode(&svg)
    }

    /// Map each cell's colour to its nearest table character, preserving order.
    ///
    /// # Errors
    ///
    /// `MalformedTable` if the index yields no entry for a cell.
    pub fn resolve(&self, cells: &[GridCell]) -> HueResult<Vec<char>> {
        let entries = self.table.entries();
        cells
            .par_iter()
            .map(|cell| {
                let point = self.table.invert(&cell.color);
                tracing::trace!(
                    row = cell.row,
                    column = cell.column,
                    principal = ?self.table.plan().unapply(&point),
                    "cell inverted"
                );
                self.index
                    .nearest(&point)
                    .and_then(|i| entries.get(i))
                    .map(|e| e.character)
                    .ok_or_else(|| {
                        HueError::MalformedTable("nearest-neighbour index returned no entry".into())
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorConfig, ColorNormalizer};
    use crate::reduce::AxisPlan;
    use crate::render::{GridRenderer, RenderConfig};
    use ndarray::{array, Array2};

    fn table() -> ColorTable {
        let reduced = array![
            [0.0, 0.0, 0.0],
            [1.0, 2.0, 0.5],
            [2.0, 1.0, 1.0],
            [3.0, 3.0, 0.2],
        ];
        ColorNormalizer::new(ColorConfig::default())
            .unwrap()
            .fit(&['甲', '乙', '丙', '丁'], &reduced, AxisPlan::identity("principal", 3))
            .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let table = table();
        let svg = GridRenderer::new(&table, RenderConfig::default())
            .unwrap()
            .render(&['丁', '甲', '丙', '乙'])
            .unwrap();
        let decoded = GridDecoder::new(&table).decode(&svg).unwrap();
        assert_eq!(decoded, vec!['丁', '甲', '丙', '乙']);
    }

    #[test]
    fn test_single_cell_round_trip() {
        let table = table();
        let renderer = GridRenderer::new(&table, RenderConfig::default()).unwrap();
        let decoder = GridDecoder::new(&table);
        for entry in table.entries() {
            let svg = renderer.render(&[entry.character]).unwrap();
            assert_eq!(decoder.decode(&svg).unwrap(), vec![entry.character]);
        }
    }

    #[test]
    fn test_cells_ordered_by_geometry() {
        let svg = r#"
            <rect width="10" height="10" x="10" y="10" style="fill:hsl(3, 1%, 1%)" />
            <rect width="10" height="10" x="0" y="0" style="fill:hsl(0, 1%, 1%)" />
            <rect width="10" height="10" x="0" y="10" style="fill:hsl(2, 1%, 1%)" />
            <rect width="10" height="10" x="10" y="0" style="fill:hsl(1, 1%, 1%)" />
        "#;
        let hues: Vec<f64> = parse_cells(svg).unwrap().iter().map(|c| c.color.hue).collect();
        assert_eq!(hues, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_multiline_fill_tolerated() {
        let svg = "<rect\n width=\"250\"\n height=\"250\"\n x=\"0\"\n y=\"0\"\n \
                   style=\"fill:hsl(\n 12.5,\n 60 %,\n 75%);\n stroke-width:0\" />";
        let cells = parse_cells(svg).unwrap();
        assert_eq!(cells[0].color, Hsl::new(12.5, 60.0, 75.0));
    }

    #[test]
    fn test_garbage_fill_is_malformed() {
        let svg = r#"<rect width="10" x="0" y="0" style="fill:hsl(abc, 50%, 50%)" />"#;
        assert!(matches!(
            parse_cells(svg),
            Err(HueError::MalformedArtifact { cell: 0, .. })
        ));
        let svg = r#"<rect width="10" x="0" y="0" style="fill:hsl(NaN, 50%, 50%)" />"#;
        assert!(matches!(parse_cells(svg), Err(HueError::MalformedArtifact { .. })));
    }

    #[test]
    fn test_missing_fill_is_malformed() {
        let svg = r#"<rect width="10" x="0" y="0" style="fill:rgb(1,2,3)" />"#;
        assert!(matches!(parse_cells(svg), Err(HueError::MalformedArtifact { .. })));
    }

    #[test]
    fn test_no_rects() {
        assert!(matches!(
            parse_cells("<svg></svg>"),
            Err(HueError::MalformedArtifact { .. })
        ));
    }

    #[test]
    fn test_non_square_count() {
        let svg = r#"
            <rect width="10" x="0" y="0" style="fill:hsl(0, 1%, 1%)" />
            <rect width="10" x="10" y="0" style="fill:hsl(0, 1%, 1%)" />
        "#;
        assert!(matches!(parse_cells(svg), Err(HueError::InvalidGridSize(2))));
    }

    #[test]
    fn test_duplicate_position() {
        let svg = r#"
            <rect width="10" x="0" y="0" style="fill:hsl(0, 1%, 1%)" />
            <rect width="10" x="0" y="0" style="fill:hsl(0, 1%, 1%)" />
            <rect width="10" x="0" y="10" style="fill:hsl(0, 1%, 1%)" />
            <rect width="10" x="10" y="10" style="fill:hsl(0, 1%, 1%)" />
        "#;
        assert!(matches!(
            parse_cells(svg),
            Err(HueError::MalformedArtifact { cell: 1, .. })
        ));
    }

    #[test]
    fn test_linear_scan_ties_prefer_first() {
        let scan = LinearScan {
            points: vec![vec![1.0], vec![-1.0], vec![5.0]],
        };
        assert_eq!(scan.nearest(&[0.0]), Some(0));
        assert_eq!(scan.nearest(&[4.0]), Some(2));
        let empty = LinearScan { points: vec![] };
        assert_eq!(empty.nearest(&[0.0]), None);
    }

    #[test]
    fn test_decode_file() {
        let table = table();
        let renderer = GridRenderer::new(&table, RenderConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.svg");
        renderer.render_to_file(&['乙'], &path).unwrap();
        assert_eq!(GridDecoder::new(&table).decode_file(&path).unwrap(), vec!['乙']);
    }

    fn wide_table(n: usize) -> ColorTable {
        let chars: Vec<char> = (0..n as u32)
            .filter_map(|i| char::from_u32(0x4E00 + i))
            .collect();
        let reduced = Array2::from_shape_fn((n, 3), |(i, j)| {
            let stride = [1, 7, 13][j];
            ((i * stride) % n) as f64
        });
        ColorNormalizer::new(ColorConfig::default())
            .unwrap()
            .fit(&chars, &reduced, AxisPlan::identity("principal", 3))
            .unwrap()
    }

    #[test]
    fn test_round_trip_fractional_cell_sizes() {
        let table = wide_table(49);
        let decoder = GridDecoder::new(&table);
        for canvas_size in [1000.0, 999.0] {
            let config = RenderConfig {
                canvas_size,
                ..RenderConfig::default()
            };
            let renderer = GridRenderer::new(&table, config).unwrap();
            for side in [3, 7] {
                let chars: Vec<char> = table
                    .entries()
                    .iter()
                    .rev()
                    .take(side * side)
                    .map(|e| e.character)
                    .collect();
                let svg = renderer.render(&chars).unwrap();
                assert_eq!(decoder.decode(&svg).unwrap(), chars, "{side}x{side} on {canvas_size}");
            }
        }
    }

    #[test]
    fn test_cell_patterns_compiled_once() {
        assert!(std::ptr::eq(CellPatterns::get(), CellPatterns::get()));
    }
}
