//! Persistence for embeddings and colour tables.
//!
//! - Embeddings: CSV, one `char,v1,v2,...` line per character, no header.
//! - Colours: CSV with a `character,hue,saturation,lightness` header.
//! - Colour table: versioned JSON carrying entries, axis bounds, the axis plan
//!   and the fixed channel values, everything the decoder needs.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::color::{AxisBounds, ColorEntry, ColorTable};
use crate::core::{HueError, HueResult};
use crate::reduce::AxisPlan;
use crate::training::EmbeddingTable;

/// Bumped whenever the table checkpoint layout changes.
pub const TABLE_FORMAT_VERSION: u32 = 1;

/// Serializable colour table.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableCheckpoint {
    pub version: u32,
    pub plan: AxisPlan,
    pub bounds: Vec<AxisBounds>,
    pub fixed_saturation: f64,
    pub fixed_lightness: f64,
    pub entries: Vec<ColorEntry>,
}

impl From<&ColorTable> for TableCheckpoint {
    fn from(table: &ColorTable) -> Self {
        Self {
            version: TABLE_FORMAT_VERSION,
            plan: table.plan().clone(),
            bounds: table.bounds().to_vec(),
            fixed_saturation: table.fixed_saturation(),
            fixed_lightness: table.fixed_lightness(),
            entries: table.entries().to_vec(),
        }
    }
}

impl TryFrom<TableCheckpoint> for ColorTable {
    type Error = HueError;

    fn try_from(data: TableCheckpoint) -> HueResult<Self> {
        if data.version != TABLE_FORMAT_VERSION {
            return Err(HueError::VersionMismatch {
                expected: TABLE_FORMAT_VERSION,
                found: data.version,
            });
        }
        ColorTable::from_parts(
            data.entries,
            data.bounds,
            data.plan,
            data.fixed_saturation,
            data.fixed_lightness,
        )
    }
}

fn ensure_parent(path: &Path) -> HueResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn table_to_json(table: &ColorTable) -> HueResult<String> {
    Ok(serde_json::to_string_pretty(&TableCheckpoint::from(table))?)
}

/// # Errors
///
/// `Json` for unparseable input, `VersionMismatch` for another layout version,
/// `MalformedTable` or `EmptyVocabulary` for inconsistent contents.
pub fn table_from_json(json: &str) -> HueResult<ColorTable> {
    let data: TableCheckpoint = serde_json::from_str(json)?;
    ColorTable::try_from(data)
}

/// Save a colour table as a JSON checkpoint, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_table(table: &ColorTable, path: &Path) -> HueResult<()> {
    let json = table_to_json(table)?;
    ensure_parent(path)?;
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), entries = table.len(), "saved colour table");
    Ok(())
}

/// # Errors
///
/// `Io` if the file cannot be read, otherwise as [`table_from_json`].
pub fn load_table(path: &Path) -> HueResult<ColorTable> {
    let json = fs::read_to_string(path)?;
    let table = table_from_json(&json)?;
    tracing::info!(path = %path.display(), entries = table.len(), "loaded colour table");
    Ok(table)
}

/// Embeddings as headerless `char,v1,v2,...` lines.
#[must_use]
pub fn embeddings_to_csv(table: &EmbeddingTable) -> String {
    let mut out = String::new();
    for (c, row) in table.chars.iter().zip(table.vectors.rows()) {
        out.push(*c);
        for v in row {
            out.push(',');
            out.push_str(&v.to_string());
        }
        out.push('\n');
    }
    out
}

/// Parse headerless `char,v1,v2,...` lines. Blank lines are skipped.
///
/// # Errors
///
/// `MalformedTable` for a bad character field, an unparseable value or rows of
/// unequal width; `EmptyVocabulary` when there are no rows.
pub fn embeddings_from_csv(csv: &str) -> HueResult<EmbeddingTable> {
    let mut chars = Vec::new();
    let mut flat = Vec::new();
    let mut width: Option<usize> = None;

    for (lineno, line) in csv.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let head = fields.next().unwrap_or_default();
        let mut head_chars = head.chars();
        let c = match (head_chars.next(), head_chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(HueError::MalformedTable(format!(
                    "line {}: expected a single character, found {head:?}",
                    lineno + 1
                )))
            }
        };
        let values = fields
            .map(|f| {
                f.trim().parse::<f32>().map_err(|e| {
                    HueError::MalformedTable(format!("line {}: {f:?}: {e}", lineno + 1))
                })
            })
            .collect::<HueResult<Vec<f32>>>()?;

        match width {
            None => width = Some(values.len()),
            Some(w) if w != values.len() => {
                return Err(HueError::MalformedTable(format!(
                    "line {}: {} values, expected {w}",
                    lineno + 1,
                    values.len()
                )))
            }
            Some(_) => {}
        }
        chars.push(c);
        flat.extend(values);
    }

    let ncols = width.ok_or(HueError::EmptyVocabulary)?;
    let vectors = Array2::from_shape_vec((chars.len(), ncols), flat)
        .map_err(|e| HueError::MalformedTable(format!("failed to reconstruct matrix: {e}")))?;
    EmbeddingTable::new(chars, vectors)
}

/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn save_embeddings(table: &EmbeddingTable, path: &Path) -> HueResult<()> {
    ensure_parent(path)?;
    fs::write(path, embeddings_to_csv(table))?;
    tracing::info!(path = %path.display(), rows = table.len(), dim = table.dim(), "saved embeddings");
    Ok(())
}

/// # Errors
///
/// `Io` if the file cannot be read, otherwise as [`embeddings_from_csv`].
pub fn load_embeddings(path: &Path) -> HueResult<EmbeddingTable> {
    embeddings_from_csv(&fs::read_to_string(path)?)
}

/// Colours as CSV with a `character,hue,saturation,lightness` header.
#[must_use]
pub fn colors_to_csv(table: &ColorTable) -> String {
    let mut out = String::from("character,hue,saturation,lightness\n");
    for e in table.entries() {
        out.push_str(&format!(
            "{},{},{},{}\n",
            e.character, e.hue, e.saturation, e.lightness
        ));
    }
    out
}

/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn save_colors(table: &ColorTable, path: &Path) -> HueResult<()> {
    ensure_parent(path)?;
    fs::write(path, colors_to_csv(table))?;
    tracing::info!(path = %path.display(), rows = table.len(), "saved colours");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorConfig, ColorNormalizer};
    use ndarray::array;

    fn make_table() -> ColorTable {
        let reduced = array![[0.0, 1.0, -1.0], [2.0, 0.5, 3.0], [1.0, 0.0, 0.0]];
        let plan = AxisPlan {
            strategy: "skewness".into(),
            order: vec![2, 0, 1],
            flip: vec![false, true, false],
        };
        ColorNormalizer::new(ColorConfig::default())
            .unwrap()
            .fit(&['光', '復', '香'], &reduced, plan)
            .unwrap()
    }

    #[test]
    fn test_table_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.json");
        let table = make_table();

        save_table(&table, &path).unwrap();
        let loaded = load_table(&path).unwrap();

        assert_eq!(loaded, table);
        assert_eq!(loaded.plan().order, vec![2, 0, 1]);
        assert_eq!(loaded.get('復').unwrap().color(), table.get('復').unwrap().color());
    }

    #[test]
    fn test_table_version_mismatch() {
        let json = table_to_json(&make_table()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["version"] = serde_json::json!(TABLE_FORMAT_VERSION + 1);
        let result = table_from_json(&value.to_string());
        assert!(matches!(
            result,
            Err(HueError::VersionMismatch { expected: TABLE_FORMAT_VERSION, .. })
        ));
    }

    #[test]
    fn test_table_inconsistent_contents() {
        let json = table_to_json(&make_table()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["entries"][0]["reduced"] = serde_json::json!([0.0]);
        assert!(matches!(
            table_from_json(&value.to_string()),
            Err(HueError::MalformedTable(_))
        ));
    }

    #[test]
    fn test_table_json_preserves_every_bit() {
        let reduced = Array2::from_shape_fn((5, 3), |(i, j)| {
            let n = (i * 3 + j + 1) as f64;
            (n / 3.0).sin() / 7.0 + 1.0 / n
        });
        let plan = AxisPlan::identity("principal", 3);
        let table = ColorNormalizer::new(ColorConfig::default())
            .unwrap()
            .fit(&['光', '復', '香', '港', '時'], &reduced, plan)
            .unwrap();

        let loaded = table_from_json(&table_to_json(&table).unwrap()).unwrap();
        assert_eq!(loaded, table);
        for (a, b) in loaded.entries().iter().zip(table.entries()) {
            for (x, y) in a.reduced.iter().zip(&b.reduced) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
            assert_eq!(a.hue.to_bits(), b.hue.to_bits());
        }
    }

    #[test]
    fn test_table_bad_json() {
        assert!(matches!(table_from_json("{"), Err(HueError::Json(_))));
    }

    #[test]
    fn test_embeddings_csv_round_trip() {
        let table = EmbeddingTable::new(
            vec!['光', '復'],
            array![[0.125_f32, -1.5, 3.0e-5], [2.0, 0.1, -0.333_333_34]],
        )
        .unwrap();
        let csv = embeddings_to_csv(&table);
        assert!(csv.starts_with("光,0.125,-1.5,"));
        assert_eq!(embeddings_from_csv(&csv).unwrap(), table);
    }

    #[test]
    fn test_embeddings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.csv");
        let table = EmbeddingTable::new(vec!['港'], array![[1.0_f32, 2.0]]).unwrap();
        save_embeddings(&table, &path).unwrap();
        assert_eq!(load_embeddings(&path).unwrap(), table);
    }

    #[test]
    fn test_embeddings_csv_errors() {
        assert!(matches!(
            embeddings_from_csv("光,1.0\n復,1.0,2.0\n"),
            Err(HueError::MalformedTable(_))
        ));
        assert!(matches!(
            embeddings_from_csv("光復,1.0\n"),
            Err(HueError::MalformedTable(_))
        ));
        assert!(matches!(
            embeddings_from_csv("光,x\n"),
            Err(HueError::MalformedTable(_))
        ));
        assert!(matches!(embeddings_from_csv("\n\n"), Err(HueError::EmptyVocabulary)));
    }

    #[test]
    fn test_colors_csv() {
        let table = make_table();
        let csv = colors_to_csv(&table);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("character,hue,saturation,lightness"));
        assert_eq!(csv.lines().count(), 4);
        assert!(lines.next().unwrap().starts_with("光,"));
    }
}
