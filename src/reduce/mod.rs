//! Principal-component reduction of the embedding table.
//!
//! The table is centred column-wise, its D×D covariance is formed, and the
//! top `k` eigenvectors are extracted by power iteration with deflation.
//! Each eigenvector is oriented so that its largest-magnitude loading is
//! positive, which pins down the otherwise arbitrary sign of every axis.
//!
//! After projection an [`AxisStrategy`] decides which component feeds which
//! colour channel and whether any axis is mirrored. The resulting
//! [`AxisPlan`] belongs to the whole table and travels with it.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::core::{HueError, HueResult};
use crate::training::EmbeddingTable;
use crate::utils::skewness;

/// Most axes a colour can carry: hue, saturation, lightness.
pub const MAX_COMPONENTS: usize = 3;

const POWER_ITERATIONS: usize = 1000;
const POWER_TOLERANCE: f64 = 1e-12;

/// Which axis-selection rule to run after PCA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisStrategyKind {
    /// Keep explained-variance order.
    Principal,
    /// Reorder and mirror axes by skewness.
    Skewness,
}

/// Reducer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Number of principal components kept (1..=3).
    pub components: usize,
    pub strategy: AxisStrategyKind,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            components: 3,
            strategy: AxisStrategyKind::Skewness,
        }
    }
}

impl ReducerConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `1 <= components <= 3`.
    pub fn validate(&self) -> HueResult<()> {
        if self.components == 0 || self.components > MAX_COMPONENTS {
            return Err(HueError::InvalidConfig(format!(
                "reducer.components must be in 1..={MAX_COMPONENTS}, got {}",
                self.components
            )));
        }
        Ok(())
    }

    /// The configured strategy as a trait object.
    #[must_use]
    pub fn strategy(&self) -> Box<dyn AxisStrategy> {
        match self.strategy {
            AxisStrategyKind::Principal => Box::new(PrincipalOrder),
            AxisStrategyKind::Skewness => Box::new(SkewnessHeuristic),
        }
    }
}

/// Permutation and mirroring applied to the principal components.
///
/// Output axis `i` is principal component `order[i]`, negated when `flip[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisPlan {
    /// Name of the strategy that chose this plan.
    pub strategy: String,
    pub order: Vec<usize>,
    pub flip: Vec<bool>,
}

impl AxisPlan {
    /// Identity plan over `k` axes.
    #[must_use]
    pub fn identity(strategy: &str, k: usize) -> Self {
        Self {
            strategy: strategy.to_string(),
            order: (0..k).collect(),
            flip: vec![false; k],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reorder and mirror the columns of `components`.
    #[must_use]
    pub fn apply(&self, components: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((components.nrows(), self.order.len()));
        for (axis, (&source, &flip)) in self.order.iter().zip(&self.flip).enumerate() {
            let sign = if flip { -1.0 } else { 1.0 };
            out.column_mut(axis)
                .assign(&components.column(source).mapv(|v| sign * v));
        }
        out
    }

    /// Map one reduced point back to principal-component order.
    #[must_use]
    pub fn unapply(&self, point: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.order.len()];
        for (axis, (&source, &flip)) in self.order.iter().zip(&self.flip).enumerate() {
            if let Some(&v) = point.get(axis) {
                out[source] = if flip { -v } else { v };
            }
        }
        out
    }
}

/// Chooses how principal components map onto colour axes.
///
/// Implementations must be deterministic: the same components always give
/// the same plan.
pub trait AxisStrategy {
    fn name(&self) -> &'static str;

    /// Pick a plan for the N×k projected table.
    fn choose_axes(&self, components: &Array2<f64>) -> AxisPlan;
}

/// Keeps explained-variance order with no mirroring.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalOrder;

impl AxisStrategy for PrincipalOrder {
    fn name(&self) -> &'static str {
        "principal"
    }

    fn choose_axes(&self, components: &Array2<f64>) -> AxisPlan {
        AxisPlan::identity(self.name(), components.ncols())
    }
}

/// Skewness-driven reordering.
///
/// Hue receives the axis with the lowest skewness; saturation receives the
/// more skewed of the remaining two and is mirrored when its skewness is
/// positive, so that its long tail points towards low saturation values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkewnessHeuristic;

impl AxisStrategy for SkewnessHeuristic {
    fn name(&self) -> &'static str {
        "skewness"
    }

    fn choose_axes(&self, components: &Array2<f64>) -> AxisPlan {
        let k = components.ncols();
        let mut plan = AxisPlan::identity(self.name(), k);
        if k < 2 {
            return plan;
        }

        let skews: Vec<f64> = components
            .columns()
            .into_iter()
            .map(|col| skewness(&col.to_vec()))
            .collect();
        let skew_at = |order: &[usize], axis: usize| skews[order[axis]];

        if skew_at(&plan.order, 0) > skew_at(&plan.order, 1) {
            plan.order.swap(0, 1);
        }
        if k == 3 {
            if skew_at(&plan.order, 0) > skew_at(&plan.order, 2) {
                plan.order.swap(0, 2);
            }
            if skew_at(&plan.order, 1) < skew_at(&plan.order, 2) {
                plan.order.swap(1, 2);
            }
        }
        if skew_at(&plan.order, 1) > 0.0 {
            plan.flip[1] = true;
        }
        plan
    }
}

/// Principal-component projection of an embedding table.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub chars: Vec<char>,
    /// N×k scores in explained-variance order.
    pub components: Array2<f64>,
    /// k×D unit eigenvectors, one per row.
    pub basis: Array2<f64>,
    /// Variance captured by each component.
    pub explained_variance: Vec<f64>,
}

/// Project `table` onto its top `k` principal components.
///
/// # Errors
///
/// Returns `InvalidConfig` if `k` is outside `1..=3` or exceeds the
/// embedding dimensionality.
pub fn principal_components(table: &EmbeddingTable, k: usize) -> HueResult<Reduction> {
    if k == 0 || k > MAX_COMPONENTS {
        return Err(HueError::InvalidConfig(format!(
            "component count must be in 1..={MAX_COMPONENTS}, got {k}"
        )));
    }
    if k > table.dim() {
        return Err(HueError::InvalidConfig(format!(
            "cannot keep {k} components of {}-dimensional embeddings",
            table.dim()
        )));
    }

    let data = table.vectors.mapv(f64::from);
    let mean = data
        .mean_axis(Axis(0))
        .ok_or(HueError::EmptyVocabulary)?;
    let centered = &data - &mean;
    let denom = (data.nrows().saturating_sub(1)).max(1) as f64;
    let mut cov = centered.t().dot(&centered) / denom;

    let dim = table.dim();
    let mut basis = Array2::<f64>::zeros((k, dim));
    let mut explained_variance = Vec::with_capacity(k);

    for c in 0..k {
        let found = basis.slice(ndarray::s![..c, ..]).to_owned();
        let mut v = start_vector(&cov, &found);
        for _ in 0..POWER_ITERATIONS {
            let mut next = cov.dot(&v);
            orthogonalize(&mut next, &found);
            let norm = next.dot(&next).sqrt();
            if norm < POWER_TOLERANCE {
                // Remaining spectrum is zero: any orthogonal direction will do.
                break;
            }
            next /= norm;
            let converged = (1.0 - next.dot(&v).abs()) < POWER_TOLERANCE;
            v = next;
            if converged {
                break;
            }
        }
        orient(&mut v);

        let eigenvalue = v.dot(&cov.dot(&v)).max(0.0);
        // Deflate: cov -= λ v vᵀ
        let outer = outer_product(&v);
        cov.scaled_add(-eigenvalue, &outer);

        basis.row_mut(c).assign(&v);
        explained_variance.push(eigenvalue);
    }

    let components = centered.dot(&basis.t());
    tracing::debug!(?explained_variance, "principal components extracted");

    Ok(Reduction {
        chars: table.chars.clone(),
        components,
        basis,
        explained_variance,
    })
}

/// Largest-norm column of `cov` not already spanned by `found`, falling
/// back to the first usable standard basis vector.
fn start_vector(cov: &Array2<f64>, found: &Array2<f64>) -> Array1<f64> {
    let dim = cov.nrows();
    let mut columns: Vec<Array1<f64>> = cov.columns().into_iter().map(|c| c.to_owned()).collect();
    columns.sort_by(|a, b| {
        b.dot(b)
            .partial_cmp(&a.dot(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let standard = (0..dim).map(|i| {
        let mut e = Array1::zeros(dim);
        e[i] = 1.0;
        e
    });

    for mut candidate in columns.into_iter().chain(standard) {
        orthogonalize(&mut candidate, found);
        let norm = candidate.dot(&candidate).sqrt();
        if norm > 1e-9 {
            return candidate / norm;
        }
    }
    // Only reachable when `found` already spans the space.
    Array1::zeros(dim)
}

/// Remove the components of `v` along each row of `found` (Gram-Schmidt).
fn orthogonalize(v: &mut Array1<f64>, found: &Array2<f64>) {
    for row in found.rows() {
        let projection = v.dot(&row);
        v.scaled_add(-projection, &row);
    }
}

/// Flip `v` so that its largest-magnitude entry is positive.
fn orient(v: &mut Array1<f64>) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.mapv_inplace(|x| -x);
    }
}

fn outer_product(v: &Array1<f64>) -> Array2<f64> {
    let col = v.view().insert_axis(Axis(1));
    let row = v.view().insert_axis(Axis(0));
    col.dot(&row)
}

/// Run PCA and the configured axis strategy.
///
/// Returns the N×k table in colour-axis order together with the plan that
/// produced it.
///
/// # Errors
///
/// Propagates configuration errors from [`principal_components`].
pub fn reduce(
    table: &EmbeddingTable,
    config: &ReducerConfig,
) -> HueResult<(Reduction, AxisPlan, Array2<f64>)> {
    config.validate()?;
    let reduction = principal_components(table, config.components)?;
    let plan = config.strategy().choose_axes(&reduction.components);
    let reduced = plan.apply(&reduction.components);
    tracing::info!(
        strategy = %plan.strategy,
        order = ?plan.order,
        flip = ?plan.flip,
        "axis plan chosen"
    );
    Ok((reduction, plan, reduced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn table(vectors: Array2<f32>) -> EmbeddingTable {
        let chars = "甲乙丙丁戊己庚辛壬癸".chars().take(vectors.nrows()).collect();
        EmbeddingTable::new(chars, vectors).unwrap()
    }

    fn spread_table() -> EmbeddingTable {
        // Dominant variance along x, then y, then z, nothing along w.
        table(array![
            [10.0, 0.0, 0.0, 1.0],
            [-10.0, 0.0, 0.0, 1.0],
            [0.0, 5.0, 0.0, 1.0],
            [0.0, -5.0, 0.0, 1.0],
            [0.0, 0.0, 2.0, 1.0],
            [0.0, 0.0, -2.0, 1.0],
        ])
    }

    #[test]
    fn test_components_follow_variance() {
        let reduction = principal_components(&spread_table(), 3).unwrap();
        let ev = &reduction.explained_variance;
        assert!(ev[0] > ev[1] && ev[1] > ev[2]);
        assert_abs_diff_eq!(reduction.basis[[0, 0]].abs(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(reduction.basis[[1, 1]].abs(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(reduction.basis[[2, 2]].abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let vectors = Array2::from_shape_fn((8, 6), |(i, j)| ((i * 7 + j * 3) % 5) as f32 - 2.0);
        let reduction = principal_components(&table(vectors), 3).unwrap();
        let gram = reduction.basis.dot(&reduction.basis.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_orientation_is_positive() {
        let reduction = principal_components(&spread_table(), 2).unwrap();
        for row in reduction.basis.rows() {
            let pivot = row
                .iter()
                .copied()
                .fold(0.0f64, |b, x| if x.abs() > b.abs() { x } else { b });
            assert!(pivot > 0.0);
        }
    }

    #[test]
    fn test_scores_are_centered() {
        let reduction = principal_components(&spread_table(), 3).unwrap();
        for col in reduction.components.columns() {
            assert_abs_diff_eq!(col.sum(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_single_row_table() {
        let reduction = principal_components(&table(array![[1.0, 2.0, 3.0]]), 3).unwrap();
        assert_eq!(reduction.components.dim(), (1, 3));
        assert!(reduction.components.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_rejects_bad_component_counts() {
        assert!(principal_components(&spread_table(), 0).is_err());
        assert!(principal_components(&spread_table(), 4).is_err());
        let narrow = table(array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(principal_components(&narrow, 3).is_err());
    }

    #[test]
    fn test_skewness_heuristic_order() {
        // Column skews: 0 strongly positive, 1 symmetric, 2 strongly negative.
        let components = array![
            [0.0, -1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -2.0, 0.0],
            [0.0, 2.0, 0.0],
            [10.0, 0.0, -10.0],
        ];
        let plan = SkewnessHeuristic.choose_axes(&components);
        // Hue gets the lowest skew (col 2), saturation the higher remaining (col 0).
        assert_eq!(plan.order, vec![2, 0, 1]);
        assert_eq!(plan.flip, vec![false, true, false]);
        assert_eq!(plan.strategy, "skewness");
    }

    #[test]
    fn test_skewness_heuristic_two_axes() {
        let components = array![[10.0, 0.0], [0.0, 1.0], [0.0, -1.0], [0.0, 0.0]];
        let plan = SkewnessHeuristic.choose_axes(&components);
        assert_eq!(plan.order, vec![1, 0]);
        assert_eq!(plan.flip, vec![false, true]);
    }

    #[test]
    fn test_skewness_heuristic_one_axis() {
        let plan = SkewnessHeuristic.choose_axes(&array![[1.0], [5.0], [2.0]]);
        assert_eq!(plan, AxisPlan::identity("skewness", 1));
    }

    #[test]
    fn test_plan_apply_and_unapply() {
        let plan = AxisPlan {
            strategy: "test".into(),
            order: vec![2, 0, 1],
            flip: vec![false, true, false],
        };
        let components = array![[1.0, 2.0, 3.0]];
        let applied = plan.apply(&components);
        assert_eq!(applied, array![[3.0, -1.0, 2.0]]);
        assert_eq!(plan.unapply(&[3.0, -1.0, 2.0]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_reduce_records_plan() {
        let config = ReducerConfig {
            components: 2,
            strategy: AxisStrategyKind::Principal,
        };
        let (reduction, plan, reduced) = reduce(&spread_table(), &config).unwrap();
        assert_eq!(plan, AxisPlan::identity("principal", 2));
        assert_eq!(reduced, reduction.components);
    }
}
