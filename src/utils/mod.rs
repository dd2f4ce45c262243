//! Math utilities and summary statistics.

/// Logistic sigmoid.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Biased Fisher-Pearson coefficient of skewness: `m3 / m2^1.5`.
///
/// Returns `0.0` when the values are empty or have no spread.
pub fn skewness(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let n = values.len() as f64;
    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), &v| {
        let d = v - mu;
        (m2 + d * d, m3 + d * d * d)
    });
    let (m2, m3) = (m2 / n, m3 / n);
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

/// Squared Euclidean distance over the shorter of the two slices.
#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sigmoid() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5, epsilon = 1e-7);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_abs_diff_eq!(mean(&[1.0, 2.0, 6.0]), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_skewness_symmetric_is_zero() {
        assert_abs_diff_eq!(skewness(&[-2.0, -1.0, 0.0, 1.0, 2.0]), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_skewness_sign() {
        // Long right tail.
        assert!(skewness(&[0.0, 0.0, 0.0, 0.0, 10.0]) > 0.0);
        // Long left tail.
        assert!(skewness(&[0.0, 0.0, 0.0, 0.0, -10.0]) < 0.0);
    }

    #[test]
    fn test_skewness_reference_value() {
        // scipy.stats.skew([1, 2, 3, 10]) with bias=True
        assert_abs_diff_eq!(skewness(&[1.0, 2.0, 3.0, 10.0]), 1.018_234, epsilon = 1e-5);
    }

    #[test]
    fn test_skewness_constant() {
        assert_eq!(skewness(&[4.0, 4.0, 4.0]), 0.0);
    }

    #[test]
    fn test_squared_distance() {
        assert_abs_diff_eq!(squared_distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0, epsilon = 1e-12);
    }
}
