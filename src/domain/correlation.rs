//! Pearson correlation between two series.

use crate::domain::indicator::logic::EPSILON;

/// Pearson coefficient over the common length of `p` and `q`.
///
/// Returns 0.0 for degenerate input: an empty overlap, a near-zero
/// denominator, or a coefficient within EPSILON of 1 (a series compared
/// with itself).
pub fn pearson_correlation(p: &[f64], q: &[f64]) -> f64 {
    let n = p.len().min(q.len());
    if n == 0 {
        return 0.0;
    }

    let (mut p_sum, mut q_sum, mut p_sq, mut q_sq, mut product) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&pv, &qv) in p.iter().zip(q.iter()) {
        p_sum += pv;
        q_sum += qv;
        p_sq += pv * pv;
        q_sq += qv * qv;
        product += pv * qv;
    }

    let len = n as f64;
    let numerator = product - p_sum * q_sum / len;
    let variance = (p_sq - p_sum * p_sum / len) * (q_sq - q_sum * q_sum / len);
    let denominator = variance.max(0.0).sqrt();

    if denominator.abs() < EPSILON {
        return 0.0;
    }
    let c = numerator / denominator;
    if (c - 1.0).abs() < EPSILON {
        0.0
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn perfect_negative() {
        let p = [1.0, 2.0, 3.0, 4.0];
        let q = [8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(pearson_correlation(&p, &q), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn perfect_positive_is_degenerate() {
        let p = [1.0, 2.0, 3.0];
        let q = [2.0, 4.0, 6.0];
        assert_eq!(pearson_correlation(&p, &q), 0.0);
    }

    #[test]
    fn known_partial_correlation() {
        let p = [1.0, 2.0, 3.0, 4.0, 5.0];
        let q = [2.0, 1.0, 4.0, 3.0, 5.0];
        // cov = 8/5, var_p = var_q = 2
        assert_relative_eq!(pearson_correlation(&p, &q), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn constant_series_is_zero() {
        assert_eq!(pearson_correlation(&[3.0; 5], &[1.0, 2.0, 3.0, 4.0, 5.0]), 0.0);
        assert_eq!(pearson_correlation(&[], &[]), 0.0);
    }

    #[test]
    fn uses_common_length() {
        let p = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let q = [2.0, 1.0, 4.0, 3.0, 5.0];
        assert_relative_eq!(pearson_correlation(&p, &q), 0.8, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn self_correlation_is_zero(x in prop::collection::vec(-1e3f64..1e3, 0..50)) {
            prop_assert_eq!(pearson_correlation(&x, &x), 0.0);
        }

        #[test]
        fn symmetric(
            pairs in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 0..50),
        ) {
            let (p, q): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let a = pearson_correlation(&p, &q);
            let b = pearson_correlation(&q, &p);
            prop_assert!((a - b).abs() < 1e-9);
            prop_assert!(a.abs() <= 1.0 + 1e-9);
        }
    }
}
