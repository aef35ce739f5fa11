// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Categorical sampling with the Gumbel-max trick.
//!
//! For each row of a probability table, `argmax_α(ln P[i,α] + G[i,α])` with
//! `G = −ln(−ln U)`, `U ~ Uniform(0, 1)`, is distributed as `P[i, ·]`.
//!
//! # References
//!
//! - Gumbel, E. J. (1954). "Statistical theory of extreme values and some
//!   practical applications." NBS Applied Mathematics Series 33.

use ndarray::{Array2, Axis, Zip};
use rand::distributions::Open01;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

use crate::error::{NumericalError, Result};

/// Default tolerance on `|Σ_α P[i,α] − 1|` before a row is reported.
pub const DEFAULT_ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Draw one outcome index per row of `probabilities`.
///
/// Rows are not renormalized. Zero entries are never selected; a row with
/// no positive entry is an error. Ties resolve to the smallest index. Noise is drawn from `rng` row by row, so a fixed
/// seed gives a fixed sample; the arg-max itself runs in parallel.
pub fn sample_categorical(
    probabilities: &Array2<f64>,
    rng: &mut StdRng,
    row_sum_tolerance: f64,
) -> Result<Vec<usize>> {
    for ((row, col), &p) in probabilities.indexed_iter() {
        if !p.is_finite() || p < 0.0 {
            return Err(NumericalError::InvalidProbability { row, col, value: p }.into());
        }
    }
    if let Some(row) = probabilities
        .axis_iter(Axis(0))
        .position(|r| r.iter().all(|&p| p == 0.0))
    {
        return Err(NumericalError::NoSupport { row }.into());
    }

    let deviating = probabilities
        .axis_iter(Axis(0))
        .filter(|row| (row.sum() - 1.0).abs() > row_sum_tolerance)
        .count();
    if deviating > 0 {
        warn!(
            rows = deviating,
            tolerance = row_sum_tolerance,
            "probability rows do not sum to one; sampling without renormalization"
        );
    }

    let gumbel = Array2::from_shape_simple_fn(probabilities.raw_dim(), || {
        let u: f64 = rng.sample(Open01);
        -(-u.ln()).ln()
    });

    let samples = Zip::from(probabilities.rows())
        .and(gumbel.rows())
        .par_map_collect(|p, g| {
            let mut best = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (alpha, (&p_a, &g_a)) in p.iter().zip(g.iter()).enumerate() {
                let score = p_a.ln() + g_a;
                if score > best_score {
                    best = alpha;
                    best_score = score;
                }
            }
            best
        });

    Ok(samples.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::seeded_rng;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_frequencies_match_probabilities() {
        let n = 100_000;
        let probs = Array2::from_shape_fn((n, 3), |(_, j)| [0.5, 0.3, 0.2][j]);
        let mut rng = seeded_rng(42);
        let samples = sample_categorical(&probs, &mut rng, DEFAULT_ROW_SUM_TOLERANCE).unwrap();

        let mut counts = [0usize; 3];
        for s in &samples {
            counts[*s] += 1;
        }
        // Binomial std at n=1e5 is ~1.6e-3
        assert_relative_eq!(counts[0] as f64 / n as f64, 0.5, epsilon = 1e-2);
        assert_relative_eq!(counts[1] as f64 / n as f64, 0.3, epsilon = 1e-2);
        assert_relative_eq!(counts[2] as f64 / n as f64, 0.2, epsilon = 1e-2);
    }

    #[test]
    fn test_zero_probability_never_selected() {
        let probs = Array2::from_shape_fn((5_000, 3), |(_, j)| [0.0, 1.0, 0.0][j]);
        let mut rng = seeded_rng(7);
        let samples = sample_categorical(&probs, &mut rng, DEFAULT_ROW_SUM_TOLERANCE).unwrap();
        assert!(samples.iter().all(|&s| s == 1));
    }

    #[test]
    fn test_same_seed_same_samples() {
        let probs = Array2::from_shape_fn((1_000, 4), |(_, j)| 0.1 * (j as f64 + 1.0));
        let a = sample_categorical(&probs, &mut seeded_rng(3), DEFAULT_ROW_SUM_TOLERANCE).unwrap();
        let b = sample_categorical(&probs, &mut seeded_rng(3), DEFAULT_ROW_SUM_TOLERANCE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unnormalized_rows_are_sampled_as_is() {
        // Row sums to 2; relative weights 1:1 are preserved
        let probs = Array2::from_elem((20_000, 2), 1.0);
        let samples =
            sample_categorical(&probs, &mut seeded_rng(5), DEFAULT_ROW_SUM_TOLERANCE).unwrap();
        let ones = samples.iter().filter(|&&s| s == 1).count() as f64;
        assert_relative_eq!(ones / 20_000.0, 0.5, epsilon = 2e-2);
    }

    #[test]
    fn test_negative_entry_rejected() {
        let mut probs = Array2::from_elem((2, 2), 0.5);
        probs[[1, 0]] = -0.1;
        let err = sample_categorical(&probs, &mut seeded_rng(0), DEFAULT_ROW_SUM_TOLERANCE)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Numerical(NumericalError::InvalidProbability { row: 1, col: 0, .. })
        ));
    }

    #[test]
    fn test_row_without_support_rejected() {
        let mut probs = Array2::from_elem((3, 3), 1.0 / 3.0);
        probs.row_mut(2).fill(0.0);
        let err = sample_categorical(&probs, &mut seeded_rng(0), DEFAULT_ROW_SUM_TOLERANCE)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Numerical(NumericalError::NoSupport { row: 2 })
        ));

        let zeros = Array2::<f64>::zeros((3, 3));
        assert!(sample_categorical(&zeros, &mut seeded_rng(0), DEFAULT_ROW_SUM_TOLERANCE).is_err());
    }

    #[test]
    fn test_nan_entry_rejected() {
        let mut probs = Array2::from_elem((1, 2), 0.5);
        probs[[0, 1]] = f64::NAN;
        assert!(sample_categorical(&probs, &mut seeded_rng(0), DEFAULT_ROW_SUM_TOLERANCE).is_err());
    }

    #[test]
    fn test_empty_table() {
        let probs = Array2::<f64>::zeros((0, 3));
        let samples =
            sample_categorical(&probs, &mut seeded_rng(0), DEFAULT_ROW_SUM_TOLERANCE).unwrap();
        assert!(samples.is_empty());
    }
}
