// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Synthetic measurement data.

use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{GroundTruthKind, TomographyConfig, MAX_QUBITS};
use crate::error::{Error, NumericalError, Result, ShapeError, ValidationError};
use crate::manifold::{ChoiMatrix, Manifold};
use crate::operators::{
    apply_channel_batch, choi_to_channel, identity_kraus, povm_matrix, qubit_povm,
    random_pure_state, vectorize,
};
use crate::sampling::sample_categorical;

/// Probabilities this far below zero are treated as rounding and clamped.
const ROUNDING_SLACK: f64 = 1e-12;

/// Full-batch training data: `(ρ_i, M_{α_i})` pairs with weights.
///
/// Deserialization goes through [`Dataset::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    num_qubits: usize,
    /// Row-major vectorized input states, N × d².
    inputs: Array2<Complex64>,
    /// Index into the `4^n`-element POVM of the observed outcome.
    outcomes: Vec<usize>,
    /// Non-negative per-sample weights.
    weights: Array1<f64>,
}

#[derive(Deserialize)]
struct RawDataset {
    num_qubits: usize,
    inputs: Array2<Complex64>,
    outcomes: Vec<usize>,
    weights: Array1<f64>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = Error;

    fn try_from(raw: RawDataset) -> Result<Self> {
        Dataset::new(raw.num_qubits, raw.inputs, raw.outcomes, raw.weights)
    }
}

impl Dataset {
    pub fn new(
        num_qubits: usize,
        inputs: Array2<Complex64>,
        outcomes: Vec<usize>,
        weights: Array1<f64>,
    ) -> Result<Self> {
        let d = register_dim(num_qubits)?;
        let n = outcomes.len();
        if inputs.dim() != (n, d * d) {
            let (r, c) = inputs.dim();
            return Err(ShapeError::mismatch("dataset inputs", &[n, d * d], &[r, c]).into());
        }
        if weights.len() != n {
            return Err(ShapeError::mismatch("dataset weights", &[n], &[weights.len()]).into());
        }
        let num_outcomes = d * d;
        if let Some(&bad) = outcomes.iter().find(|&&a| a >= num_outcomes) {
            return Err(ValidationError::Field {
                field: "outcomes".into(),
                message: format!("outcome {} out of range for {} POVM elements", bad, num_outcomes),
            }
            .into());
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ValidationError::Field {
                field: "weights".into(),
                message: format!("weight {} is negative or not finite", w),
            }
            .into());
        }
        Ok(Self {
            num_qubits,
            inputs,
            outcomes,
            weights,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Hilbert-space dimension `d`.
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn inputs(&self) -> &Array2<Complex64> {
        &self.inputs
    }

    pub fn outcomes(&self) -> &[usize] {
        &self.outcomes
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.sum()
    }
}

/// `d = 2^n`, for `1 <= n <= MAX_QUBITS`.
fn register_dim(num_qubits: usize) -> Result<usize> {
    if num_qubits == 0 || num_qubits > MAX_QUBITS {
        return Err(ValidationError::Field {
            field: "num_qubits".into(),
            message: format!("{} is outside [1, {}]", num_qubits, MAX_QUBITS),
        }
        .into());
    }
    Ok(1 << num_qubits)
}

/// Haar-random pure inputs, vectorized, one per row.
pub fn random_inputs(count: usize, d: usize, rng: &mut StdRng) -> Array2<Complex64> {
    let mut inputs = Array2::zeros((count, d * d));
    for mut row in inputs.rows_mut() {
        row.assign(&vectorize(&random_pure_state(d, rng)));
    }
    inputs
}

/// Ground-truth manifold point.
///
/// [`GroundTruthKind::Identity`] always has Kraus rank 1, whatever `rank`
/// is requested.
pub fn ground_truth(
    kind: GroundTruthKind,
    num_qubits: usize,
    rank: usize,
    rng: &mut StdRng,
) -> Result<Array2<Complex64>> {
    let d = register_dim(num_qubits)?;
    match kind {
        GroundTruthKind::Identity => Ok(identity_kraus(d)),
        GroundTruthKind::Random => ChoiMatrix::trace_preserving().random(d * d, rank, rng),
    }
}

/// Outcome probabilities `P[i, α] = Tr(M_α Φ(ρ_i))` for every input row.
///
/// One matrix product for the channel, one for the POVM.
pub fn outcome_probabilities(
    point: &Array2<Complex64>,
    inputs: &Array2<Complex64>,
    num_qubits: usize,
) -> Result<Array2<f64>> {
    let d = register_dim(num_qubits)?;
    let channel = choi_to_channel(&ChoiMatrix::choi(point), d)?;
    let outputs = apply_channel_batch(&channel, inputs)?;
    let q = povm_matrix(&qubit_povm(num_qubits));
    Ok(outputs.dot(&q.t()).mapv(|z| {
        if z.re < 0.0 && z.re > -ROUNDING_SLACK {
            0.0
        } else {
            z.re
        }
    }))
}

/// Sample one outcome per random input state through `truth`.
pub fn simulate(
    truth: &Array2<Complex64>,
    num_qubits: usize,
    num_samples: usize,
    row_sum_tolerance: f64,
    rng: &mut StdRng,
) -> Result<Dataset> {
    let d = register_dim(num_qubits)?;
    let inputs = random_inputs(num_samples, d, rng);
    let probabilities = outcome_probabilities(truth, &inputs, num_qubits)?;
    let outcomes = sample_categorical(&probabilities, rng, row_sum_tolerance)?;
    debug!(num_samples, num_qubits, "simulated measurement outcomes");
    Dataset::new(num_qubits, inputs, outcomes, Array1::ones(num_samples))
}

/// Every `(input, outcome)` pair weighted by its exact probability.
///
/// Pairs with zero probability are dropped.
pub fn noiseless(
    truth: &Array2<Complex64>,
    num_qubits: usize,
    num_inputs: usize,
    rng: &mut StdRng,
) -> Result<Dataset> {
    let d = register_dim(num_qubits)?;
    let inputs = random_inputs(num_inputs, d, rng);
    let probabilities = outcome_probabilities(truth, &inputs, num_qubits)?;

    let mut rows = Vec::new();
    let mut outcomes = Vec::new();
    let mut weights = Vec::new();
    for ((i, alpha), &p) in probabilities.indexed_iter() {
        if p < 0.0 || !p.is_finite() {
            return Err(NumericalError::InvalidProbability {
                row: i,
                col: alpha,
                value: p,
            }
            .into());
        }
        if p > 0.0 {
            rows.push(i);
            outcomes.push(alpha);
            weights.push(p);
        }
    }

    let selected = inputs.select(Axis(0), &rows);
    Dataset::new(num_qubits, selected, outcomes, Array1::from(weights))
}

/// Ground truth and measurement data for `config`, drawn from `rng` in
/// that order.
pub fn generate(
    config: &TomographyConfig,
    row_sum_tolerance: f64,
    rng: &mut StdRng,
) -> Result<(Array2<Complex64>, Dataset)> {
    let n = config.num_qubits;
    let truth = ground_truth(config.ground_truth, n, config.kraus_rank, rng)?;
    let dataset = if config.noiseless {
        noiseless(&truth, n, config.num_samples, rng)?
    } else {
        simulate(&truth, n, config.num_samples, row_sum_tolerance, rng)?
    };
    Ok((truth, dataset))
}
