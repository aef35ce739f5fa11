// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Negative log-likelihood objective, its gradient and the distance
//! diagnostic.
//!
//! With `X_i = M_{α_i} ⊗ ρ_iᵀ` the outcome probability is
//! `p_i = Tr(C·X_i) = Tr(A†·X_i·A)`, so for
//! `L(A) = −Σ_i w_i ln p_i / Σ_i w_i` the gradient with respect to the real
//! encoding of `A`, read back as a complex matrix, is
//! `−2·(Σ_i (w_i/p_i)·X_i)·A / Σ_i w_i`. Grouping samples by outcome turns
//! the sum into `Σ_α M_α ⊗ R_αᵀ` with `R_α = Σ_{i: α_i = α} (w_i/p_i)·ρ_i`.

use ndarray::{Array1, Array2, Array3, ArrayView1, Zip};
use num_complex::Complex64;
use rayon::prelude::*;

use super::dataset::Dataset;
use crate::error::{NumericalError, Result, ShapeError};
use crate::linalg::{eigvalsh, kron};
use crate::manifold::{complex_to_real, real_to_complex, ChoiMatrix};
use crate::operators::{apply_channel_batch, choi_to_channel, povm_matrix, qubit_povm};

/// Objective with an analytic gradient on the real `(n, k, 2)` encoding.
pub trait Differentiable {
    fn value_and_gradient(&self, params: &Array3<f64>) -> Result<(f64, Array3<f64>)>;

    fn value(&self, params: &Array3<f64>) -> Result<f64> {
        Ok(self.value_and_gradient(params)?.0)
    }
}

/// Weighted negative log-likelihood of a [`Dataset`].
///
/// The `4^n`-element POVM and its matrix are built once, on construction.
#[derive(Debug, Clone)]
pub struct NegativeLogLikelihood {
    dataset: Dataset,
    povm: Vec<Array2<Complex64>>,
    povm_matrix: Array2<Complex64>,
    total_weight: f64,
}

impl NegativeLogLikelihood {
    pub fn new(dataset: Dataset) -> Self {
        let povm = qubit_povm(dataset.num_qubits());
        let povm_matrix = povm_matrix(&povm);
        let total_weight = dataset.total_weight();
        Self {
            dataset,
            povm,
            povm_matrix,
            total_weight,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Probability of each observed outcome under the channel of `point`.
    ///
    /// Fails on the first `p_i <= 0` (or NaN) instead of letting it reach
    /// the logarithm.
    pub fn probabilities(&self, point: &Array2<Complex64>) -> Result<Array1<f64>> {
        let d = self.dataset.dim();
        self.check_point(point)?;

        let channel = choi_to_channel(&ChoiMatrix::choi(point), d)?;
        let outputs = apply_channel_batch(&channel, self.dataset.inputs())?;
        let outcomes = ArrayView1::from(self.dataset.outcomes());
        let q = &self.povm_matrix;

        let p = Zip::from(outputs.rows())
            .and(&outcomes)
            .par_map_collect(|row, &alpha| q.row(alpha).dot(&row).re);

        if let Some((sample, &value)) = p.iter().enumerate().find(|&(_, &v)| v.is_nan() || v <= 0.0) {
            return Err(NumericalError::NonPositiveProbability { sample, value }.into());
        }
        Ok(p)
    }

    pub fn loss(&self, point: &Array2<Complex64>) -> Result<f64> {
        let p = self.probabilities(point)?;
        self.loss_from_probabilities(&p)
    }

    /// Loss and complex-form Euclidean gradient at `point`.
    pub fn loss_and_gradient(
        &self,
        point: &Array2<Complex64>,
    ) -> Result<(f64, Array2<Complex64>)> {
        let p = self.probabilities(point)?;
        let loss = self.loss_from_probabilities(&p)?;

        let d = self.dataset.dim();
        let m = self.povm.len();
        let inputs = self.dataset.inputs();
        let outcomes = self.dataset.outcomes();
        let weights = self.dataset.weights();

        let zero = || vec![Array2::<Complex64>::zeros((d, d)); m];
        let per_outcome = (0..self.dataset.len())
            .into_par_iter()
            .fold(zero, |mut acc, i| {
                let c = weights[i] / p[i];
                let rho = inputs.row(i);
                let r = &mut acc[outcomes[i]];
                for a in 0..d {
                    for b in 0..d {
                        r[[a, b]] += rho[a * d + b] * c;
                    }
                }
                acc
            })
            .reduce(zero, |mut x, y| {
                for (xa, ya) in x.iter_mut().zip(y) {
                    *xa += &ya;
                }
                x
            });

        let mut w = Array2::<Complex64>::zeros((d * d, d * d));
        for (m_alpha, r_alpha) in self.povm.iter().zip(per_outcome) {
            w += &kron(m_alpha, &r_alpha.t().to_owned());
        }
        let grad = w.dot(point) * (-2.0 / self.total_weight);

        Ok((loss, grad))
    }

    fn loss_from_probabilities(&self, p: &Array1<f64>) -> Result<f64> {
        let weighted: f64 = Zip::from(p)
            .and(self.dataset.weights())
            .fold(0.0, |acc, &pi, &wi| acc + wi * pi.ln());
        let loss = -weighted / self.total_weight;
        if !loss.is_finite() {
            return Err(NumericalError::NonFiniteLoss(loss).into());
        }
        Ok(loss)
    }

    fn check_point(&self, point: &Array2<Complex64>) -> Result<()> {
        let d2 = self.dataset.dim() * self.dataset.dim();
        if point.nrows() != d2 {
            let (r, c) = point.dim();
            return Err(ShapeError::mismatch("manifold point", &[d2, c], &[r, c]).into());
        }
        Ok(())
    }
}

impl Differentiable for NegativeLogLikelihood {
    fn value_and_gradient(&self, params: &Array3<f64>) -> Result<(f64, Array3<f64>)> {
        let point = real_to_complex(params)?;
        let (loss, grad) = self.loss_and_gradient(&point)?;
        Ok((loss, complex_to_real(&grad)))
    }

    fn value(&self, params: &Array3<f64>) -> Result<f64> {
        self.loss(&real_to_complex(params)?)
    }
}

/// Central-difference gradient of any [`Differentiable`].
pub fn finite_difference_gradient(
    f: &dyn Differentiable,
    params: &Array3<f64>,
    h: f64,
) -> Result<Array3<f64>> {
    let mut grad = Array3::zeros(params.raw_dim());
    let mut shifted = params.clone();
    for (idx, &x) in params.indexed_iter() {
        shifted[idx] = x + h;
        let plus = f.value(&shifted)?;
        shifted[idx] = x - h;
        let minus = f.value(&shifted)?;
        shifted[idx] = x;
        grad[idx] = (plus - minus) / (2.0 * h);
    }
    Ok(grad)
}

/// Normalized trace distance `(1/2d)·Σ|eig(C_a − C_b)|` between Choi matrices.
///
/// Lies in [0, 1] for trace-preserving channels.
pub fn choi_distance(choi_a: &Array2<Complex64>, choi_b: &Array2<Complex64>) -> Result<f64> {
    if choi_a.dim() != choi_b.dim() {
        let (r, c) = choi_b.dim();
        let (er, ec) = choi_a.dim();
        return Err(ShapeError::mismatch("Choi matrix", &[er, ec], &[r, c]).into());
    }
    let d = (choi_a.nrows() as f64).sqrt();
    let diff = choi_a - choi_b;
    let eig = eigvalsh(&diff)?;
    Ok(eig.iter().map(|l| l.abs()).sum::<f64>() / (2.0 * d))
}
