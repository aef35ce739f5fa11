// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quotient manifold of bounded-rank Choi matrices.
//!
//! A channel with Kraus rank at most `k` is represented by `A ∈ C^{d²×k}`
//! with Choi matrix `C = A·A†`. For any unitary `Q`, `A` and `A·Q` give the
//! same `C`; the fibre directions `A·Ω` (`Ω` skew-Hermitian) are vertical,
//! and tangent vectors are represented by their horizontal part.
//!
//! With [`Constraint::TracePreserving`] the point also satisfies
//! `Tr_out(A·A†) = I`. Rearranged as `V[(p·k+κ), q] = conj(A[p·d+q, κ])`
//! this is the isometry condition `V†V = I`, so the constraint is handled
//! with Stiefel geometry on `V`.

use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Manifold;
use crate::error::{Result, ShapeError};
use crate::linalg::{dagger, eigh, eye, frobenius_norm_sqr, hermitian_map, real_inner, Eigh};

/// Default ratio λ_min / λ_max of `A†A` below which a warning is emitted.
pub const DEFAULT_CONDITIONING_THRESHOLD: f64 = 1e-12;

/// Constraint imposed on top of the positive-semidefinite parametrization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Any `A` of full column rank; the retraction is additive.
    #[default]
    Unconstrained,
    /// `Tr_out(A·A†) = I`; polar retraction.
    TracePreserving,
}

/// Numerical knobs of the horizontal projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiMatrixConfig {
    /// λ_min / λ_max of `A†A` below which a warning is logged.
    pub conditioning_threshold: f64,
    /// Clamp the eigenvalues of `A†A` from below in the Sylvester solve.
    pub min_eigenvalue_floor: Option<f64>,
}

impl Default for ChoiMatrixConfig {
    fn default() -> Self {
        Self {
            conditioning_threshold: DEFAULT_CONDITIONING_THRESHOLD,
            min_eigenvalue_floor: None,
        }
    }
}

/// The manifold of Choi matrices `C = A·A†` modulo `A ~ A·Q`.
#[derive(Debug, Clone, Default)]
pub struct ChoiMatrix {
    constraint: Constraint,
    config: ChoiMatrixConfig,
}

impl ChoiMatrix {
    /// Unconstrained variant with additive retraction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace-preserving variant.
    pub fn trace_preserving() -> Self {
        Self {
            constraint: Constraint::TracePreserving,
            ..Self::default()
        }
    }

    pub fn with_constraint(constraint: Constraint) -> Self {
        Self {
            constraint,
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: ChoiMatrixConfig) -> Self {
        self.config = config;
        self
    }

    pub fn constraint(&self) -> Constraint {
        self.constraint
    }

    pub fn config(&self) -> &ChoiMatrixConfig {
        &self.config
    }

    /// Choi matrix `A·A†` of a point.
    pub fn choi(point: &Array2<Complex64>) -> Array2<Complex64> {
        point.dot(&dagger(point))
    }

    /// Project `g` onto the horizontal space at `a`.
    ///
    /// Solves `S·Ω + Ω·S = A†G − G†A` with `S = A†A = U·Λ·U†` in the
    /// eigenbasis of `S`, where the equation decouples into
    /// `Ω'_ij = R'_ij / (λ_i + λ_j)`, and returns `G − A·Ω`. Pairs with
    /// `λ_i + λ_j = 0` (rank-deficient `A`) contribute nothing.
    pub fn project_to_horizontal(
        &self,
        a: &Array2<Complex64>,
        g: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>> {
        check_same_shape(a, g)?;

        let a_dag = dagger(a);
        let rhs = a_dag.dot(g) - dagger(g).dot(a);
        let gram = eigh(&a_dag.dot(a))?;
        self.check_conditioning(&gram);

        let lambda = match self.config.min_eigenvalue_floor {
            Some(floor) => gram.values.mapv(|l| l.max(floor)),
            None => gram.values.clone(),
        };
        let u = &gram.vectors;
        let r_prime = dagger(u).dot(&rhs).dot(u);

        let k = lambda.len();
        let omega_prime = Array2::from_shape_fn((k, k), |(i, j)| {
            let denom = lambda[i] + lambda[j];
            if denom == 0.0 {
                Complex64::new(0.0, 0.0)
            } else {
                r_prime[[i, j]] / denom
            }
        });
        let omega = u.dot(&omega_prime).dot(&dagger(u));

        Ok(g - &a.dot(&omega))
    }

    /// Project onto the tangent space of `Tr_out(A·A†) = I` at `a`.
    ///
    /// In the isometry picture: `ξ_V − ½·V·(V†ξ_V + ξ_V†V)`.
    pub fn project_to_trace_preserving(
        &self,
        a: &Array2<Complex64>,
        xi: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>> {
        check_same_shape(a, xi)?;
        let d = input_dim(a.nrows())?;
        let k = a.ncols();

        let v = to_isometry(a, d);
        let xi_v = to_isometry(xi, d);
        let v_dag = dagger(&v);
        let sym = v_dag.dot(&xi_v) + dagger(&xi_v).dot(&v);
        let projected = &xi_v - &(v.dot(&sym) * Complex64::new(0.5, 0.0));

        Ok(from_isometry(&projected, d, k))
    }

    fn check_conditioning(&self, gram: &Eigh) {
        if gram.values.is_empty() {
            return;
        }
        let min = gram.min_value();
        let max = gram.max_value();
        if max <= 0.0 || min < self.config.conditioning_threshold * max {
            warn!(
                min_eigenvalue = min,
                max_eigenvalue = max,
                floor = ?self.config.min_eigenvalue_floor,
                "A†A is ill-conditioned; horizontal projection may be inaccurate"
            );
        }
    }

    fn check_rank_budget(&self, rows: usize, cols: usize) -> Result<()> {
        if cols == 0 || cols > rows {
            return Err(ShapeError::RankBudget { rows, rank: cols }.into());
        }
        if self.constraint == Constraint::TracePreserving {
            input_dim(rows)?;
        }
        Ok(())
    }
}

impl Manifold for ChoiMatrix {
    fn name(&self) -> &'static str {
        match self.constraint {
            Constraint::Unconstrained => "ChoiMatrix",
            Constraint::TracePreserving => "ChoiMatrix(trace-preserving)",
        }
    }

    fn inner(
        &self,
        _point: &Array2<Complex64>,
        a: &Array2<Complex64>,
        b: &Array2<Complex64>,
    ) -> f64 {
        real_inner(a, b)
    }

    fn proj(&self, point: &Array2<Complex64>, v: &Array2<Complex64>) -> Result<Array2<Complex64>> {
        match self.constraint {
            Constraint::Unconstrained => self.project_to_horizontal(point, v),
            Constraint::TracePreserving => {
                let tangent = self.project_to_trace_preserving(point, v)?;
                self.project_to_horizontal(point, &tangent)
            }
        }
    }

    fn retraction(
        &self,
        point: &Array2<Complex64>,
        step: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>> {
        check_same_shape(point, step)?;
        let moved = point + step;
        match self.constraint {
            Constraint::Unconstrained => Ok(moved),
            Constraint::TracePreserving => polar(&moved),
        }
    }

    fn retraction_transport(
        &self,
        point: &Array2<Complex64>,
        v: &Array2<Complex64>,
        direction: &Array2<Complex64>,
    ) -> Result<(Array2<Complex64>, Array2<Complex64>)> {
        let new_point = self.retraction(point, direction)?;
        let transported = match self.constraint {
            Constraint::Unconstrained => v.clone(),
            Constraint::TracePreserving => self.proj(&new_point, v)?,
        };
        Ok((new_point, transported))
    }

    fn random(&self, rows: usize, cols: usize, rng: &mut StdRng) -> Result<Array2<Complex64>> {
        self.check_rank_budget(rows, cols)?;
        let a = gaussian(rows, cols, rng);
        match self.constraint {
            Constraint::Unconstrained => Ok(a),
            Constraint::TracePreserving => polar(&a),
        }
    }

    fn random_tangent(
        &self,
        point: &Array2<Complex64>,
        rng: &mut StdRng,
    ) -> Result<Array2<Complex64>> {
        let (rows, cols) = point.dim();
        self.proj(point, &gaussian(rows, cols, rng))
    }

    fn is_in_manifold(&self, point: &Array2<Complex64>, tol: f64) -> bool {
        let (rows, cols) = point.dim();
        if self.check_rank_budget(rows, cols).is_err() || point.iter().any(|z| !z.is_finite()) {
            return false;
        }
        match self.constraint {
            Constraint::Unconstrained => match eigh(&dagger(point).dot(point)) {
                Ok(gram) => gram.min_value() > tol * gram.max_value(),
                Err(_) => false,
            },
            Constraint::TracePreserving => {
                let Some(d) = exact_sqrt(rows) else {
                    return false;
                };
                let v = to_isometry(point, d);
                let vv = dagger(&v).dot(&v);
                let id = eye(d);
                let diff = frobenius_norm_sqr(&(&vv - &id)).sqrt();
                let scale = (frobenius_norm_sqr(&id) * frobenius_norm_sqr(&vv)).sqrt().sqrt();
                diff / scale < tol
            }
        }
    }
}

/// `d` with `d² = n`, if `n` is a perfect square.
fn exact_sqrt(n: usize) -> Option<usize> {
    let r = (n as f64).sqrt().round() as usize;
    (r * r == n).then_some(r)
}

/// Input dimension `d` from the `d²` rows of a point.
fn input_dim(rows: usize) -> Result<usize> {
    exact_sqrt(rows).ok_or_else(|| ShapeError::NotPerfectSquare { rows }.into())
}

fn check_same_shape(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Result<()> {
    if a.dim() != b.dim() {
        let (er, ec) = a.dim();
        let (ar, ac) = b.dim();
        return Err(ShapeError::mismatch("tangent vector", &[er, ec], &[ar, ac]).into());
    }
    Ok(())
}

fn gaussian(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<Complex64> {
    Array2::from_shape_simple_fn((rows, cols), || {
        let re: f64 = StandardNormal.sample(rng);
        let im: f64 = StandardNormal.sample(rng);
        Complex64::new(re, im)
    })
}

/// `V[(p·k+κ), q] = conj(A[p·d+q, κ])`.
fn to_isometry(a: &Array2<Complex64>, d: usize) -> Array2<Complex64> {
    let k = a.ncols();
    Array2::from_shape_fn((d * k, d), |(row, q)| {
        let (p, kappa) = (row / k, row % k);
        a[[p * d + q, kappa]].conj()
    })
}

/// Inverse of [`to_isometry`].
fn from_isometry(v: &Array2<Complex64>, d: usize, k: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((d * d, k), |(row, kappa)| {
        let (p, q) = (row / d, row % d);
        v[[p * k + kappa, q]].conj()
    })
}

/// Closest trace-preserving point: polar factor `Y·(Y†Y)^{-1/2}` of the
/// isometry picture of `a`.
fn polar(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let d = input_dim(a.nrows())?;
    let k = a.ncols();
    let y = to_isometry(a, d);
    let inv_sqrt = hermitian_map(&dagger(&y).dot(&y), |l| 1.0 / l.max(f64::MIN_POSITIVE).sqrt())?;
    Ok(from_isometry(&y.dot(&inv_sqrt), d, k))
}
