// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Riemannian manifolds for channel reconstruction.
//!
//! A manifold supplies the geometric primitives an optimizer needs: an inner
//! product on tangent vectors, the orthogonal projection onto the tangent
//! (for quotients, horizontal) space, a retraction and a vector transport.
//! Points and tangent vectors are complex `(n, k)` matrices.
//!
//! # References
//!
//! - Absil, P.-A., Mahony, R. & Sepulchre, R. (2008). "Optimization
//!   Algorithms on Matrix Manifolds." Princeton, ch. 3–4.
//! - Boumal, N. (2023). "An Introduction to Optimization on Smooth
//!   Manifolds." Cambridge, §9.
//! - Yatawatta, S. (2013). "Radio interferometric calibration using a
//!   Riemannian manifold." ICASSP, 3866–3870.

pub mod choi;
pub mod encoding;
pub mod povm;

pub use choi::{ChoiMatrix, ChoiMatrixConfig, Constraint, DEFAULT_CONDITIONING_THRESHOLD};
pub use encoding::{complex_to_real, real_to_complex};
pub use povm::Povm;

use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;

use crate::error::Result;

/// Geometry of a matrix manifold embedded in `C^{n×k}` with the real
/// Hilbert–Schmidt metric.
pub trait Manifold: Send + Sync {
    /// Short human-readable name.
    fn name(&self) -> &'static str;

    /// Riemannian inner product of two tangent vectors at `point`.
    fn inner(&self, point: &Array2<Complex64>, a: &Array2<Complex64>, b: &Array2<Complex64>)
        -> f64;

    /// Orthogonal projection of an ambient vector onto the tangent
    /// (horizontal) space at `point`.
    fn proj(&self, point: &Array2<Complex64>, v: &Array2<Complex64>) -> Result<Array2<Complex64>>;

    /// Riemannian gradient from a Euclidean one. The metric is the embedding
    /// one, so this is the projection.
    fn egrad_to_rgrad(
        &self,
        point: &Array2<Complex64>,
        egrad: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>> {
        self.proj(point, egrad)
    }

    /// Map a tangent step back onto the manifold.
    fn retraction(
        &self,
        point: &Array2<Complex64>,
        step: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>>;

    /// Move `v` from the tangent space at `point` to the tangent space at
    /// `retraction(point, direction)`.
    fn vector_transport(
        &self,
        point: &Array2<Complex64>,
        v: &Array2<Complex64>,
        direction: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>> {
        Ok(self.retraction_transport(point, v, direction)?.1)
    }

    /// Retraction and vector transport in one pass.
    ///
    /// Returns `(new_point, transported_v)`.
    fn retraction_transport(
        &self,
        point: &Array2<Complex64>,
        v: &Array2<Complex64>,
        direction: &Array2<Complex64>,
    ) -> Result<(Array2<Complex64>, Array2<Complex64>)>;

    /// Random point of shape `(rows, cols)`.
    fn random(&self, rows: usize, cols: usize, rng: &mut StdRng) -> Result<Array2<Complex64>>;

    /// Random tangent vector at `point`.
    fn random_tangent(&self, point: &Array2<Complex64>, rng: &mut StdRng)
        -> Result<Array2<Complex64>>;

    /// Whether `point` satisfies the manifold constraints to within `tol`.
    fn is_in_manifold(&self, point: &Array2<Complex64>, tol: f64) -> bool;
}
