// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hermitian eigendecomposition backed by `faer`.
//!
//! Matrices cross the boundary as `ndarray::Array2<Complex64>`; only the
//! lower triangle of the input is read.

use faer::complex_native::c64;
use faer::Mat;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::{dagger, ensure_square};
use crate::error::ShapeError;

/// Eigendecomposition H = V · diag(values) · V† of a Hermitian matrix.
///
/// Eigenvalues are sorted ascending; column `j` of `vectors` belongs to
/// `values[j]`.
#[derive(Debug, Clone)]
pub struct Eigh {
    pub values: Array1<f64>,
    pub vectors: Array2<Complex64>,
}

impl Eigh {
    /// Smallest eigenvalue (`+inf` for the empty matrix).
    pub fn min_value(&self) -> f64 {
        self.values.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    /// Largest eigenvalue (`-inf` for the empty matrix).
    pub fn max_value(&self) -> f64 {
        self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Rebuild V · diag(f(λ)) · V†.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Array2<Complex64> {
        let mut scaled = self.vectors.clone();
        for (j, mut col) in scaled.columns_mut().into_iter().enumerate() {
            let fj = Complex64::new(f(self.values[j]), 0.0);
            col.mapv_inplace(|z| z * fj);
        }
        scaled.dot(&dagger(&self.vectors))
    }
}

/// Eigendecomposition of a Hermitian matrix.
pub fn eigh(h: &Array2<Complex64>) -> Result<Eigh, ShapeError> {
    let n = ensure_square(h)?;
    if n == 0 {
        return Ok(Eigh {
            values: Array1::zeros(0),
            vectors: Array2::zeros((0, 0)),
        });
    }

    let mat = Mat::<c64>::from_fn(n, n, |i, j| {
        let z = h[[i, j]];
        c64::new(z.re, z.im)
    });
    let evd = mat.selfadjoint_eigendecomposition(faer::Side::Lower);
    let s = evd.s();
    let u = evd.u();

    let raw: Vec<f64> = (0..n).map(|i| s.column_vector().read(i).re).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]));

    let values = Array1::from_iter(order.iter().map(|&i| raw[i]));
    let vectors = Array2::from_shape_fn((n, n), |(r, col)| {
        let z = u.read(r, order[col]);
        Complex64::new(z.re, z.im)
    });

    Ok(Eigh { values, vectors })
}

/// Eigenvalues of a Hermitian matrix, ascending.
pub fn eigvalsh(h: &Array2<Complex64>) -> Result<Array1<f64>, ShapeError> {
    Ok(eigh(h)?.values)
}

/// Apply a scalar function to a Hermitian matrix through its spectrum.
pub fn hermitian_map(
    h: &Array2<Complex64>,
    f: impl Fn(f64) -> f64,
) -> Result<Array2<Complex64>, ShapeError> {
    Ok(eigh(h)?.map(f))
}
