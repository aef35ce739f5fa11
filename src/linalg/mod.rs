// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Small dense complex linear-algebra kernels.
//!
//! Everything here operates on `ndarray::Array2<Complex64>` and is sized for
//! the regime tomography works in (d² ≤ 256). Hermitian eigendecompositions
//! go through `faer` in [`eigh`].

pub mod eigh;

pub use eigh::{eigh, eigvalsh, hermitian_map, Eigh};

use ndarray::{Array2, ArrayBase, Data, Ix2};
use num_complex::Complex64;

use crate::error::ShapeError;

/// Complex identity matrix.
pub fn eye(n: usize) -> Array2<Complex64> {
    Array2::from_diag_elem(n, Complex64::new(1.0, 0.0))
}

/// Conjugate transpose (dagger) of a matrix.
pub fn dagger<S>(m: &ArrayBase<S, Ix2>) -> Array2<Complex64>
where
    S: Data<Elem = Complex64>,
{
    m.t().mapv(|z| z.conj())
}

/// Trace of a square matrix.
pub fn trace(m: &Array2<Complex64>) -> Complex64 {
    m.diag().sum()
}

/// Kronecker product a ⊗ b.
pub fn kron(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    Array2::from_shape_fn((ar * br, ac * bc), |(i, j)| {
        a[[i / br, j / bc]] * b[[i % br, j % bc]]
    })
}

/// Real part of the Hilbert–Schmidt inner product: Re Tr(a† b).
pub fn real_inner(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x.conj() * y).re).sum()
}

/// Squared Frobenius norm: sum of squared magnitudes of all entries.
pub fn frobenius_norm_sqr(m: &Array2<Complex64>) -> f64 {
    m.iter().map(|z| z.norm_sqr()).sum()
}

/// Require a square matrix.
pub fn ensure_square(m: &Array2<Complex64>) -> Result<usize, ShapeError> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(ShapeError::NotSquare { rows, cols });
    }
    Ok(rows)
}

/// Largest entry-wise distance between two matrices of equal shape.
pub fn max_abs_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_matrix_close, pauli_x, pauli_y, pauli_z};
    use approx::assert_relative_eq;

    #[test]
    fn test_dagger_conjugates_and_transposes() {
        let mut m = Array2::zeros((2, 2));
        m[[0, 1]] = Complex64::new(1.0, 2.0);
        m[[1, 0]] = Complex64::new(3.0, 4.0);
        let dag = dagger(&m);
        assert_eq!(dag[[0, 1]], Complex64::new(3.0, -4.0));
        assert_eq!(dag[[1, 0]], Complex64::new(1.0, -2.0));
    }

    #[test]
    fn test_kron_of_paulis() {
        // X ⊗ Z has entries ±1 on the anti-diagonal blocks
        let xz = kron(&pauli_x(), &pauli_z());
        assert_eq!(xz.dim(), (4, 4));
        assert_eq!(xz[[0, 2]], Complex64::new(1.0, 0.0));
        assert_eq!(xz[[1, 3]], Complex64::new(-1.0, 0.0));
        assert_eq!(xz[[2, 0]], Complex64::new(1.0, 0.0));
        assert_eq!(xz[[0, 0]], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_kron_identity_is_identity() {
        assert_matrix_close(&kron(&eye(2), &eye(3)), &eye(6), 1e-15);
    }

    #[test]
    fn test_trace_and_norms() {
        assert_relative_eq!(trace(&eye(5)).re, 5.0);
        assert_relative_eq!(trace(&pauli_y()).norm(), 0.0);
        assert_relative_eq!(frobenius_norm_sqr(&pauli_y()), 2.0);
        // Tr(X† Z) = 0, Tr(X† X) = 2
        assert_relative_eq!(real_inner(&pauli_x(), &pauli_z()), 0.0);
        assert_relative_eq!(real_inner(&pauli_x(), &pauli_x()), 2.0);
    }

    #[test]
    fn test_ensure_square() {
        assert_eq!(ensure_square(&eye(3)).unwrap(), 3);
        let rect = Array2::<Complex64>::zeros((2, 3));
        assert!(matches!(
            ensure_square(&rect),
            Err(ShapeError::NotSquare { rows: 2, cols: 3 })
        ));
    }
}
