// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the inline test modules.

use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::linalg::{dagger, max_abs_diff};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

pub fn pauli_x() -> Array2<Complex64> {
    Array2::from_shape_vec((2, 2), vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)])
        .unwrap()
}

pub fn pauli_y() -> Array2<Complex64> {
    Array2::from_shape_vec((2, 2), vec![c(0.0, 0.0), c(0.0, -1.0), c(0.0, 1.0), c(0.0, 0.0)])
        .unwrap()
}

pub fn pauli_z() -> Array2<Complex64> {
    Array2::from_shape_vec((2, 2), vec![c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(-1.0, 0.0)])
        .unwrap()
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Matrix with i.i.d. standard-normal real and imaginary parts.
pub fn random_complex(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<Complex64> {
    Array2::from_shape_simple_fn((rows, cols), || {
        let re: f64 = StandardNormal.sample(rng);
        let im: f64 = StandardNormal.sample(rng);
        c(re, im)
    })
}

/// Random k×k skew-Hermitian matrix Ω = ½(X − X†).
pub fn random_skew_hermitian(rng: &mut StdRng, k: usize) -> Array2<Complex64> {
    let x = random_complex(rng, k, k);
    (&x - &dagger(&x)) * c(0.5, 0.0)
}

/// Hermitian part ½(m + m†).
pub fn hermitian_part(m: &Array2<Complex64>) -> Array2<Complex64> {
    (m + &dagger(m)) * c(0.5, 0.0)
}

/// Panic with the largest entry-wise deviation if `a` and `b` differ.
pub fn assert_matrix_close(a: &Array2<Complex64>, b: &Array2<Complex64>, tol: f64) {
    assert_eq!(a.dim(), b.dim(), "shape mismatch");
    let diff = max_abs_diff(a, b);
    assert!(diff <= tol, "matrices differ by {} (tol {})", diff, tol);
}
