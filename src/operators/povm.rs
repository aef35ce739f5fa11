// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Informationally complete measurements.

use ndarray::Array2;
use num_complex::Complex64;

use crate::linalg::{eye, kron};

/// Bloch vectors of the regular tetrahedron inscribed in the unit sphere.
const TETRAHEDRON: [[f64; 3]; 4] = [
    [0.0, 0.0, 1.0],
    [0.942_809_041_582_063_4, 0.0, -1.0 / 3.0],
    [-0.471_404_520_791_031_7, 0.816_496_580_927_726, -1.0 / 3.0],
    [-0.471_404_520_791_031_7, -0.816_496_580_927_726, -1.0 / 3.0],
];

/// Single-qubit symmetric informationally complete POVM.
///
/// `M_α = ¼(I + s_α·σ)` with `s_α` the tetrahedron vertices. The four
/// elements are PSD, have trace ½ and sum to the identity.
pub fn tetrahedral_povm() -> Vec<Array2<Complex64>> {
    TETRAHEDRON
        .iter()
        .map(|s| {
            let q = Complex64::new(0.25, 0.0);
            let mut m = Array2::zeros((2, 2));
            m[[0, 0]] = q * (1.0 + s[2]);
            m[[1, 1]] = q * (1.0 - s[2]);
            m[[0, 1]] = q * Complex64::new(s[0], -s[1]);
            m[[1, 0]] = q * Complex64::new(s[0], s[1]);
            m
        })
        .collect()
}

/// n-fold tensor power of a measurement.
///
/// Outcome `α = α_1·m^{n-1} + … + α_n` labels `M_{α_1} ⊗ … ⊗ M_{α_n}`,
/// so the first qubit is the most significant digit. `n = 0` yields the
/// trivial one-outcome measurement on a 1-dimensional space.
pub fn tensor_power(povm: &[Array2<Complex64>], n: usize) -> Vec<Array2<Complex64>> {
    let mut result = vec![eye(1)];
    for _ in 0..n {
        result = result
            .iter()
            .flat_map(|acc| povm.iter().map(move |m| kron(acc, m)))
            .collect();
    }
    result
}

/// Measurement on `n` qubits built from the tetrahedral POVM (`4^n` outcomes).
pub fn qubit_povm(num_qubits: usize) -> Vec<Array2<Complex64>> {
    tensor_power(&tetrahedral_povm(), num_qubits)
}

/// Stack `vec(M_αᵀ)` as rows so that `Tr(M_α ρ) = row_α · vec(ρ)`.
///
/// Multiplying a batch of row-vectorized states (N × d²) by the transpose of
/// this matrix gives the N × m table of outcome probabilities.
pub fn povm_matrix(povm: &[Array2<Complex64>]) -> Array2<Complex64> {
    let d = povm.first().map(|m| m.nrows()).unwrap_or(0);
    let mut q = Array2::zeros((povm.len(), d * d));
    for (alpha, m) in povm.iter().enumerate() {
        for a in 0..d {
            for b in 0..d {
                q[[alpha, b * d + a]] = m[[a, b]];
            }
        }
    }
    q
}
