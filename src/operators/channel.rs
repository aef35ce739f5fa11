// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Choi matrices, their channel (superoperator) form and batched application.
//!
//! Index convention: the Choi row index is `p·d + q` with `p` the output and
//! `q` the input index. Density matrices are vectorized row-major, so
//! `vec(ρ)[a·d + b] = ρ[a, b]`.

use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::ShapeError;
use crate::linalg::{dagger, ensure_square};

/// Reshape a Choi matrix into the superoperator acting on `vec(ρ)`.
///
/// `Φ[(p·d+r), (q·d+s)] = C[(p·d+q), (r·d+s)]`.
pub fn choi_to_channel(choi: &Array2<Complex64>, d: usize) -> Result<Array2<Complex64>, ShapeError> {
    check_choi_shape(choi, d)?;
    Ok(Array2::from_shape_fn((d * d, d * d), |(row, col)| {
        let (p, r) = (row / d, row % d);
        let (q, s) = (col / d, col % d);
        choi[[p * d + q, r * d + s]]
    }))
}

/// Apply one superoperator to a batch of row-vectorized states (N × d²).
///
/// Row `i` of the result is `Φ · inputs[i]`; the whole batch is a single
/// matrix product.
pub fn apply_channel_batch(
    channel: &Array2<Complex64>,
    inputs: &Array2<Complex64>,
) -> Result<Array2<Complex64>, ShapeError> {
    let d2 = ensure_square(channel)?;
    if inputs.ncols() != d2 {
        return Err(ShapeError::mismatch(
            "input batch",
            &[inputs.nrows(), d2],
            &[inputs.nrows(), inputs.ncols()],
        ));
    }
    Ok(inputs.dot(&channel.t()))
}

/// Row-major vectorization of a density matrix.
pub fn vectorize(rho: &Array2<Complex64>) -> Array1<Complex64> {
    rho.iter().cloned().collect()
}

/// Inverse of [`vectorize`].
pub fn unvectorize(v: ArrayView1<'_, Complex64>, d: usize) -> Result<Array2<Complex64>, ShapeError> {
    if v.len() != d * d {
        return Err(ShapeError::mismatch("vectorized state", &[d * d], &[v.len()]));
    }
    Ok(Array2::from_shape_fn((d, d), |(a, b)| v[a * d + b]))
}

/// Haar-random pure state `|ψ⟩⟨ψ|` on a `d`-dimensional space.
///
/// A normalized vector of i.i.d. complex Gaussians is Haar distributed.
pub fn random_pure_state(d: usize, rng: &mut StdRng) -> Array2<Complex64> {
    let mut psi: Array1<Complex64> = (0..d)
        .map(|_| {
            let re: f64 = StandardNormal.sample(rng);
            let im: f64 = StandardNormal.sample(rng);
            Complex64::new(re, im)
        })
        .collect();
    let norm = psi.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
    psi.mapv_inplace(|z| z / norm);
    Array2::from_shape_fn((d, d), |(a, b)| psi[a] * psi[b].conj())
}

/// Unnormalized maximally entangled vector `|Ω⟩ = Σ_i |i i⟩` as a (d², 1) column.
///
/// This is the rank-one manifold point of the identity channel.
pub fn identity_kraus(d: usize) -> Array2<Complex64> {
    let mut omega = Array2::zeros((d * d, 1));
    for i in 0..d {
        omega[[i * d + i, 0]] = Complex64::new(1.0, 0.0);
    }
    omega
}

/// Choi matrix `|Ω⟩⟨Ω|` of the identity channel.
pub fn identity_choi(d: usize) -> Array2<Complex64> {
    let omega = identity_kraus(d);
    omega.dot(&dagger(&omega))
}

/// Trace over the output factor: `[q, q'] = Σ_p C[p·d+q, p·d+q']`.
///
/// Equals the identity exactly when the channel is trace preserving.
pub fn partial_trace_output(choi: &Array2<Complex64>, d: usize) -> Result<Array2<Complex64>, ShapeError> {
    check_choi_shape(choi, d)?;
    Ok(Array2::from_shape_fn((d, d), |(q, qp)| {
        (0..d).map(|p| choi[[p * d + q, p * d + qp]]).sum()
    }))
}

fn check_choi_shape(choi: &Array2<Complex64>, d: usize) -> Result<(), ShapeError> {
    if choi.dim() != (d * d, d * d) {
        let (r, c) = choi.dim();
        return Err(ShapeError::mismatch("Choi matrix", &[d * d, d * d], &[r, c]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{eye, trace};
    use crate::test_utils::{assert_matrix_close, pauli_x, seeded_rng};
    use approx::assert_relative_eq;
    use ndarray::Axis;

    fn batch(states: &[Array2<Complex64>]) -> Array2<Complex64> {
        let rows: Vec<_> = states.iter().map(vectorize).collect();
        let views: Vec<_> = rows.iter().map(|r| r.view()).collect();
        ndarray::stack(Axis(0), &views).unwrap()
    }

    #[test]
    fn test_identity_channel_is_identity_superoperator() {
        for d in [2, 4] {
            let phi = choi_to_channel(&identity_choi(d), d).unwrap();
            assert_matrix_close(&phi, &eye(d * d), 1e-15);
        }
    }

    #[test]
    fn test_identity_choi_is_trace_preserving() {
        let tr = partial_trace_output(&identity_choi(4), 4).unwrap();
        assert_matrix_close(&tr, &eye(4), 1e-15);
    }

    #[test]
    fn test_unitary_channel_conjugates_state() {
        // Choi of ρ ↦ XρX is |vec(X)⟩⟨vec(X)| in the (p·d+q) layout
        let x = pauli_x();
        let k = Array2::from_shape_fn((4, 1), |(i, _)| x[[i / 2, i % 2]]);
        let choi = k.dot(&dagger(&k));
        let phi = choi_to_channel(&choi, 2).unwrap();

        let mut rng = seeded_rng(2);
        let rho = random_pure_state(2, &mut rng);
        let out = apply_channel_batch(&phi, &batch(&[rho.clone()])).unwrap();
        let rho_out = unvectorize(out.row(0), 2).unwrap();

        assert_matrix_close(&rho_out, &x.dot(&rho).dot(&x), 1e-14);
    }

    #[test]
    fn test_random_pure_state_is_normalized_projector() {
        let mut rng = seeded_rng(9);
        let rho = random_pure_state(4, &mut rng);
        assert_relative_eq!(trace(&rho).re, 1.0, epsilon = 1e-14);
        assert_matrix_close(&rho.dot(&rho), &rho, 1e-13);
        assert_matrix_close(&dagger(&rho), &rho, 1e-15);
    }

    #[test]
    fn test_vectorize_roundtrip_and_layout() {
        let mut rho = Array2::zeros((2, 2));
        rho[[0, 1]] = Complex64::new(1.0, 0.0);
        let v = vectorize(&rho);
        assert_eq!(v[1], Complex64::new(1.0, 0.0));
        assert_eq!(unvectorize(v.view(), 2).unwrap(), rho);
    }

    #[test]
    fn test_shape_errors() {
        assert!(choi_to_channel(&eye(3), 2).is_err());
        assert!(partial_trace_output(&eye(4), 3).is_err());
        let phi = eye(4);
        let bad = Array2::zeros((5, 3));
        assert!(matches!(
            apply_channel_batch(&phi, &bad),
            Err(ShapeError::Mismatch { .. })
        ));
    }
}
