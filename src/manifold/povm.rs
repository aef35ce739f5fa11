// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Manifold of `m`-outcome POVMs on `C^n`.
//!
//! A POVM `{E_i}` is parametrized as `E_i = A_i·A_i†` with `Σ_i E_i = I`.
//! Points stack the `n × n` blocks `A_i` vertically into an `(m·n, n)`
//! matrix. Each `A_i` is defined up to `A_i ~ A_i·Q_i`, so tangent vectors
//! are made horizontal block by block. Stacking the adjoints `A_i†` gives an
//! isometry `V` (`V†V = Σ_i E_i`), and the completeness constraint is
//! handled with Stiefel geometry on `V`.

use ndarray::{s, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use super::{ChoiMatrix, Manifold};
use crate::error::{Result, ShapeError};
use crate::linalg::{dagger, eye, frobenius_norm_sqr, hermitian_map, real_inner};

/// POVMs with a fixed number of elements.
#[derive(Debug, Clone)]
pub struct Povm {
    num_elements: usize,
    quotient: ChoiMatrix,
}

impl Povm {
    pub fn new(num_elements: usize) -> Self {
        Self {
            num_elements,
            quotient: ChoiMatrix::new(),
        }
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// The POVM elements `E_i = A_i·A_i†` of a point.
    pub fn elements(&self, point: &Array2<Complex64>) -> Result<Vec<Array2<Complex64>>> {
        let n = self.block_size(point.nrows(), point.ncols())?;
        Ok((0..self.num_elements)
            .map(|i| {
                let a = block(point, i, n);
                a.dot(&dagger(&a))
            })
            .collect())
    }

    /// Side of the `n × n` blocks of a `(rows, cols)` point.
    fn block_size(&self, rows: usize, cols: usize) -> Result<usize> {
        let m = self.num_elements;
        if m == 0 || cols == 0 || rows != m * cols {
            return Err(ShapeError::mismatch("POVM point", &[m * cols, cols], &[rows, cols]).into());
        }
        Ok(cols)
    }

    fn check_same_shape(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Result<()> {
        if a.dim() != b.dim() {
            let (er, ec) = a.dim();
            let (ar, ac) = b.dim();
            return Err(ShapeError::mismatch("tangent vector", &[er, ec], &[ar, ac]).into());
        }
        Ok(())
    }
}

impl Manifold for Povm {
    fn name(&self) -> &'static str {
        "POVM"
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
        Self::check_same_shape(point, v)?;
        let n = self.block_size(point.nrows(), point.ncols())?;

        // Tangent space of the completeness constraint
        let u = adjoint_blocks(point, n);
        let xi = adjoint_blocks(v, n);
        let sym = dagger(&u).dot(&xi) + dagger(&xi).dot(&u);
        let tangent = adjoint_blocks(&(&xi - &(u.dot(&sym) * Complex64::new(0.5, 0.0))), n);

        // Horizontal part, element by element
        let mut projected = Array2::zeros(point.raw_dim());
        for i in 0..self.num_elements {
            let rows = s![i * n..(i + 1) * n, ..];
            let h = self
                .quotient
                .project_to_horizontal(&block(point, i, n), &tangent.slice(rows).to_owned())?;
            projected.slice_mut(rows).assign(&h);
        }
        Ok(projected)
    }

    fn retraction(
        &self,
        point: &Array2<Complex64>,
        step: &Array2<Complex64>,
    ) -> Result<Array2<Complex64>> {
        Self::check_same_shape(point, step)?;
        let n = self.block_size(point.nrows(), point.ncols())?;
        polar_blocks(&(point + step), n)
    }

    fn retraction_transport(
        &self,
        point: &Array2<Complex64>,
        v: &Array2<Complex64>,
        direction: &Array2<Complex64>,
    ) -> Result<(Array2<Complex64>, Array2<Complex64>)> {
        let new_point = self.retraction(point, direction)?;
        let transported = self.proj(&new_point, v)?;
        Ok((new_point, transported))
    }

    fn random(&self, rows: usize, cols: usize, rng: &mut StdRng) -> Result<Array2<Complex64>> {
        let n = self.block_size(rows, cols)?;
        polar_blocks(&gaussian(rows, cols, rng), n)
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
        let Ok(n) = self.block_size(rows, cols) else {
            return false;
        };
        if point.iter().any(|z| !z.is_finite()) {
            return false;
        }
        let u = adjoint_blocks(point, n);
        let gram = dagger(&u).dot(&u);
        let id = eye(n);
        frobenius_norm_sqr(&(&gram - &id)).sqrt() / (n as f64).sqrt() < tol
    }
}

fn block(point: &Array2<Complex64>, i: usize, n: usize) -> Array2<Complex64> {
    point.slice(s![i * n..(i + 1) * n, ..]).to_owned()
}

/// Replace every `n × n` block by its adjoint. Self-inverse.
fn adjoint_blocks(x: &Array2<Complex64>, n: usize) -> Array2<Complex64> {
    Array2::from_shape_fn(x.raw_dim(), |(row, col)| {
        let (i, r) = (row / n, row % n);
        x[[i * n + col, r]].conj()
    })
}

/// Closest POVM point: polar factor of the stacked adjoints.
fn polar_blocks(x: &Array2<Complex64>, n: usize) -> Result<Array2<Complex64>> {
    let y = adjoint_blocks(x, n);
    let inv_sqrt = hermitian_map(&dagger(&y).dot(&y), |l| 1.0 / l.max(f64::MIN_POSITIVE).sqrt())?;
    Ok(adjoint_blocks(&y.dot(&inv_sqrt), n))
}

fn gaussian(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<Complex64> {
    Array2::from_shape_simple_fn((rows, cols), || {
        let re: f64 = StandardNormal.sample(rng);
        let im: f64 = StandardNormal.sample(rng);
        Complex64::new(re, im)
    })
}
