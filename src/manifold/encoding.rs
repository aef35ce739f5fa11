// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Real encoding of complex matrices: `(n, k)` complex ↔ `(n, k, 2)` real.

use ndarray::{Array2, Array3};
use num_complex::Complex64;

use crate::error::ShapeError;

/// Stack real and imaginary parts on a trailing axis of length 2.
pub fn complex_to_real(m: &Array2<Complex64>) -> Array3<f64> {
    let (n, k) = m.dim();
    Array3::from_shape_fn((n, k, 2), |(i, j, part)| {
        let z = m[[i, j]];
        if part == 0 {
            z.re
        } else {
            z.im
        }
    })
}

/// Inverse of [`complex_to_real`].
pub fn real_to_complex(r: &Array3<f64>) -> Result<Array2<Complex64>, ShapeError> {
    let (n, k, parts) = r.dim();
    if parts != 2 {
        return Err(ShapeError::mismatch("real encoding", &[n, k, 2], &[n, k, parts]));
    }
    Ok(Array2::from_shape_fn((n, k), |(i, j)| {
        Complex64::new(r[[i, j, 0]], r[[i, j, 1]])
    }))
}
