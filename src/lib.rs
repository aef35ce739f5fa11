// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS Channel Tomography
//!
//! Reconstructs an unknown quantum channel from simulated measurement data
//! by Riemannian optimization of its Choi matrix `C = A·A†` over the
//! quotient `A ~ A·Q` (`Q` unitary).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Tomography session              │
//! ├──────────────────┬──────────────────────┤
//! │  Likelihood +    │   Riemannian         │
//! │  gradient        │   optimizer          │
//! ├──────────────────┴──────────────────────┤
//! │     Choi-matrix quotient manifold        │
//! ├────────────────┬────────────────────────┤
//! │ Operators/POVM │  Categorical sampler   │
//! └────────────────┴────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`manifold`]: Choi-matrix and POVM manifolds and their geometry
//! - [`optimizer`]: Riemannian Adam and SGD
//! - [`sampling`]: Gumbel-max categorical sampler
//! - [`operators`]: POVMs, channels and states
//! - [`tomography`]: Data generation, likelihood and the reconstruction loop
//! - [`checkpoint`]: Session persistence
//! - [`config`]: Configuration management
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod linalg;
pub mod manifold;
pub mod operators;
pub mod optimizer;
pub mod sampling;
pub mod tomography;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
