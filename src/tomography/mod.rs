// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Maximum-likelihood channel tomography.
//!
//! Synthetic data is generated from a ground-truth channel (random
//! trace-preserving or identity): Haar-random pure inputs pass through the
//! channel and are measured with the tensor-power tetrahedral POVM. The
//! estimate `A` lives on the [`ChoiMatrix`](crate::manifold::ChoiMatrix)
//! manifold and is fitted by minimizing the negative log-likelihood with a
//! Riemannian optimizer. The distance
//!
//! ```text
//! J = (1/2d) · Σ |eig(A·A† − C_true)|
//! ```
//!
//! is recorded after every step when the ground truth is known.
//!
//! # Example
//!
//! ```no_run
//! use qubit_os_tomography::config::ValidationConfig;
//! use qubit_os_tomography::optimizer::OptimizerConfig;
//! use qubit_os_tomography::tomography::{TomographyConfig, TomographySession};
//!
//! let config = TomographyConfig {
//!     num_qubits: 1,
//!     kraus_rank: 1,
//!     ..Default::default()
//! };
//! let mut session = TomographySession::from_config(
//!     &config,
//!     &OptimizerConfig::default(),
//!     &ValidationConfig::default(),
//! )?;
//! let result = session.run()?;
//! println!("J = {:?}", result.final_distance());
//! # Ok::<(), qubit_os_tomography::Error>(())
//! ```

pub mod dataset;
pub mod likelihood;
pub mod session;
pub mod types;

pub use dataset::{generate, noiseless, outcome_probabilities, simulate, Dataset};
pub use likelihood::{choi_distance, finite_difference_gradient, Differentiable, NegativeLogLikelihood};
pub use session::TomographySession;
pub use types::{
    GroundTruthKind, IterationRecord, SessionState, TomographyConfig, TomographyResult, MAX_QUBITS,
};
