// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator algebra for channel tomography.
//!
//! - Tetrahedral (SIC) POVM and its tensor powers
//! - Choi matrix ↔ superoperator reshape, batched channel application
//! - Haar-random input states and the identity channel
//!
//! # References
//!
//! - Renes, J. M. et al. (2004). "Symmetric informationally complete quantum
//!   measurements." J. Math. Phys. 45, 2171. DOI: 10.1063/1.1737053
//! - Watrous, J. (2018). "The Theory of Quantum Information." Cambridge, §2.2.

pub mod channel;
pub mod povm;

pub use channel::{
    apply_channel_batch, choi_to_channel, identity_choi, identity_kraus, partial_trace_output,
    random_pure_state, unvectorize, vectorize,
};
pub use povm::{povm_matrix, qubit_povm, tensor_power, tetrahedral_povm};
