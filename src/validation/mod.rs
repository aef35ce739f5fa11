// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for tomography runs.

use ndarray::Array3;

use crate::config::ResourceLimits;
use crate::error::{Result, ShapeError, ValidationError};
use crate::tomography::{Dataset, TomographyConfig};

/// Validate a run configuration against resource limits.
pub fn validate_tomography_config(config: &TomographyConfig, limits: &ResourceLimits) -> Result<()> {
    if config.num_qubits == 0 {
        return Err(ValidationError::Field {
            field: "num_qubits".into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }

    if config.num_qubits > limits.max_qubits as usize {
        return Err(ValidationError::ResourceLimit {
            resource: "num_qubits".into(),
            limit: limits.max_qubits as u64,
            requested: config.num_qubits as u64,
        }
        .into());
    }

    let rows = config.dim() * config.dim();
    if config.kraus_rank == 0 || config.kraus_rank > rows {
        return Err(ValidationError::Field {
            field: "kraus_rank".into(),
            message: format!("must be in [1, {}]", rows),
        }
        .into());
    }

    if config.num_samples == 0 {
        return Err(ValidationError::Field {
            field: "num_samples".into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }

    if config.num_samples as u64 > limits.max_samples {
        return Err(ValidationError::ResourceLimit {
            resource: "num_samples".into(),
            limit: limits.max_samples,
            requested: config.num_samples as u64,
        }
        .into());
    }

    if config.num_iterations as u64 > limits.max_iterations {
        return Err(ValidationError::ResourceLimit {
            resource: "num_iterations".into(),
            limit: limits.max_iterations,
            requested: config.num_iterations as u64,
        }
        .into());
    }

    // Noiseless data keeps every (input, outcome) pair
    if config.noiseless {
        let dataset_rows = (config.num_samples as u64).saturating_mul(config.num_outcomes() as u64);
        if dataset_rows > limits.max_dataset_rows {
            return Err(ValidationError::ResourceLimit {
                resource: "dataset_rows".into(),
                limit: limits.max_dataset_rows,
                requested: dataset_rows,
            }
            .into());
        }
    }

    Ok(())
}

/// Validate a dataset before it is handed to a session.
pub fn validate_dataset(dataset: &Dataset, num_qubits: usize) -> Result<()> {
    if dataset.num_qubits() != num_qubits {
        return Err(ValidationError::Field {
            field: "dataset".into(),
            message: format!(
                "recorded on {} qubits, run configured for {}",
                dataset.num_qubits(),
                num_qubits
            ),
        }
        .into());
    }

    if dataset.is_empty() {
        return Err(ValidationError::Field {
            field: "dataset".into(),
            message: "contains no samples".into(),
        }
        .into());
    }

    if dataset.total_weight() <= 0.0 {
        return Err(ValidationError::Field {
            field: "weights".into(),
            message: "total weight must be positive".into(),
        }
        .into());
    }

    Ok(())
}

/// Validate the number of dataset rows against resource limits.
pub fn validate_dataset_size(rows: usize, limits: &ResourceLimits) -> Result<()> {
    if rows as u64 > limits.max_dataset_rows {
        return Err(ValidationError::ResourceLimit {
            resource: "dataset_rows".into(),
            limit: limits.max_dataset_rows,
            requested: rows as u64,
        }
        .into());
    }

    Ok(())
}

/// Validate the real encoding of a manifold point for `d²` rows and rank `k`.
pub fn validate_params(params: &Array3<f64>, dim: usize, kraus_rank: usize) -> Result<()> {
    let expected = [dim * dim, kraus_rank, 2];
    let (a, b, c) = params.dim();
    if [a, b, c] != expected {
        return Err(ShapeError::mismatch("parameters", &expected, &[a, b, c]).into());
    }

    for (i, val) in params.iter().enumerate() {
        if val.is_nan() {
            return Err(ValidationError::Field {
                field: "params".into(),
                message: format!("contains NaN at index {}", i),
            }
            .into());
        }
        if val.is_infinite() {
            return Err(ValidationError::Field {
                field: "params".into(),
                message: format!("contains Inf at index {}", i),
            }
            .into());
        }
    }

    Ok(())
}
