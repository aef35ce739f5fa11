// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for channel tomography.

use std::fmt;

/// Result type alias for tomography operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug)]
pub enum Error {
    /// Configuration error
    Config(String),
    /// Array shape or dimension error
    Shape(ShapeError),
    /// Validation error
    Validation(ValidationError),
    /// Non-physical or non-finite intermediate value
    Numerical(NumericalError),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Shape(e) => write!(f, "Shape error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Numerical(e) => write!(f, "Numerical error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Shape(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Numerical(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Shape(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<NumericalError> for Error {
    fn from(e: NumericalError) -> Self {
        Error::Numerical(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Shape and dimension errors. Always fatal.
#[derive(Debug)]
pub enum ShapeError {
    /// Array shape differs from the one required
    Mismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// Operator is not square
    NotSquare { rows: usize, cols: usize },
    /// Kraus-rank budget outside 1..=rows
    RankBudget { rows: usize, rank: usize },
    /// Row count of a Choi factor is not d²
    NotPerfectSquare { rows: usize },
}

impl ShapeError {
    /// Shorthand for a [`ShapeError::Mismatch`].
    pub fn mismatch(what: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        ShapeError::Mismatch {
            what: what.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Mismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "{} has shape {:?}, expected {:?}",
                what, actual, expected
            ),
            ShapeError::NotSquare { rows, cols } => {
                write!(f, "operator is not square: {}x{}", rows, cols)
            }
            ShapeError::RankBudget { rows, rank } => write!(
                f,
                "Kraus rank {} must satisfy 1 <= k <= {}",
                rank, rows
            ),
            ShapeError::NotPerfectSquare { rows } => {
                write!(f, "row count {} is not a perfect square d²", rows)
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// Validation errors.
#[derive(Debug)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// Resource limit exceeded
    ResourceLimit {
        resource: String,
        limit: u64,
        requested: u64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::ResourceLimit {
                resource,
                limit,
                requested,
            } => {
                write!(
                    f,
                    "Resource limit exceeded for {}: limit={}, requested={}",
                    resource, limit, requested
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Non-physical values that would otherwise turn into NaN downstream.
#[derive(Debug)]
pub enum NumericalError {
    /// Outcome probability p_i <= 0 (or NaN) fed into the log-likelihood
    NonPositiveProbability { sample: usize, value: f64 },
    /// Probability table entry that is negative or not finite
    InvalidProbability { row: usize, col: usize, value: f64 },
    /// Probability table row with no positive entry
    NoSupport { row: usize },
    /// Loss evaluated to a non-finite value
    NonFiniteLoss(f64),
}

impl fmt::Display for NumericalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericalError::NonPositiveProbability { sample, value } => write!(
                f,
                "non-positive outcome probability {} for sample {}",
                value, sample
            ),
            NumericalError::InvalidProbability { row, col, value } => write!(
                f,
                "invalid probability {} at row {}, outcome {}",
                value, row, col
            ),
            NumericalError::NoSupport { row } => {
                write!(f, "probability row {} has no positive entry", row)
            }
            NumericalError::NonFiniteLoss(value) => write!(f, "loss is not finite: {}", value),
        }
    }
}

impl std::error::Error for NumericalError {}
