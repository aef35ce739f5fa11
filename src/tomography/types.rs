// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tomography configuration and result types.

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::manifold::Constraint;

/// Channel the synthetic data is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruthKind {
    /// Random trace-preserving channel of the configured Kraus rank.
    #[default]
    Random,
    /// Identity channel (Kraus rank 1).
    Identity,
}

/// Configuration of one tomography run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomographyConfig {
    /// Number of qubits `n`; the Hilbert dimension is `2^n`.
    #[serde(default = "default_num_qubits")]
    pub num_qubits: usize,

    /// Kraus-rank budget `k` of the estimate, `1 <= k <= 4^n`.
    #[serde(default = "default_kraus_rank")]
    pub kraus_rank: usize,

    /// Measurement shots. In noiseless mode, the number of input states.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,

    /// Optimizer iterations.
    #[serde(default = "default_num_iterations")]
    pub num_iterations: usize,

    /// Seed for ground truth, inputs, sampling and the initial point.
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub ground_truth: GroundTruthKind,

    /// Use exact outcome probabilities as weights instead of sampling.
    #[serde(default)]
    pub noiseless: bool,

    /// Restrict the estimate to trace-preserving channels.
    #[serde(default = "default_true")]
    pub trace_preserving: bool,

    /// Record the distance to the ground truth every iteration.
    #[serde(default = "default_true")]
    pub track_distance: bool,

    /// Stop early once the distance falls below this value.
    #[serde(default)]
    pub target_distance: Option<f64>,

    /// Lower clamp on the eigenvalues of `A†A` in the horizontal projection.
    #[serde(default)]
    pub min_eigenvalue_floor: Option<f64>,
}

/// Largest register a run or a dataset may describe.
pub const MAX_QUBITS: usize = 8;

fn default_num_qubits() -> usize {
    2
}

fn default_kraus_rank() -> usize {
    2
}

fn default_num_samples() -> usize {
    600_000
}

fn default_num_iterations() -> usize {
    400
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

impl Default for TomographyConfig {
    fn default() -> Self {
        Self {
            num_qubits: default_num_qubits(),
            kraus_rank: default_kraus_rank(),
            num_samples: default_num_samples(),
            num_iterations: default_num_iterations(),
            seed: default_seed(),
            ground_truth: GroundTruthKind::default(),
            noiseless: false,
            trace_preserving: true,
            track_distance: true,
            target_distance: None,
            min_eigenvalue_floor: None,
        }
    }
}

impl TomographyConfig {
    /// Hilbert-space dimension `d = 2^n`.
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Number of POVM outcomes, `4^n`.
    pub fn num_outcomes(&self) -> usize {
        1 << (2 * self.num_qubits)
    }

    pub fn constraint(&self) -> Constraint {
        if self.trace_preserving {
            Constraint::TracePreserving
        } else {
            Constraint::Unconstrained
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_qubits == 0 {
            return Err("num_qubits must be > 0".into());
        }
        if self.num_qubits > MAX_QUBITS {
            return Err(format!("num_qubits must be <= {}", MAX_QUBITS));
        }
        let rows = self.dim() * self.dim();
        if self.kraus_rank == 0 || self.kraus_rank > rows {
            return Err(format!("kraus_rank must be in [1, {}]", rows));
        }
        if self.num_samples == 0 {
            return Err("num_samples must be > 0".into());
        }
        if self.num_iterations == 0 {
            return Err("num_iterations must be > 0".into());
        }
        if let Some(target) = self.target_distance {
            if !(0.0..=1.0).contains(&target) {
                return Err("target_distance must be in [0, 1]".into());
            }
        }
        if let Some(floor) = self.min_eigenvalue_floor {
            if floor.is_nan() || floor < 0.0 {
                return Err("min_eigenvalue_floor must be >= 0".into());
            }
        }
        Ok(())
    }
}

/// Lifecycle of a tomography session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Initial point drawn, no step taken.
    Init,
    /// At least one step taken, budget not exhausted.
    Iterating,
    /// Distance fell below the target.
    Converged,
    /// Iteration budget used up.
    StepsExhausted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Converged | SessionState::StepsExhausted)
    }
}

/// Loss and distance after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration index.
    pub iteration: usize,
    /// Loss at the point the gradient was taken.
    pub loss: f64,
    /// Distance of the updated estimate to the ground truth.
    pub distance: Option<f64>,
}

/// Result of a tomography run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomographyResult {
    /// Final manifold point `A`.
    pub estimate: Array2<Complex64>,
    /// Final Choi matrix `A·A†`.
    pub choi: Array2<Complex64>,
    /// Iterations executed in total (including resumed ones).
    pub iterations: usize,
    pub state: SessionState,
    /// Loss per iteration.
    pub loss_history: Vec<f64>,
    /// Distance per iteration (empty without a ground truth).
    pub distance_history: Vec<f64>,
}

impl TomographyResult {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }

    pub fn final_distance(&self) -> Option<f64> {
        self.distance_history.last().copied()
    }

    pub fn converged(&self) -> bool {
        self.state == SessionState::Converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomographyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_qubits, 2);
        assert_eq!(config.kraus_rank, 2);
        assert_eq!(config.num_samples, 600_000);
        assert_eq!(config.num_iterations, 400);
        assert_eq!(config.dim(), 4);
        assert_eq!(config.num_outcomes(), 16);
        assert_eq!(config.constraint(), Constraint::TracePreserving);
        assert!(config.target_distance.is_none());
    }

    #[test]
    fn test_config_validation() {
        let cases: Vec<(TomographyConfig, &str)> = vec![
            (
                TomographyConfig {
                    num_qubits: 0,
                    ..Default::default()
                },
                "num_qubits",
            ),
            (
                TomographyConfig {
                    kraus_rank: 17,
                    ..Default::default()
                },
                "kraus_rank",
            ),
            (
                TomographyConfig {
                    kraus_rank: 0,
                    ..Default::default()
                },
                "kraus_rank",
            ),
            (
                TomographyConfig {
                    num_samples: 0,
                    ..Default::default()
                },
                "num_samples",
            ),
            (
                TomographyConfig {
                    num_iterations: 0,
                    ..Default::default()
                },
                "num_iterations",
            ),
            (
                TomographyConfig {
                    target_distance: Some(2.0),
                    ..Default::default()
                },
                "target_distance",
            ),
            (
                TomographyConfig {
                    min_eigenvalue_floor: Some(-1.0),
                    ..Default::default()
                },
                "min_eigenvalue_floor",
            ),
        ];
        for (config, field) in cases {
            let err = config.validate().unwrap_err();
            assert!(err.contains(field), "{} should mention {}", err, field);
        }
    }

    #[test]
    fn test_full_rank_budget_is_valid() {
        let config = TomographyConfig {
            num_qubits: 1,
            kraus_rank: 4,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_yaml_defaults() {
        let config: TomographyConfig = serde_yaml::from_str("num_qubits: 1\nground_truth: identity\n").unwrap();
        assert_eq!(config.num_qubits, 1);
        assert_eq!(config.ground_truth, GroundTruthKind::Identity);
        assert_eq!(config.num_iterations, 400);
        assert!(config.trace_preserving);
    }

    #[test]
    fn test_session_state_terminal() {
        assert!(!SessionState::Init.is_terminal());
        assert!(!SessionState::Iterating.is_terminal());
        assert!(SessionState::Converged.is_terminal());
        assert!(SessionState::StepsExhausted.is_terminal());
    }
}
