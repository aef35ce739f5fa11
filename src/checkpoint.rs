// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! JSON checkpoints of a tomography session.
//!
//! A checkpoint carries everything needed to continue a run: the
//! real-encoded point, optimizer state, iteration counter and dataset,
//! plus the ground truth when one is known.

use std::fs;
use std::path::Path;

use ndarray::{Array2, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::optimizer::{OptimizerKind, OptimizerState};
use crate::tomography::Dataset;

/// Format version written into every checkpoint.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serialized session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Completed iterations.
    pub iteration: usize,
    /// Real `(d², k, 2)` encoding of the current point.
    pub params: Array3<f64>,
    pub optimizer_kind: OptimizerKind,
    pub optimizer: OptimizerState,
    pub dataset: Dataset,
    pub truth: Option<Array2<Complex64>>,
    pub loss_history: Vec<f64>,
    pub distance_history: Vec<f64>,
}

impl Checkpoint {
    /// Write as JSON to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        info!(
            path = %path.display(),
            iteration = self.iteration,
            "checkpoint written"
        );
        Ok(())
    }

    /// Read a checkpoint. The dataset is validated while it is parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&content)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(Error::Serialization(format!(
                "unsupported checkpoint version {} (expected {})",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }
        if checkpoint.loss_history.len() != checkpoint.iteration {
            return Err(Error::Serialization(format!(
                "checkpoint has {} loss entries for {} iterations",
                checkpoint.loss_history.len(),
                checkpoint.iteration
            )));
        }

        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::{complex_to_real, ChoiMatrix, Manifold};
    use crate::test_utils::seeded_rng;
    use crate::tomography::dataset::{ground_truth, simulate};
    use crate::tomography::GroundTruthKind;

    fn sample_checkpoint() -> Checkpoint {
        let mut rng = seeded_rng(71);
        let truth = ground_truth(GroundTruthKind::Random, 1, 2, &mut rng).unwrap();
        let dataset = simulate(&truth, 1, 20, 1e-6, &mut rng).unwrap();
        let point = ChoiMatrix::trace_preserving().random(4, 2, &mut rng).unwrap();
        Checkpoint {
            version: CHECKPOINT_VERSION,
            iteration: 2,
            params: complex_to_real(&point),
            optimizer_kind: OptimizerKind::RAdam,
            optimizer: OptimizerState {
                m: Some(point.clone()),
                v: 0.25,
                v_max: 0.5,
                t: 2,
            },
            dataset,
            truth: Some(truth),
            loss_history: vec![1.5, 1.25],
            distance_history: vec![0.5, 0.25],
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let checkpoint = sample_checkpoint();
        checkpoint.save(&path).unwrap();

        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(loaded.iteration, 2);
        assert_eq!(loaded.optimizer_kind, OptimizerKind::RAdam);
        assert_eq!(loaded.optimizer.t, 2);
        assert_eq!(loaded.dataset.len(), 20);
        assert_eq!(loaded.loss_history, vec![1.5, 1.25]);
        for (a, b) in loaded.params.iter().zip(checkpoint.params.iter()) {
            assert!((a - b).abs() < 1e-15);
        }
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut checkpoint = sample_checkpoint();
        checkpoint.version = 99;
        checkpoint.save(&path).unwrap();

        let err = Checkpoint::load(&path).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn test_rejects_inconsistent_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut checkpoint = sample_checkpoint();
        checkpoint.iteration = 5;
        checkpoint.save(&path).unwrap();
        assert!(Checkpoint::load(&path).is_err());
    }

    #[test]
    fn test_rejects_oversized_register() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let json = serde_json::to_string(&sample_checkpoint()).unwrap();
        assert!(json.contains("\"num_qubits\":1,"));
        std::fs::write(&path, json.replace("\"num_qubits\":1,", "\"num_qubits\":64,")).unwrap();

        let err = Checkpoint::load(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().contains("num_qubits"));
    }

    #[test]
    fn test_missing_or_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Checkpoint::load(&dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));

        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(Error::Serialization(_))
        ));
    }
}
