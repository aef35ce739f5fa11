// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! The reconstruction loop.
//!
//! A session owns the current point (in its real encoding), the optimizer
//! state and the histories. Iterations are strictly sequential; all
//! parallelism lives inside the likelihood and the sampler.

use ndarray::{Array2, Array3};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::dataset::{generate, Dataset};
use super::likelihood::{choi_distance, Differentiable, NegativeLogLikelihood};
use super::types::{IterationRecord, SessionState, TomographyConfig, TomographyResult};
use crate::checkpoint::{Checkpoint, CHECKPOINT_VERSION};
use crate::config::ValidationConfig;
use crate::error::{Error, Result, ShapeError};
use crate::manifold::{complex_to_real, real_to_complex, ChoiMatrix, ChoiMatrixConfig, Manifold};
use crate::optimizer::{OptimizerConfig, RiemannianOptimizer};
use crate::validation::{validate_dataset, validate_dataset_size, validate_params};

/// One channel reconstruction.
pub struct TomographySession {
    config: TomographyConfig,
    manifold: ChoiMatrix,
    optimizer: Box<dyn RiemannianOptimizer>,
    objective: NegativeLogLikelihood,
    truth: Option<Array2<Complex64>>,
    truth_choi: Option<Array2<Complex64>>,
    params: Array3<f64>,
    iteration: usize,
    state: SessionState,
    loss_history: Vec<f64>,
    distance_history: Vec<f64>,
}

impl TomographySession {
    /// Start a session on `dataset` from a random point drawn with `rng`.
    pub fn new(
        config: &TomographyConfig,
        optimizer_config: &OptimizerConfig,
        dataset: Dataset,
        truth: Option<Array2<Complex64>>,
        rng: &mut StdRng,
    ) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        validate_dataset(&dataset, config.num_qubits)?;
        let d = config.dim();
        if let Some(t) = &truth {
            if t.nrows() != d * d {
                let (r, c) = t.dim();
                return Err(ShapeError::mismatch("ground truth", &[d * d, c], &[r, c]).into());
            }
        }

        let manifold = Self::build_manifold(config, &ValidationConfig::default());
        let point = manifold.random(d * d, config.kraus_rank, rng)?;
        let truth_choi = truth.as_ref().map(ChoiMatrix::choi);

        Ok(Self {
            config: config.clone(),
            manifold,
            optimizer: optimizer_config.build()?,
            objective: NegativeLogLikelihood::new(dataset),
            truth,
            truth_choi,
            params: complex_to_real(&point),
            iteration: 0,
            state: SessionState::Init,
            loss_history: Vec::new(),
            distance_history: Vec::new(),
        })
    }

    /// Generate ground truth and data from `config.seed`, then start a
    /// session on them.
    pub fn from_config(
        config: &TomographyConfig,
        optimizer_config: &OptimizerConfig,
        validation: &ValidationConfig,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let (truth, dataset) = generate(config, validation.row_sum_tolerance, &mut rng)?;
        validate_dataset_size(dataset.len(), &validation.limits)?;
        let session = Self::new(config, optimizer_config, dataset, Some(truth), &mut rng)?;
        Ok(session.with_validation(validation))
    }

    /// Resume from a checkpoint. `config` may extend the iteration budget.
    pub fn from_checkpoint(
        config: &TomographyConfig,
        optimizer_config: &OptimizerConfig,
        checkpoint: Checkpoint,
    ) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        if checkpoint.optimizer_kind != optimizer_config.kind {
            return Err(Error::Config(format!(
                "checkpoint was written by {}, configured optimizer is {}",
                checkpoint.optimizer_kind, optimizer_config.kind
            )));
        }
        validate_params(&checkpoint.params, config.dim(), config.kraus_rank)?;
        validate_dataset(&checkpoint.dataset, config.num_qubits)?;

        let mut optimizer = optimizer_config.build()?;
        optimizer.load_state(checkpoint.optimizer)?;
        let truth_choi = checkpoint.truth.as_ref().map(ChoiMatrix::choi);

        let mut session = Self {
            config: config.clone(),
            manifold: Self::build_manifold(config, &ValidationConfig::default()),
            optimizer,
            objective: NegativeLogLikelihood::new(checkpoint.dataset),
            truth: checkpoint.truth,
            truth_choi,
            params: checkpoint.params,
            iteration: checkpoint.iteration,
            state: SessionState::Init,
            loss_history: checkpoint.loss_history,
            distance_history: checkpoint.distance_history,
        };
        session.state = session.next_state(session.distance_history.last().copied());
        info!(
            iteration = session.iteration,
            state = ?session.state,
            "resumed tomography session"
        );
        Ok(session)
    }

    /// Apply the numerical knobs of `validation` to the manifold.
    pub fn with_validation(mut self, validation: &ValidationConfig) -> Self {
        self.manifold = Self::build_manifold(&self.config, validation);
        self
    }

    /// Replace the random starting point with `point`, retracted onto the
    /// manifold. Only valid before the first step.
    pub fn with_initial_point(mut self, point: &Array2<Complex64>) -> Result<Self> {
        if self.iteration != 0 {
            return Err(Error::Config(format!(
                "cannot reset the starting point after {} iterations",
                self.iteration
            )));
        }
        let d = self.config.dim();
        let expected = [d * d, self.config.kraus_rank];
        let (r, c) = point.dim();
        if [r, c] != expected {
            return Err(ShapeError::mismatch("initial point", &expected, &[r, c]).into());
        }
        let start = self.manifold.retraction(point, &Array2::zeros((r, c)))?;
        self.params = complex_to_real(&start);
        Ok(self)
    }

    fn build_manifold(config: &TomographyConfig, validation: &ValidationConfig) -> ChoiMatrix {
        ChoiMatrix::with_constraint(config.constraint()).with_config(ChoiMatrixConfig {
            conditioning_threshold: validation.conditioning_threshold,
            min_eigenvalue_floor: config.min_eigenvalue_floor,
        })
    }

    /// One iteration: loss and gradient at the current point, optimizer
    /// step, distance of the new point to the ground truth.
    pub fn step(&mut self) -> Result<IterationRecord> {
        if self.state.is_terminal() {
            return Err(Error::Config(format!(
                "session already finished ({:?}) after {} iterations",
                self.state, self.iteration
            )));
        }

        let (loss, grad) = self.objective.value_and_gradient(&self.params)?;
        self.optimizer
            .apply_gradients(&self.manifold, &mut self.params, &grad)?;

        self.iteration += 1;
        self.loss_history.push(loss);

        let distance = self.distance()?;
        if let Some(j) = distance {
            self.distance_history.push(j);
        }
        self.state = self.next_state(distance);

        debug!(
            iteration = self.iteration,
            loss,
            distance = ?distance,
            "tomography iteration"
        );

        Ok(IterationRecord {
            iteration: self.iteration,
            loss,
            distance,
        })
    }

    /// Iterate until the session terminates.
    pub fn run(&mut self) -> Result<TomographyResult> {
        info!(
            num_qubits = self.config.num_qubits,
            kraus_rank = self.config.kraus_rank,
            samples = self.objective.dataset().len(),
            iterations = self.config.num_iterations,
            start = self.iteration,
            optimizer = %self.optimizer.kind(),
            learning_rate = self.optimizer.learning_rate(),
            manifold = self.manifold.name(),
            "starting channel tomography"
        );

        while !self.state.is_terminal() {
            self.step()?;
        }

        let result = self.result()?;
        info!(
            iterations = result.iterations,
            state = ?result.state,
            final_loss = ?result.final_loss(),
            final_distance = ?result.final_distance(),
            "channel tomography finished"
        );
        Ok(result)
    }

    /// Distance of the current estimate to the ground truth, when tracked.
    pub fn distance(&self) -> Result<Option<f64>> {
        match (&self.truth_choi, self.config.track_distance) {
            (Some(truth_choi), true) => {
                let choi = ChoiMatrix::choi(&self.estimate()?);
                Ok(Some(choi_distance(&choi, truth_choi)?))
            }
            _ => Ok(None),
        }
    }

    fn next_state(&self, distance: Option<f64>) -> SessionState {
        let reached = match (self.config.target_distance, distance) {
            (Some(target), Some(j)) => j < target,
            _ => false,
        };
        if reached {
            SessionState::Converged
        } else if self.iteration >= self.config.num_iterations {
            SessionState::StepsExhausted
        } else if self.iteration == 0 {
            SessionState::Init
        } else {
            SessionState::Iterating
        }
    }

    /// Current point `A`.
    pub fn estimate(&self) -> Result<Array2<Complex64>> {
        Ok(real_to_complex(&self.params)?)
    }

    pub fn params(&self) -> &Array3<f64> {
        &self.params
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dataset(&self) -> &Dataset {
        self.objective.dataset()
    }

    pub fn truth(&self) -> Option<&Array2<Complex64>> {
        self.truth.as_ref()
    }

    pub fn manifold(&self) -> &ChoiMatrix {
        &self.manifold
    }

    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    pub fn distance_history(&self) -> &[f64] {
        &self.distance_history
    }

    /// Snapshot of everything [`TomographySession::from_checkpoint`] needs.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            iteration: self.iteration,
            params: self.params.clone(),
            optimizer_kind: self.optimizer.kind(),
            optimizer: self.optimizer.state(),
            dataset: self.objective.dataset().clone(),
            truth: self.truth.clone(),
            loss_history: self.loss_history.clone(),
            distance_history: self.distance_history.clone(),
        }
    }

    pub fn result(&self) -> Result<TomographyResult> {
        let estimate = self.estimate()?;
        Ok(TomographyResult {
            choi: ChoiMatrix::choi(&estimate),
            estimate,
            iterations: self.iteration,
            state: self.state,
            loss_history: self.loss_history.clone(),
            distance_history: self.distance_history.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizerKind;
    use crate::tomography::GroundTruthKind;
    use approx::assert_relative_eq;

    fn identity_config(num_iterations: usize) -> TomographyConfig {
        TomographyConfig {
            num_qubits: 1,
            kraus_rank: 1,
            num_samples: 32,
            num_iterations,
            seed: 7,
            ground_truth: GroundTruthKind::Identity,
            noiseless: true,
            ..Default::default()
        }
    }

    fn session(config: &TomographyConfig) -> TomographySession {
        TomographySession::from_config(config, &OptimizerConfig::default(), &ValidationConfig::default())
            .unwrap()
    }

    #[test]
    fn test_identity_channel_is_recovered() {
        let config = identity_config(400);
        let mut s = session(&config);
        assert_eq!(s.state(), SessionState::Init);

        let result = s.run().unwrap();
        assert_eq!(result.state, SessionState::StepsExhausted);
        assert_eq!(result.iterations, 400);
        assert_eq!(result.loss_history.len(), 400);
        assert_eq!(result.distance_history.len(), 400);

        let j = &result.distance_history;
        let final_j = j[399];
        assert!(final_j < 1e-2, "final distance {}", final_j);
        assert!(final_j < j[199], "{} !< {}", final_j, j[199]);
        assert!(s.manifold().is_in_manifold(&result.estimate, 1e-8));
    }

    /// Point of the unitary channel `exp(−iθX/2)`, at distance `sin(θ/2)`
    /// from the identity.
    fn x_rotation(theta: f64) -> Array2<Complex64> {
        let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
        Array2::from_shape_vec(
            (4, 1),
            vec![
                Complex64::new(c, 0.0),
                Complex64::new(0.0, -s),
                Complex64::new(0.0, -s),
                Complex64::new(c, 0.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_plain_descent_distance_decreases_monotonically() {
        let optimizer = OptimizerConfig {
            kind: OptimizerKind::RSgd,
            learning_rate: 0.1,
            ..Default::default()
        };
        let mut s = TomographySession::from_config(
            &identity_config(200),
            &optimizer,
            &ValidationConfig::default(),
        )
        .unwrap()
        .with_initial_point(&x_rotation(1.0))
        .unwrap();
        assert_relative_eq!(s.distance().unwrap().unwrap(), 0.5f64.sin(), epsilon = 1e-12);

        let result = s.run().unwrap();
        let j = &result.distance_history;
        assert_eq!(j.len(), 200);
        assert!(j[199] < 1e-2, "final distance {}", j[199]);
        for i in 100..199 {
            assert!(j[i + 1] < j[i], "J rose at step {}: {} -> {}", i + 1, j[i], j[i + 1]);
        }
    }

    #[test]
    fn test_initial_point_is_checked() {
        let s = session(&identity_config(5));
        assert!(matches!(
            s.with_initial_point(&Array2::zeros((4, 2))),
            Err(Error::Shape(_))
        ));

        let mut s = session(&identity_config(5));
        s.step().unwrap();
        assert!(matches!(
            s.with_initial_point(&x_rotation(0.5)),
            Err(Error::Config(_))
        ));

        // Off-manifold starts are retracted
        let s = session(&identity_config(5))
            .with_initial_point(&(x_rotation(0.5) * Complex64::new(3.0, 0.0)))
            .unwrap();
        assert!(s.manifold().is_in_manifold(&s.estimate().unwrap(), 1e-10));
    }

    #[test]
    fn test_full_rank_budget_runs() {
        let config = TomographyConfig {
            num_qubits: 1,
            kraus_rank: 4,
            num_samples: 2_000,
            num_iterations: 30,
            seed: 11,
            ..Default::default()
        };
        let mut s = session(&config);
        assert_eq!(s.params().dim(), (4, 4, 2));

        let result = s.run().unwrap();
        assert_eq!(result.estimate.dim(), (4, 4));
        assert!(result.loss_history.iter().all(|l| l.is_finite()));
        assert!(result.loss_history[29] < result.loss_history[0]);
        assert!(s.manifold().is_in_manifold(&result.estimate, 1e-8));
    }

    #[test]
    fn test_target_distance_stops_early() {
        let config = TomographyConfig {
            target_distance: Some(0.2),
            ..identity_config(400)
        };
        let mut s = session(&config);
        let result = s.run().unwrap();

        assert!(result.converged());
        assert!(result.iterations < 400);
        assert!(result.final_distance().unwrap() < 0.2);
        assert!(s.step().is_err());
    }

    #[test]
    fn test_distance_tracking_can_be_disabled() {
        let config = TomographyConfig {
            track_distance: false,
            ..identity_config(3)
        };
        let mut s = session(&config);
        let record = s.step().unwrap();
        assert_eq!(record.iteration, 1);
        assert!(record.distance.is_none());
        assert_eq!(s.state(), SessionState::Iterating);

        let result = s.run().unwrap();
        assert!(result.distance_history.is_empty());
        assert_eq!(result.loss_history.len(), 3);
    }

    #[test]
    fn test_resume_from_checkpoint_continues_trajectory() {
        let full = {
            let mut s = session(&identity_config(10));
            s.run().unwrap()
        };

        let mut first = session(&identity_config(5));
        first.run().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        first.checkpoint().save(&path).unwrap();

        let checkpoint = Checkpoint::load(&path).unwrap();
        let mut resumed =
            TomographySession::from_checkpoint(&identity_config(10), &OptimizerConfig::default(), checkpoint)
                .unwrap();
        assert_eq!(resumed.state(), SessionState::Iterating);
        assert_eq!(resumed.iteration(), 5);

        let result = resumed.run().unwrap();
        assert_eq!(result.iterations, 10);
        assert_eq!(result.loss_history.len(), 10);
        for (a, b) in result.estimate.iter().zip(full.estimate.iter()) {
            assert!((a - b).norm() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_resume_rejects_other_optimizer() {
        let s = session(&identity_config(2));
        let rsgd = OptimizerConfig {
            kind: OptimizerKind::RSgd,
            ..Default::default()
        };
        let err = TomographySession::from_checkpoint(&identity_config(2), &rsgd, s.checkpoint());
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_rsgd_session_decreases_loss() {
        let config = TomographyConfig {
            num_samples: 500,
            ground_truth: GroundTruthKind::Random,
            noiseless: false,
            ..identity_config(50)
        };
        let optimizer = OptimizerConfig {
            kind: OptimizerKind::RSgd,
            learning_rate: 0.05,
            momentum: 0.9,
            ..Default::default()
        };
        let mut s =
            TomographySession::from_config(&config, &optimizer, &ValidationConfig::default()).unwrap();
        let result = s.run().unwrap();
        assert!(result.loss_history[49] < result.loss_history[0]);
    }

    #[test]
    fn test_dataset_for_other_qubit_count_rejected() {
        let config = identity_config(5);
        let s = session(&config);
        let two_qubits = TomographyConfig {
            num_qubits: 2,
            ..config
        };
        let mut rng = StdRng::seed_from_u64(3);
        let result = TomographySession::new(
            &two_qubits,
            &OptimizerConfig::default(),
            s.dataset().clone(),
            None,
            &mut rng,
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
