// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! First-order Riemannian optimizers.
//!
//! Each optimizer owns the state bound to one manifold point and advances
//! it given a Euclidean gradient: project to a Riemannian gradient, update
//! the moment estimates, retract, transport the momentum.
//!
//! # References
//!
//! - Bécigneul, G. & Ganea, O.-E. (2019). "Riemannian Adaptive Optimization
//!   Methods." ICLR. arXiv:1810.00760
//! - Kingma, D. P. & Ba, J. (2015). "Adam: A Method for Stochastic
//!   Optimization." ICLR. arXiv:1412.6980
//! - Reddi, S. J., Kale, S. & Kumar, S. (2018). "On the Convergence of Adam
//!   and Beyond." ICLR. (AMSGrad)

pub mod adam;
pub mod sgd;

pub use adam::RAdam;
pub use sgd::RSgd;

use ndarray::{Array2, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ShapeError};
use crate::manifold::{complex_to_real, real_to_complex, Manifold};

/// Which optimizer a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Riemannian Adam
    #[default]
    RAdam,
    /// Riemannian SGD with optional (Nesterov) momentum
    RSgd,
}

impl std::fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizerKind::RAdam => write!(f, "radam"),
            OptimizerKind::RSgd => write!(f, "rsgd"),
        }
    }
}

/// Optimizer hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub kind: OptimizerKind,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// First-moment decay (RAdam).
    #[serde(default = "default_beta1")]
    pub beta1: f64,

    /// Second-moment decay (RAdam).
    #[serde(default = "default_beta2")]
    pub beta2: f64,

    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Use the running maximum of the second moment (AMSGrad).
    #[serde(default)]
    pub amsgrad: bool,

    /// Momentum coefficient in [0, 1] (RSGD).
    #[serde(default)]
    pub momentum: f64,

    /// Nesterov look-ahead (RSGD, requires momentum > 0 to matter).
    #[serde(default)]
    pub nesterov: bool,
}

fn default_learning_rate() -> f64 {
    0.07
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_epsilon() -> f64 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            kind: OptimizerKind::default(),
            learning_rate: default_learning_rate(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
            amsgrad: false,
            momentum: 0.0,
            nesterov: false,
        }
    }
}

impl OptimizerConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err("learning_rate must be > 0".into());
        }
        if !(0.0..1.0).contains(&self.beta1) {
            return Err("beta1 must be in [0, 1)".into());
        }
        if !(0.0..1.0).contains(&self.beta2) {
            return Err("beta2 must be in [0, 1)".into());
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err("epsilon must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.momentum) {
            return Err("momentum must be in [0, 1]".into());
        }
        Ok(())
    }

    /// Build the configured optimizer.
    pub fn build(&self) -> Result<Box<dyn RiemannianOptimizer>> {
        self.validate().map_err(Error::Config)?;
        Ok(match self.kind {
            OptimizerKind::RAdam => Box::new(RAdam::from_config(self)),
            OptimizerKind::RSgd => Box::new(RSgd::from_config(self)),
        })
    }
}

/// Serializable optimizer state.
///
/// `m` is the (transported) first moment; `v`/`v_max` are only used by
/// RAdam. `t` counts completed steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub m: Option<Array2<Complex64>>,
    pub v: f64,
    pub v_max: f64,
    pub t: u64,
}

impl OptimizerState {
    fn validate(&self) -> Result<()> {
        let valid = |x: f64| x.is_finite() && x >= 0.0;
        if !valid(self.v) || !valid(self.v_max) {
            return Err(Error::Config(format!(
                "optimizer state has invalid second moment v={}, v_max={}",
                self.v, self.v_max
            )));
        }
        Ok(())
    }
}

/// A stateful first-order optimizer on a Riemannian manifold.
pub trait RiemannianOptimizer: Send {
    fn kind(&self) -> OptimizerKind;

    fn learning_rate(&self) -> f64;

    /// Advance `point` in place given the Euclidean gradient at it.
    fn step(
        &mut self,
        manifold: &dyn Manifold,
        point: &mut Array2<Complex64>,
        egrad: &Array2<Complex64>,
    ) -> Result<()>;

    /// Snapshot of the internal state.
    fn state(&self) -> OptimizerState;

    /// Restore a snapshot taken with [`RiemannianOptimizer::state`].
    fn load_state(&mut self, state: OptimizerState) -> Result<()>;

    /// Step on the real `(n, k, 2)` encoding: decode, step, re-encode in
    /// place.
    fn apply_gradients(
        &mut self,
        manifold: &dyn Manifold,
        params: &mut Array3<f64>,
        grad: &Array3<f64>,
    ) -> Result<()> {
        if params.dim() != grad.dim() {
            let (a, b, c) = params.dim();
            let (x, y, z) = grad.dim();
            return Err(ShapeError::mismatch("gradient", &[a, b, c], &[x, y, z]).into());
        }
        let mut point = real_to_complex(params)?;
        let egrad = real_to_complex(grad)?;
        self.step(manifold, &mut point, &egrad)?;
        *params = complex_to_real(&point);
        Ok(())
    }
}

/// Reject gradients whose shape differs from the point or from the momentum
/// the optimizer is carrying.
fn check_step_shapes(
    point: &Array2<Complex64>,
    egrad: &Array2<Complex64>,
    m: Option<&Array2<Complex64>>,
) -> Result<()> {
    let (rows, cols) = point.dim();
    if egrad.dim() != point.dim() {
        let (r, c) = egrad.dim();
        return Err(ShapeError::mismatch("gradient", &[rows, cols], &[r, c]).into());
    }
    if let Some(m) = m {
        if m.dim() != point.dim() {
            let (r, c) = m.dim();
            return Err(ShapeError::mismatch("optimizer momentum", &[rows, cols], &[r, c]).into());
        }
    }
    Ok(())
}
