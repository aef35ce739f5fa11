// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Riemannian Adam with a scalar second moment.
//!
//! The second moment is the squared norm of the whole Riemannian gradient,
//! which keeps the update direction horizontal (an element-wise rescaling
//! would not commute with the projection).

use ndarray::Array2;
use num_complex::Complex64;

use super::{check_step_shapes, OptimizerConfig, OptimizerKind, OptimizerState, RiemannianOptimizer};
use crate::error::Result;
use crate::linalg::frobenius_norm_sqr;
use crate::manifold::Manifold;

/// Riemannian Adam (optionally AMSGrad).
#[derive(Debug, Clone)]
pub struct RAdam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    amsgrad: bool,
    m: Option<Array2<Complex64>>,
    v: f64,
    v_max: f64,
    t: u64,
}

impl RAdam {
    /// RAdam with default betas and epsilon.
    pub fn new(learning_rate: f64) -> Self {
        Self::from_config(&OptimizerConfig {
            learning_rate,
            ..OptimizerConfig::default()
        })
    }

    /// Hyperparameters are taken as given; validate the config beforehand.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            amsgrad: config.amsgrad,
            m: None,
            v: 0.0,
            v_max: 0.0,
            t: 0,
        }
    }

    pub fn with_amsgrad(mut self, amsgrad: bool) -> Self {
        self.amsgrad = amsgrad;
        self
    }

    /// Completed steps.
    pub fn iterations(&self) -> u64 {
        self.t
    }
}

impl RiemannianOptimizer for RAdam {
    fn kind(&self) -> OptimizerKind {
        OptimizerKind::RAdam
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn step(
        &mut self,
        manifold: &dyn Manifold,
        point: &mut Array2<Complex64>,
        egrad: &Array2<Complex64>,
    ) -> Result<()> {
        check_step_shapes(point, egrad, self.m.as_ref())?;

        let t = self.t + 1;
        let rgrad = manifold.egrad_to_rgrad(point, egrad)?;

        let m = match &self.m {
            Some(m) => m * self.beta1 + &rgrad * (1.0 - self.beta1),
            None => &rgrad * (1.0 - self.beta1),
        };
        let v = self.beta2 * self.v + (1.0 - self.beta2) * frobenius_norm_sqr(&rgrad);
        let v_max = self.v_max.max(v);
        let v_used = if self.amsgrad { v_max } else { v };

        let m_correction = 1.0 - self.beta1.powf(t as f64);
        let v_hat = v_used / (1.0 - self.beta2.powf(t as f64));
        let scale = -self.learning_rate / (m_correction * (v_hat.sqrt() + self.epsilon));

        let step = manifold.proj(point, &(&m * scale))?;
        let (next, m) = manifold.retraction_transport(point, &m, &step)?;

        *point = next;
        self.m = Some(m);
        self.v = v;
        self.v_max = v_max;
        self.t = t;
        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState {
            m: self.m.clone(),
            v: self.v,
            v_max: self.v_max,
            t: self.t,
        }
    }

    fn load_state(&mut self, state: OptimizerState) -> Result<()> {
        state.validate()?;
        self.m = state.m;
        self.v = state.v;
        self.v_max = state.v_max;
        self.t = state.t;
        Ok(())
    }
}
