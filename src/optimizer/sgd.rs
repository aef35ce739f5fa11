// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Riemannian stochastic gradient descent with optional momentum.

use ndarray::Array2;
use num_complex::Complex64;

use super::{check_step_shapes, OptimizerConfig, OptimizerKind, OptimizerState, RiemannianOptimizer};
use crate::error::Result;
use crate::manifold::Manifold;

/// Riemannian SGD.
///
/// With momentum `β > 0` the first moment follows `m ← β·m + (1−β)·G_h`
/// and is transported along each step. Nesterov look-ahead steps along
/// `β·m + (1−β)·G_h` instead of `m`.
#[derive(Debug, Clone)]
pub struct RSgd {
    learning_rate: f64,
    momentum: f64,
    nesterov: bool,
    m: Option<Array2<Complex64>>,
    t: u64,
}

impl RSgd {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            momentum: 0.0,
            nesterov: false,
            m: None,
            t: 0,
        }
    }

    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            momentum: config.momentum,
            nesterov: config.nesterov,
            m: None,
            t: 0,
        }
    }

    pub fn with_momentum(mut self, momentum: f64, nesterov: bool) -> Self {
        self.momentum = momentum;
        self.nesterov = nesterov;
        self
    }
}

impl RiemannianOptimizer for RSgd {
    fn kind(&self) -> OptimizerKind {
        OptimizerKind::RSgd
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
        let rgrad = manifold.egrad_to_rgrad(point, egrad)?;

        if self.momentum == 0.0 {
            let step = &rgrad * -self.learning_rate;
            *point = manifold.retraction(point, &step)?;
            self.t += 1;
            return Ok(());
        }

        let beta = self.momentum;
        let m = match &self.m {
            Some(m) => m * beta + &rgrad * (1.0 - beta),
            None => &rgrad * (1.0 - beta),
        };
        let direction = if self.nesterov {
            &m * beta + &rgrad * (1.0 - beta)
        } else {
            m.clone()
        };
        let step = manifold.proj(point, &(direction * -self.learning_rate))?;
        let (next, m) = manifold.retraction_transport(point, &m, &step)?;

        *point = next;
        self.m = Some(m);
        self.t += 1;
        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState {
            m: self.m.clone(),
            t: self.t,
            ..OptimizerState::default()
        }
    }

    fn load_state(&mut self, state: OptimizerState) -> Result<()> {
        state.validate()?;
        self.m = state.m;
        self.t = state.t;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{frobenius_norm_sqr, max_abs_diff};
    use crate::manifold::ChoiMatrix;
    use crate::test_utils::{random_complex, seeded_rng};

    fn toy(a: &Array2<Complex64>, b: &Array2<Complex64>) -> (f64, Array2<Complex64>) {
        let diff = a - b;
        (frobenius_norm_sqr(&diff), diff * 2.0)
    }

    #[test]
    fn test_plain_step_is_negative_horizontal_gradient() {
        let manifold = ChoiMatrix::new();
        let mut rng = seeded_rng(41);
        let a0 = manifold.random(4, 2, &mut rng).unwrap();
        let g = random_complex(&mut rng, 4, 2);

        let mut a = a0.clone();
        RSgd::new(0.1).step(&manifold, &mut a, &g).unwrap();

        let expected = &a0 - &(manifold.proj(&a0, &g).unwrap() * 0.1);
        assert!(max_abs_diff(&a, &expected) < 1e-12);
    }

    #[test]
    fn test_each_variant_reduces_convex_toy() {
        let variants = [
            RSgd::new(0.05),
            RSgd::new(0.05).with_momentum(0.9, false),
            RSgd::new(0.05).with_momentum(0.9, true),
        ];
        for mut opt in variants {
            let manifold = ChoiMatrix::new();
            let mut rng = seeded_rng(42);
            let b = manifold.random(4, 1, &mut rng).unwrap();
            let mut a = manifold.random(4, 1, &mut rng).unwrap();

            let (start, _) = toy(&a, &b);
            for _ in 0..200 {
                let (_, g) = toy(&a, &b);
                opt.step(&manifold, &mut a, &g).unwrap();
            }
            let (end, _) = toy(&a, &b);
            assert!(end < start, "{:?}: {} !< {}", opt, end, start);
            assert_eq!(opt.state().t, 200);
        }
    }

    #[test]
    fn test_momentum_is_carried_in_state() {
        let manifold = ChoiMatrix::trace_preserving();
        let mut rng = seeded_rng(43);
        let mut a = manifold.random(4, 2, &mut rng).unwrap();
        let g = random_complex(&mut rng, 4, 2);

        let mut opt = RSgd::new(0.01).with_momentum(0.5, true);
        opt.step(&manifold, &mut a, &g).unwrap();
        let state = opt.state();
        assert!(state.m.is_some());
        assert_eq!(state.v, 0.0);
        assert!(manifold.is_in_manifold(&a, 1e-8));

        // Without momentum nothing is carried
        let mut plain = RSgd::new(0.01);
        plain.step(&manifold, &mut a, &g).unwrap();
        assert!(plain.state().m.is_none());
    }
}
