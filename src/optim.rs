//! Adam optimizer over a flat parameter buffer.
//!
//! Optimizer *state* (the moment estimates) lives outside the network. The training loop
//! owns it and reuses it across steps, so a step performs no allocation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Adam hyperparameters (bias-corrected).
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
}

impl Default for Adam {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

impl Adam {
    pub fn validate(self) -> Result<()> {
        if !(self.beta1.is_finite() && (0.0..1.0).contains(&self.beta1)) {
            return Err(Error::InvalidConfig(format!(
                "adam beta1 must be finite and in [0,1), got {}",
                self.beta1
            )));
        }
        if !(self.beta2.is_finite() && (0.0..1.0).contains(&self.beta2)) {
            return Err(Error::InvalidConfig(format!(
                "adam beta2 must be finite and in [0,1), got {}",
                self.beta2
            )));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "adam eps must be finite and > 0, got {}",
                self.eps
            )));
        }
        Ok(())
    }

    /// Allocate zeroed moment estimates for `num_parameters` scalars.
    pub fn state(self, num_parameters: usize) -> Result<AdamState> {
        self.validate()?;
        Ok(AdamState {
            hyper: self,
            t: 0,
            beta1_pow: 1.0,
            beta2_pow: 1.0,
            m: vec![0.0; num_parameters],
            v: vec![0.0; num_parameters],
        })
    }
}

#[derive(Debug, Clone)]
/// Owned Adam state.
pub struct AdamState {
    hyper: Adam,
    t: u64,
    beta1_pow: f32,
    beta2_pow: f32,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl AdamState {
    /// Number of steps taken.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Apply one update: `param -= lr * m_hat / (sqrt(v_hat) + eps)`.
    pub fn step(&mut self, params: &mut [f32], grads: &[f32], lr: f32) {
        assert!(lr.is_finite() && lr > 0.0, "lr must be finite and > 0");
        assert_eq!(
            params.len(),
            self.m.len(),
            "params len {} does not match optimizer state len {}",
            params.len(),
            self.m.len()
        );
        assert_eq!(
            grads.len(),
            params.len(),
            "grads len {} does not match params len {}",
            grads.len(),
            params.len()
        );

        let Adam { beta1, beta2, eps } = self.hyper;
        self.t += 1;
        self.beta1_pow *= beta1;
        self.beta2_pow *= beta2;

        let corr1 = 1.0 - self.beta1_pow;
        let corr2 = 1.0 - self.beta2_pow;

        for (((p, &g), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * (g * g);

            let m_hat = *m / corr1;
            let v_hat = *v / corr2;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_bad_hyperparams() {
        let base = Adam::default();
        assert!(base.validate().is_ok());
        assert!(Adam { beta1: 1.0, ..base }.validate().is_err());
        assert!(Adam { beta2: 1.0, ..base }.validate().is_err());
        assert!(Adam { eps: 0.0, ..base }.validate().is_err());
        assert!(Adam { beta1: f32::NAN, ..base }.validate().is_err());
    }

    #[test]
    fn first_step_matches_expected_direction_for_unit_grad() {
        let mut params = [1.0_f32, 1.0];
        let grads = [1.0_f32, -1.0];
        let mut opt = Adam {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1.0,
        }
        .state(2)
        .unwrap();
        opt.step(&mut params, &grads, 0.1);

        // With eps=1.0 and unit grad, the first bias-corrected update is 1/(1+eps) = 0.5.
        assert!((params[0] - (1.0 - 0.1 * 0.5)).abs() < 1e-6);
        assert!((params[1] - (1.0 + 0.1 * 0.5)).abs() < 1e-6);
        assert_eq!(opt.steps(), 1);
    }

    #[test]
    fn minimizes_a_quadratic() {
        // f(x) = (x - 3)^2
        let mut x = [0.0_f32];
        let mut opt = Adam::default().state(1).unwrap();
        for _ in 0..2_000 {
            let g = [2.0 * (x[0] - 3.0)];
            opt.step(&mut x, &g, 0.05);
        }
        assert!((x[0] - 3.0).abs() < 1e-2, "x = {}", x[0]);
    }
}
