//! Activation functions.
//!
//! A dense layer computes `z = W x + b` and then `y = activation(z)` element-wise.
//!
//! Only the post-activation outputs `y` are cached in the workspace. Backprop recovers
//! `dL/dz` from `dL/dy` and `y`, so no separate `z` buffer is needed.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Element-wise activation function.
pub enum Activation {
    Tanh,
    #[cfg_attr(feature = "serde", serde(rename = "relu"))]
    ReLU,
    #[cfg_attr(feature = "serde", serde(rename = "leaky_relu"))]
    LeakyReLU { alpha: f32 },
    Sigmoid,
    Identity,
}

impl Activation {
    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        if let Activation::LeakyReLU { alpha } = self {
            if !(alpha.is_finite() && alpha >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "leaky ReLU alpha must be finite and >= 0, got {alpha}"
                )));
            }
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn forward(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Sigmoid => sigmoid(x),
            Activation::Identity => x,
        }
    }

    /// Derivative with respect to the pre-activation, in terms of the output `y`.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f32) -> f32 {
        match self {
            Activation::Tanh => 1.0 - y * y,
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if y > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Identity => 1.0,
        }
    }

    /// Apply in place over a whole batch of pre-activations.
    #[inline]
    pub(crate) fn apply(self, zs: &mut [f32]) {
        if self == Activation::Identity {
            return;
        }
        for z in zs {
            *z = self.forward(*z);
        }
    }

    /// Turn `dL/dy` into `dL/dz` in place, given the cached outputs `ys`.
    #[inline]
    pub(crate) fn backprop(self, ys: &[f32], d_ys: &mut [f32]) {
        debug_assert_eq!(ys.len(), d_ys.len());
        if self == Activation::Identity {
            return;
        }
        for (d, &y) in d_ys.iter_mut().zip(ys) {
            *d *= self.grad_from_output(y);
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
