//! The network seam used by the training loop.
//!
//! The fitter never needs to know the architecture it trains. Anything that can run a
//! batched forward pass, backpropagate an output gradient, and expose its learnable
//! parameters as one flat buffer implements [`Regressor`].
//!
//! Parameter and gradient buffers share one layout, chosen by the implementor. That is
//! what lets the optimizer and the best-state snapshot stay architecture-agnostic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Compute target for the dense kernels.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Portable reference kernels.
    #[default]
    Cpu,
    /// Packed, vectorized GEMM (requires the `matrixmultiply` feature).
    Simd,
}

impl Device {
    /// Whether this backend was compiled in.
    pub fn is_available(self) -> bool {
        match self {
            Device::Cpu => true,
            Device::Simd => cfg!(feature = "matrixmultiply"),
        }
    }

    /// The fastest backend compiled into this build.
    pub fn best_available() -> Self {
        if Device::Simd.is_available() {
            Device::Simd
        } else {
            Device::Cpu
        }
    }

    /// Returns `self` if available, otherwise falls back to [`Device::Cpu`].
    pub fn resolve(self) -> Self {
        if self.is_available() {
            self
        } else {
            tracing::warn!(requested = ?self, "device not compiled in; falling back to cpu");
            Device::Cpu
        }
    }
}

/// A deep copy of a network's learnable parameters.
///
/// Snapshots are decoupled from the network they were taken from: later optimizer steps
/// do not affect them.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkState {
    parameters: Vec<f32>,
}

impl NetworkState {
    pub fn new(parameters: Vec<f32>) -> Self {
        Self { parameters }
    }

    #[inline]
    pub fn parameters(&self) -> &[f32] {
        &self.parameters
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Overwrite the snapshot in place.
    pub(crate) fn copy_from(&mut self, parameters: &[f32]) {
        self.parameters.clear();
        self.parameters.extend_from_slice(parameters);
    }
}

/// A trainable regression network.
///
/// Batched buffers are flat and row-major:
/// - inputs: `(batch_size, input_dim)`
/// - outputs and output gradients: `(batch_size, output_dim)`
/// - gradients: same length and layout as [`Regressor::parameters`]
pub trait Regressor {
    /// Reusable forward/backward buffers, bound to a compute device.
    type Workspace;

    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    /// All learnable parameters as one flat buffer.
    fn parameters(&self) -> &[f32];

    fn parameters_mut(&mut self) -> &mut [f32];

    /// Number of trainable scalars.
    fn num_parameters(&self) -> usize {
        self.parameters().len()
    }

    /// Switch between training and evaluation behaviour.
    ///
    /// Networks without mode-dependent layers can ignore this.
    fn set_training(&mut self, _training: bool) {}

    /// Allocate buffers for batches of up to `batch_size` samples.
    fn workspace(&self, batch_size: usize, device: Device) -> Self::Workspace;

    /// Forward pass for `batch_size` samples.
    ///
    /// Returns the outputs, which live inside `ws` until the next forward pass.
    fn forward_batch<'w>(
        &self,
        inputs: &[f32],
        batch_size: usize,
        ws: &'w mut Self::Workspace,
    ) -> &'w [f32];

    /// Backward pass for the batch most recently passed to `forward_batch` with `ws`.
    ///
    /// `grads` is overwritten with dL/d(parameters).
    fn backward_batch(
        &self,
        inputs: &[f32],
        batch_size: usize,
        ws: &mut Self::Workspace,
        d_output: &[f32],
        grads: &mut [f32],
    );

    /// Deep copy of the current parameters.
    fn state(&self) -> NetworkState {
        NetworkState::new(self.parameters().to_vec())
    }

    /// Overwrite `state` with the current parameters, reusing its buffer.
    fn store_state(&self, state: &mut NetworkState) {
        state.copy_from(self.parameters());
    }

    /// Overwrite the parameters with a snapshot.
    fn load_state(&mut self, state: &NetworkState) -> Result<()> {
        let params = self.parameters_mut();
        if params.len() != state.len() {
            return Err(Error::InvalidShape(format!(
                "state has {} parameters, network has {}",
                state.len(),
                params.len()
            )));
        }
        params.copy_from_slice(state.parameters());
        Ok(())
    }
}
