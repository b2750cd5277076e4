//! Early-stopping regression fitting for small surrogate networks.
//!
//! `surrogate-mlp` trains a feed-forward network to predict a scalar or vector target from
//! a parameter vector, e.g. to regress or classify the quality of simulation outcomes from
//! the parameters that produced them.
//!
//! A fit:
//!
//! 1. keeps the first `num_train` samples and splits them at random into a training and a
//!    validation part,
//! 2. runs Adam on mean-squared-error over shuffled training minibatches, one epoch at a
//!    time,
//! 3. evaluates the validation loss after every epoch, remembering the parameters with the
//!    lowest one,
//! 4. stops once the validation loss has not improved for `stop_after_epochs` epochs or
//!    after `max_epochs + 1` epochs, and hands back the network holding its best
//!    parameters.
//!
//! # The network seam
//!
//! The training loop is generic over [`Regressor`]: any network that can run a batched
//! forward pass, backpropagate an output gradient and expose its parameters as one flat
//! buffer can be fitted. [`Mlp`] (built with [`MlpBuilder`]) is the implementation that
//! ships with the crate.
//!
//! # Panics vs `Result`
//!
//! - Low-level hot path (panics on misuse): [`Regressor::forward_batch`],
//!   [`Regressor::backward_batch`], [`loss::mse_backward`], [`AdamState::step`].
//!   Shape mismatches there are programmer error.
//! - High-level APIs validate their inputs and return [`Result`]: [`fit_regression_net`],
//!   [`data_loaders`], [`SampleSet`] constructors, [`Mlp::predict`].
//!
//! # Logging
//!
//! Progress is reported through `tracing` (parameter count, per-epoch losses, stop
//! reason). Install any subscriber to see it.
//!
//! # Quick start
//!
//! ```rust
//! use surrogate_mlp::{Activation, FitConfig, MlpBuilder, SampleSet, fit_regression_net};
//!
//! # fn main() -> surrogate_mlp::Result<()> {
//! // y = 2 * x0 - x1
//! let mut xs = Vec::new();
//! let mut ys = Vec::new();
//! for i in 0..200 {
//!     let x0 = (i % 20) as f32 / 20.0;
//!     let x1 = (i / 20) as f32 / 10.0;
//!     xs.extend_from_slice(&[x0, x1]);
//!     ys.push(2.0 * x0 - x1);
//! }
//! let samples = SampleSet::with_scalar_targets(xs, ys, 2)?;
//!
//! let net = MlpBuilder::new(2)?
//!     .add_layer(16, Activation::Tanh)?
//!     .add_layer(1, Activation::Identity)?
//!     .build_with_seed(0)?;
//!
//! let cfg = FitConfig::default()
//!     .with_batch_size(20)
//!     .with_learning_rate(1e-2)
//!     .with_max_epochs(20)
//!     .with_seed(0);
//! let outcome = fit_regression_net(net, &samples, &cfg)?;
//! assert!(outcome.report.epochs <= 21);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod data;
pub mod early_stop;
pub mod error;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod mlp;
pub mod network;
pub mod optim;
pub mod split;
pub mod train;

#[cfg(feature = "serde")]
pub mod checkpoint;

pub use activation::Activation;
pub use builder::MlpBuilder;
pub use data::SampleSet;
pub use early_stop::{EarlyStopping, Observation, StopReason};
pub use error::{Error, Result};
pub use layer::{Init, Layer};
pub use mlp::{Mlp, MlpWorkspace};
pub use network::{Device, NetworkState, Regressor};
pub use optim::{Adam, AdamState};
pub use split::{Batch, BatchLoader, Batches, DataLoaders, LoaderConfig, Order, Split, data_loaders};
pub use train::{
    EpochReport, FitConfig, FitOutcome, FitReport, fit_regression_net,
    fit_regression_net_with_rng, validation_loss,
};
