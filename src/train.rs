//! Early-stopping fit of a regression network.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::early_stop::{EarlyStopping, StopReason};
use crate::network::Regressor;
use crate::split::{Batch, BatchLoader, DataLoaders, LoaderConfig, Split, data_loaders};
use crate::{Adam, Device, Error, Result, SampleSet, loss};

// Upper bound on the epoch history reserved up front.
const MAX_RESERVED_EPOCHS: usize = 4096;

/// Hyperparameters of [`fit_regression_net`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Number of leading samples to use; `None` uses every sample.
    pub num_train: Option<usize>,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Fraction of the used samples held out for validation, in `[0, 1)`.
    pub validation_fraction: f64,
    /// Consecutive epochs without validation improvement before stopping.
    pub stop_after_epochs: usize,
    pub max_epochs: usize,
    /// Seed for the split and the per-epoch shuffles; `None` draws from entropy.
    pub seed: Option<u64>,
    pub device: Device,
    pub adam: Adam,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            num_train: None,
            batch_size: 100,
            learning_rate: 1e-4,
            validation_fraction: 0.1,
            stop_after_epochs: 20,
            max_epochs: 1000,
            seed: None,
            device: Device::Cpu,
            adam: Adam::default(),
        }
    }
}

impl FitConfig {
    pub fn with_num_train(mut self, num_train: usize) -> Self {
        self.num_train = Some(num_train);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_validation_fraction(mut self, validation_fraction: f64) -> Self {
        self.validation_fraction = validation_fraction;
        self
    }

    pub fn with_stop_after_epochs(mut self, stop_after_epochs: usize) -> Self {
        self.stop_after_epochs = stop_after_epochs;
        self
    }

    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// The splitter's share of this config.
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            num_train: self.num_train,
            batch_size: self.batch_size,
            validation_fraction: self.validation_fraction,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.loader_config().validate()?;
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        self.adam.validate()
    }
}

/// Losses of one epoch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based.
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: f64,
    pub improved: bool,
}

/// Summary of a finished fit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub epochs: usize,
    /// 0 when no epoch produced a finite validation loss.
    pub best_epoch: usize,
    pub best_validation_loss: f64,
    pub stop_reason: StopReason,
    pub num_parameters: usize,
    pub num_training_examples: usize,
    pub num_validation_examples: usize,
    pub history: Vec<EpochReport>,
}

/// A fitted network together with how it got there.
#[derive(Debug, Clone)]
pub struct FitOutcome<R> {
    /// The network holding its best-validation parameters.
    pub network: R,
    pub report: FitReport,
    /// Indices into the truncated sample set.
    pub split: Split,
}

/// Fit `network` with early stopping on a held-out validation split.
///
/// The RNG for the split and the per-epoch shuffles is seeded from `cfg.seed`, or from
/// entropy when unset.
pub fn fit_regression_net<R: Regressor>(
    network: R,
    data: &SampleSet,
    cfg: &FitConfig,
) -> Result<FitOutcome<R>> {
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    fit_regression_net_with_rng(network, data, cfg, &mut rng)
}

/// Like [`fit_regression_net`], drawing all randomness from `rng`.
pub fn fit_regression_net_with_rng<R: Regressor, G: Rng + ?Sized>(
    mut network: R,
    data: &SampleSet,
    cfg: &FitConfig,
    rng: &mut G,
) -> Result<FitOutcome<R>> {
    cfg.validate()?;
    if data.input_dim() != network.input_dim() {
        return Err(Error::InvalidShape(format!(
            "sample input_dim {} does not match network input_dim {}",
            data.input_dim(),
            network.input_dim()
        )));
    }
    if data.target_dim() != network.output_dim() {
        return Err(Error::InvalidShape(format!(
            "sample target_dim {} does not match network output_dim {}",
            data.target_dim(),
            network.output_dim()
        )));
    }

    let mut loaders = data_loaders(data, &cfg.loader_config(), rng)?;
    let num_validation_examples = loaders.num_validation_examples();
    let num_training_examples = loaders.num_training_examples();

    let num_parameters = network.num_parameters();
    let mut optimizer = cfg.adam.state(num_parameters)?;
    tracing::info!(num_parameters, "total number of trainable parameters");

    // Everything the epochs touch is allocated here and reused.
    let device = cfg.device.resolve();
    let train_bs = loaders.train.batch_size();
    let val_bs = loaders.validation.batch_size();
    let mut train_ws = network.workspace(train_bs, device);
    let mut val_ws = network.workspace(val_bs, device);
    let mut train_batch = Batch::with_capacity(&loaders.data, train_bs);
    let mut val_batch = Batch::with_capacity(&loaders.data, val_bs);
    let mut grads = vec![0.0_f32; num_parameters];
    let mut d_output = vec![0.0_f32; train_bs * network.output_dim()];

    let mut tracker = EarlyStopping::new(cfg.stop_after_epochs, cfg.max_epochs);
    let mut best_state = network.state();
    let mut history =
        Vec::with_capacity(cfg.max_epochs.saturating_add(1).min(MAX_RESERVED_EPOCHS));

    let stop_reason = loop {
        // Training pass.
        network.set_training(true);
        loaders.train.shuffle(rng);
        let mut total_train_loss = 0.0_f64;
        for rows in loaders.train.batches() {
            train_batch.fill(&loaders.data, rows);
            let out = network.forward_batch(&train_batch.inputs, train_batch.len, &mut train_ws);
            d_output.resize(out.len(), 0.0);
            let loss = loss::mse_backward(out, &train_batch.targets, &mut d_output);
            total_train_loss += f64::from(loss);

            network.backward_batch(
                &train_batch.inputs,
                train_batch.len,
                &mut train_ws,
                &d_output,
                &mut grads,
            );
            optimizer.step(network.parameters_mut(), &grads, cfg.learning_rate);
        }
        // Sum of per-batch means over the example count (not a per-example mean).
        total_train_loss /= num_training_examples as f64;

        // Validation pass.
        network.set_training(false);
        let validation_loss = batch_loss_sum(
            &network,
            &loaders.validation,
            &loaders.data,
            &mut val_ws,
            &mut val_batch,
        ) / num_validation_examples as f64;
        if !validation_loss.is_finite() {
            tracing::warn!(validation_loss, "non-finite validation loss");
        }

        let obs = tracker.observe(validation_loss);
        tracing::info!(
            epoch = tracker.epochs(),
            train_loss = total_train_loss,
            validation_loss,
            improved = obs.improved,
            "epoch finished"
        );
        history.push(EpochReport {
            epoch: tracker.epochs(),
            train_loss: total_train_loss,
            validation_loss,
            improved: obs.improved,
        });

        if obs.improved {
            tracing::debug!(epoch = tracker.epochs(), validation_loss, "new best validation loss");
            network.store_state(&mut best_state);
        }

        if let Some(reason) = obs.stop {
            break reason;
        }
    };

    network.load_state(&best_state)?;
    tracing::info!(
        epochs = tracker.epochs(),
        best_epoch = tracker.best_epoch(),
        best_validation_loss = tracker.best_loss(),
        ?stop_reason,
        "training stopped"
    );

    let split = loaders.split();
    Ok(FitOutcome {
        network,
        report: FitReport {
            epochs: tracker.epochs(),
            best_epoch: tracker.best_epoch(),
            best_validation_loss: tracker.best_loss(),
            stop_reason,
            num_parameters,
            num_training_examples,
            num_validation_examples,
            history,
        },
        split,
    })
}

/// Validation loss as the training loop computes it.
///
/// Sum of per-batch MSE over the validation loader, divided by its example count.
/// `ws` must come from `network.workspace(loaders.validation.batch_size(), ..)`.
pub fn validation_loss<R: Regressor>(
    network: &R,
    loaders: &DataLoaders,
    ws: &mut R::Workspace,
) -> f64 {
    let mut batch = Batch::with_capacity(&loaders.data, loaders.validation.batch_size());
    batch_loss_sum(network, &loaders.validation, &loaders.data, ws, &mut batch)
        / loaders.num_validation_examples() as f64
}

fn batch_loss_sum<R: Regressor>(
    network: &R,
    loader: &BatchLoader,
    data: &SampleSet,
    ws: &mut R::Workspace,
    batch: &mut Batch,
) -> f64 {
    let mut total = 0.0_f64;
    for rows in loader.batches() {
        batch.fill(data, rows);
        let out = network.forward_batch(&batch.inputs, batch.len, ws);
        total += f64::from(loss::mse(out, &batch.targets));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, Mlp, MlpBuilder};

    fn linear_data(n: usize) -> SampleSet {
        let mut inputs = Vec::with_capacity(2 * n);
        let mut targets = Vec::with_capacity(n);
        for i in 0..n {
            let x0 = (i as f32 / n as f32) * 2.0 - 1.0;
            let x1 = ((i * 7) % n) as f32 / n as f32 - 0.5;
            inputs.extend_from_slice(&[x0, x1]);
            targets.push(0.5 * x0 - 0.3 * x1 + 0.1);
        }
        SampleSet::with_scalar_targets(inputs, targets, 2).unwrap()
    }

    fn linear_net() -> Mlp {
        MlpBuilder::new(2)
            .unwrap()
            .add_layer(1, Activation::Identity)
            .unwrap()
            .build_with_seed(0)
            .unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = FitConfig::default();
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.learning_rate, 1e-4);
        assert_eq!(cfg.validation_fraction, 0.1);
        assert_eq!(cfg.stop_after_epochs, 20);
        assert_eq!(cfg.max_epochs, 1000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let base = FitConfig::default();
        assert!(base.clone().with_learning_rate(0.0).validate().is_err());
        assert!(base.clone().with_learning_rate(f32::NAN).validate().is_err());
        assert!(base.clone().with_stop_after_epochs(0).validate().is_ok());
        assert!(base.clone().with_max_epochs(0).validate().is_ok());
        assert!(base.clone().with_batch_size(0).validate().is_err());
        assert!(base.clone().with_validation_fraction(1.0).validate().is_err());
        assert!(base.with_num_train(0).validate().is_err());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let data = SampleSet::with_scalar_targets(vec![0.0; 30], vec![0.0; 10], 3).unwrap();
        let err = fit_regression_net(linear_net(), &data, &FitConfig::default().with_seed(0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn history_and_report_are_consistent() {
        let data = linear_data(100);
        let cfg = FitConfig::default()
            .with_batch_size(10)
            .with_learning_rate(1e-2)
            .with_max_epochs(15)
            .with_seed(9);
        let outcome = fit_regression_net(linear_net(), &data, &cfg).unwrap();
        let report = &outcome.report;

        assert_eq!(report.history.len(), report.epochs);
        assert!(report.epochs <= cfg.max_epochs + 1);
        assert_eq!(report.num_training_examples, 90);
        assert_eq!(report.num_validation_examples, 10);
        assert_eq!(report.num_parameters, 3);

        let best = report
            .history
            .iter()
            .map(|e| e.validation_loss)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(best, report.best_validation_loss);
        assert_eq!(
            report.history[report.best_epoch - 1].validation_loss,
            report.best_validation_loss
        );
    }

    #[test]
    fn same_seed_same_fit() {
        let data = linear_data(60);
        let cfg = FitConfig::default()
            .with_batch_size(8)
            .with_learning_rate(1e-2)
            .with_max_epochs(5)
            .with_seed(11);
        let a = fit_regression_net(linear_net(), &data, &cfg).unwrap();
        let b = fit_regression_net(linear_net(), &data, &cfg).unwrap();
        assert_eq!(a.split, b.split);
        assert_eq!(a.network.parameters(), b.network.parameters());
        assert_eq!(a.report, b.report);
    }
}
