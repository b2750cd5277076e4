//! Early stopping on validation loss.
//!
//! The tracker counts epochs, remembers the best validation loss seen so far and how many
//! epochs have passed without beating it. Training stops once
//!
//! - more than `max_epochs` epochs have run, or
//! - `patience` consecutive epochs failed to improve on the best loss.
//!
//! The best loss starts at `+inf`, so the first finite loss always becomes the baseline.
//! A non-finite loss never counts as an improvement.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why training stopped.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The epoch budget ran out.
    MaxEpochs,
    /// No improvement for `patience` consecutive epochs.
    Patience,
}

/// Outcome of recording one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub improved: bool,
    pub stop: Option<StopReason>,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    max_epochs: usize,
    best_loss: f64,
    best_epoch: usize,
    epochs: usize,
    epochs_since_improvement: usize,
}

impl EarlyStopping {
    /// A `patience` of 0 stops after the first epoch, as does a `max_epochs` of 0.
    pub fn new(patience: usize, max_epochs: usize) -> Self {
        Self {
            patience,
            max_epochs,
            best_loss: f64::INFINITY,
            best_epoch: 0,
            epochs: 0,
            epochs_since_improvement: 0,
        }
    }

    /// Record the validation loss of the epoch that just finished.
    pub fn observe(&mut self, validation_loss: f64) -> Observation {
        self.epochs += 1;

        let improved = validation_loss < self.best_loss;
        if improved {
            self.best_loss = validation_loss;
            self.best_epoch = self.epochs;
            self.epochs_since_improvement = 0;
        } else {
            self.epochs_since_improvement += 1;
        }

        let stop = if self.epochs > self.max_epochs {
            Some(StopReason::MaxEpochs)
        } else if self.epochs_since_improvement >= self.patience {
            Some(StopReason::Patience)
        } else {
            None
        };

        Observation { improved, stop }
    }

    /// Best loss so far, or `+inf` before any finite loss was seen.
    #[inline]
    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    /// 1-based epoch of the best loss; 0 if none was seen.
    #[inline]
    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    #[inline]
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    #[inline]
    pub fn epochs_since_improvement(&self) -> usize {
        self.epochs_since_improvement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(patience: usize, max_epochs: usize, losses: &[f64]) -> (EarlyStopping, Option<StopReason>) {
        let mut es = EarlyStopping::new(patience, max_epochs);
        for &loss in losses {
            if let Some(reason) = es.observe(loss).stop {
                return (es, Some(reason));
            }
        }
        (es, None)
    }

    #[test]
    fn first_loss_is_the_baseline() {
        let mut es = EarlyStopping::new(3, 100);
        let obs = es.observe(1e12);
        assert!(obs.improved);
        assert_eq!(es.best_loss(), 1e12);
        assert_eq!(es.best_epoch(), 1);
    }

    #[test]
    fn patience_one_stops_on_first_non_improving_epoch() {
        // Baseline, one improvement, then flat.
        let (es, reason) = run(1, 1000, &[1.0, 0.5, 0.6, 0.7, 0.8]);
        assert_eq!(reason, Some(StopReason::Patience));
        assert_eq!(es.epochs(), 3);
        assert_eq!(es.best_epoch(), 2);
        assert_eq!(es.best_loss(), 0.5);
    }

    #[test]
    fn improvement_resets_the_counter() {
        let (es, reason) = run(3, 1000, &[1.0, 1.1, 1.2, 0.9, 1.0, 1.0, 1.0, 0.1]);
        assert_eq!(reason, Some(StopReason::Patience));
        assert_eq!(es.epochs(), 7);
        assert_eq!(es.best_epoch(), 4);
    }

    #[test]
    fn equal_loss_is_not_an_improvement() {
        let mut es = EarlyStopping::new(5, 100);
        es.observe(0.5);
        assert!(!es.observe(0.5).improved);
        assert_eq!(es.epochs_since_improvement(), 1);
    }

    #[test]
    fn runs_at_most_max_epochs_plus_one() {
        let losses: Vec<f64> = (0..100).map(|i| 1.0 / (i + 1) as f64).collect();
        let (es, reason) = run(20, 10, &losses);
        assert_eq!(reason, Some(StopReason::MaxEpochs));
        assert_eq!(es.epochs(), 11);
    }

    #[test]
    fn max_epochs_wins_when_both_conditions_hold() {
        let (es, reason) = run(2, 2, &[1.0, 2.0, 3.0]);
        assert_eq!(es.epochs(), 3);
        assert_eq!(reason, Some(StopReason::MaxEpochs));
    }

    #[test]
    fn zero_budgets_stop_after_one_epoch() {
        let (es, reason) = run(0, 1000, &[1.0, 0.5, 0.25]);
        assert_eq!(reason, Some(StopReason::Patience));
        assert_eq!(es.epochs(), 1);
        assert_eq!(es.best_epoch(), 1);

        let (es, reason) = run(20, 0, &[1.0, 0.5, 0.25]);
        assert_eq!(reason, Some(StopReason::MaxEpochs));
        assert_eq!(es.epochs(), 1);
        assert_eq!(es.best_loss(), 1.0);
    }

    #[test]
    fn non_finite_losses_never_improve() {
        let (es, reason) = run(4, 1000, &[f64::NAN; 10]);
        assert_eq!(reason, Some(StopReason::Patience));
        assert_eq!(es.epochs(), 4);
        assert_eq!(es.best_epoch(), 0);
        assert!(es.best_loss().is_infinite());
    }
}
