//! Mean-squared-error loss.
//!
//! Used like:
//!
//! - run `network.forward_batch(...)`
//! - compute `d_output` with [`mse_backward`]
//! - run `network.backward_batch(...)`
//! - update parameters with the optimizer
//!
//! The reduction is the mean over every element of the batch, so a batch of `B` samples
//! with `K` targets each averages over `B * K` squared errors.

/// Mean squared error: `mean((pred - target)^2)`.
#[inline]
pub fn mse(pred: &[f32], target: &[f32]) -> f32 {
    assert_eq!(
        pred.len(),
        target.len(),
        "pred len {} does not match target len {}",
        pred.len(),
        target.len()
    );

    if pred.is_empty() {
        return 0.0;
    }

    let mut sum_sq = 0.0_f32;
    for (&p, &t) in pred.iter().zip(target) {
        let diff = p - t;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    sum_sq / pred.len() as f32
}

/// MSE loss + gradient w.r.t. `pred`.
///
/// Writes `d_pred[i] = 2 * (pred[i] - target[i]) / N` and returns the loss.
#[inline]
pub fn mse_backward(pred: &[f32], target: &[f32], d_pred: &mut [f32]) -> f32 {
    assert_eq!(
        pred.len(),
        target.len(),
        "pred len {} does not match target len {}",
        pred.len(),
        target.len()
    );
    assert_eq!(
        pred.len(),
        d_pred.len(),
        "pred len {} does not match d_pred len {}",
        pred.len(),
        d_pred.len()
    );

    if pred.is_empty() {
        return 0.0;
    }

    let inv_n = 1.0 / pred.len() as f32;
    let mut sum_sq = 0.0_f32;
    for ((&p, &t), d) in pred.iter().zip(target).zip(d_pred.iter_mut()) {
        let diff = p - t;
        sum_sq = diff.mul_add(diff, sum_sq);
        *d = 2.0 * diff * inv_n;
    }
    sum_sq / pred.len() as f32
}
