//! Loss functions.
//!
//! Training minimizes the squared error `E = 0.5 * sum((target - output)^2)` one
//! example at a time. The delta rule in `Mlp::backward` is exactly `-dE/dz` for
//! every activation, so `squared_error` is the number to watch while training.

/// Squared error of one example: `0.5 * sum((target - pred)^2)`.
///
/// Shape contract: `pred.len() == target.len()`.
#[inline]
pub fn squared_error(pred: &[f32], target: &[f32]) -> f32 {
    debug_assert_eq!(
        pred.len(),
        target.len(),
        "pred len {} does not match target len {}",
        pred.len(),
        target.len()
    );

    let mut sum_sq = 0.0_f32;
    for (&y, &t) in pred.iter().zip(target) {
        let diff = t - y;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    0.5 * sum_sq
}

/// Mean squared error over the entries of one example.
#[inline]
pub fn mse(pred: &[f32], target: &[f32]) -> f32 {
    if pred.is_empty() {
        return 0.0;
    }
    2.0 * squared_error(pred, target) / pred.len() as f32
}
