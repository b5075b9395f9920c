//! Loss functions.

use sg_core::Value;

/// Mean squared error: `mean((pred_i - target_i)^2)`.
///
/// Targets are plain floats; they are lifted into constant leaves on the
/// predictions' tape.
///
/// # Panics
///
/// Panics on empty input or mismatched lengths.
pub fn mse_loss(preds: &[Value], targets: &[f64]) -> Value {
    assert!(!preds.is_empty(), "mse_loss over an empty batch");
    assert_eq!(preds.len(), targets.len(), "preds/targets length mismatch");

    let mut total = (&preds[0] - targets[0]).powf(2.0);
    for (p, &t) in preds.iter().zip(targets.iter()).skip(1) {
        total = total + (p - t).powf(2.0);
    }
    total / preds.len() as f64
}
