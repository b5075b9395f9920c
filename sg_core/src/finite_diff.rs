//! Numerical gradient estimation for validating the backward pass.
//!
//! Central finite differences approximate each partial derivative by
//! perturbing one input at a time. The estimate carries O(eps^2) truncation
//! error, which is plenty to cross-check the exact analytic gradients the
//! tape produces.

/// Estimate the gradient of `f` at `point` with central differences.
///
/// `f` receives the full coordinate vector and returns the scalar output;
/// `eps` is the perturbation step (1e-7 to 1e-5 works well for f64).
///
/// # Example
///
/// ```
/// use sg_core::finite_diff_grad;
///
/// // f(x, y) = x^2 + y^2, so df/dx = 2x and df/dy = 2y.
/// let f = |v: &[f64]| v[0] * v[0] + v[1] * v[1];
/// let grads = finite_diff_grad(f, &[3.0, 4.0], 1e-7);
///
/// assert!((grads[0] - 6.0).abs() < 1e-5);
/// assert!((grads[1] - 8.0).abs() < 1e-5);
/// ```
pub fn finite_diff_grad<F>(f: F, point: &[f64], eps: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut scratch = point.to_vec();

    (0..point.len())
        .map(|i| {
            let eval_at = |scratch: &mut Vec<f64>, coord: f64| {
                scratch[i] = coord;
                f(scratch)
            };

            let f_plus = eval_at(&mut scratch, point[i] + eps);
            let f_minus = eval_at(&mut scratch, point[i] - eps);
            scratch[i] = point[i];

            (f_plus - f_minus) / (2.0 * eps)
        })
        .collect()
}

/// Largest absolute componentwise difference between two gradient vectors.
pub fn max_grad_error(grad1: &[f64], grad2: &[f64]) -> f64 {
    assert_eq!(grad1.len(), grad2.len());
    grad1
        .iter()
        .zip(grad2)
        .fold(0.0f64, |worst, (a, b)| worst.max((a - b).abs()))
}
