//! Central finite differences
//!
//! The objectives minimized here contain kinks (`max(0, ·)` penalties, angles at
//! zero), so derivatives are always taken numerically, pointwise.

use nalgebra::DVector;

/// Default finite-difference step, `sqrt(f64::EPSILON)`.
pub const DERIVATIVE_EPS: f64 = 1.4901161193847656e-8;

/// Gradient by central differences: `(f(x + h e_i) - f(x - h e_i)) / 2h`.
pub fn central_difference_gradient<F>(f: F, x: &DVector<f64>, eps: f64) -> DVector<f64>
where
    F: Fn(&DVector<f64>) -> f64,
{
    let mut probe = x.clone();
    DVector::from_fn(x.len(), |i, _| {
        let old = probe[i];

        probe[i] = old + eps;
        let forward = f(&probe);
        probe[i] = old - eps;
        let backward = f(&probe);
        probe[i] = old;

        (forward - backward) / (2.0 * eps)
    })
}

/// Slope of a univariate function by central differences.
pub fn central_difference_derivative<F>(f: F, t: f64, eps: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    (f(t + eps) - f(t - eps)) / (2.0 * eps)
}
