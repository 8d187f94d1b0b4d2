//! Bracketing line search for minimization.
//!
//! Finds a step length α along a descent direction satisfying the strong Wolfe
//! conditions:
//! 1. Sufficient decrease: φ(α) ≤ φ(0) + ρ·α·φ'(0)
//! 2. Curvature condition: |φ'(α)| ≤ σ·|φ'(0)|
//!
//! The search first expands α until an interval containing an acceptable step is
//! bracketed, then sections that interval with cubic interpolation. See
//! Fletcher, "Practical Methods of Optimization" (1987), section 2.6.

/// Growth of the trial step during bracketing, lower and upper factor.
const EXTRAPOLATION_MIN: f64 = 1.4;
const EXTRAPOLATION_MAX: f64 = 9.0;

/// Fractions of the bracket kept clear of each end while sectioning.
const SECTION_LOWER: f64 = 0.1;
const SECTION_UPPER: f64 = 0.5;

/// Configuration for the line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchConfig {
    /// Sufficient decrease parameter (ρ in the Wolfe conditions)
    pub rho: f64,

    /// Curvature condition parameter (σ in the Wolfe conditions)
    pub sigma: f64,

    /// Maximum number of trial steps, bracketing and sectioning combined
    pub max_iterations: usize,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            rho: 0.01,
            sigma: 0.9,
            max_iterations: 100,
        }
    }
}

impl LineSearchConfig {
    /// Check `0 < rho < sigma < 1` and a non-zero trial budget.
    pub fn validate(&self) -> Result<(), super::OptimizerError> {
        if !(0.0 < self.rho && self.rho < self.sigma && self.sigma < 1.0) {
            return Err(super::OptimizerError::InvalidConfig(format!(
                "line search requires 0 < rho < sigma < 1, got rho = {}, sigma = {}",
                self.rho, self.sigma
            )));
        }
        if self.max_iterations == 0 {
            return Err(super::OptimizerError::InvalidConfig(
                "line search needs at least one trial step".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchResult {
    /// Step length to take (0 when no progress is possible)
    pub alpha: f64,

    /// φ(alpha)
    pub value: f64,

    /// Number of trial steps evaluated
    pub evaluations: usize,
}

impl LineSearchResult {
    fn no_step(value: f64) -> Self {
        Self {
            alpha: 0.0,
            value,
            evaluations: 0,
        }
    }
}

/// Clamp `value` into the interval spanned by `a` and `b`, in either order.
///
/// A NaN bound is ignored rather than propagated.
fn put_in_range(a: f64, b: f64, value: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    value.max(lo).min(hi)
}

/// Minimizer in `[0, limit]` of the cubic through `(0, f0, d0)` and `(1, f1, d1)`.
///
/// Reduces to the quadratic fit when the cubic term vanishes and falls back to
/// the midpoint when neither has an interior minimum.
pub fn poly_min_extrap(f0: f64, d0: f64, f1: f64, d1: f64, limit: f64) -> f64 {
    let n = 3.0 * (f1 - f0) - 2.0 * d0 - d1;
    let e = d0 + d1 - 2.0 * (f1 - f0);

    if e.abs() <= f64::EPSILON {
        return if n > 0.0 {
            (-d0 / (2.0 * n)).clamp(0.0, limit)
        } else {
            0.5
        };
    }

    let discriminant = (n * n - 3.0 * e * d0).max(0.0).sqrt();
    if !discriminant.is_finite() {
        return 0.5;
    }

    let x1 = (discriminant - n) / (3.0 * e);
    let x2 = -(discriminant + n) / (3.0 * e);

    let cubic = |x: f64| f0 + d0 * x + n * x * x + e * x * x * x;
    let x = if cubic(x1) < cubic(x2) { x1 } else { x2 };

    if x.is_nan() { 0.5 } else { x.clamp(0.0, limit) }
}

/// Search along a line for a step satisfying the strong Wolfe conditions.
///
/// # Arguments
/// * `phi` - φ(α), the objective along the search line
/// * `phi0` - φ(0)
/// * `dphi` - φ'(α)
/// * `dphi0` - φ'(0), negative for a descent direction
/// * `min_f` - stop as soon as φ(α) ≤ min_f
/// * `config` - Wolfe parameters and trial budget
///
/// The returned value is never above `phi0` unless it is at or below `min_f`.
pub fn line_search<F, D>(
    phi: F,
    phi0: f64,
    dphi: D,
    dphi0: f64,
    min_f: f64,
    config: &LineSearchConfig,
) -> LineSearchResult
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    // Flat start: no step can change the objective measurably
    if dphi0.abs() <= phi0.abs() * f64::EPSILON {
        return LineSearchResult::no_step(phi0);
    }
    if phi0 <= min_f {
        return LineSearchResult::no_step(phi0);
    }

    let rho = config.rho;
    let thresh = (config.sigma * dphi0).abs();

    // Largest step worth considering before min_f would be undercut
    let mu = (min_f - phi0) / (rho * dphi0);

    let mut alpha = if mu < 0.0 { -1.0 } else { 1.0 };
    alpha = put_in_range(0.0, 0.65 * mu, alpha);

    let mut last_alpha = 0.0;
    let mut last_val = phi0;
    let mut last_der = dphi0;

    let mut evaluations = 0;

    let (mut a, mut a_val, mut a_der, mut b, mut b_val, mut b_der);

    loop {
        evaluations += 1;
        let val = phi(alpha);
        let der = dphi(alpha);

        let accept = |alpha: f64, value: f64| LineSearchResult {
            alpha,
            value,
            evaluations,
        };

        if val <= min_f {
            return accept(alpha, val);
        }

        if !val.is_finite() || val > phi0 + rho * alpha * dphi0 || val >= last_val {
            a = last_alpha;
            a_val = last_val;
            a_der = last_der;
            b = alpha;
            b_val = val;
            b_der = der;
            break;
        }

        if der.abs() <= thresh {
            return accept(alpha, val);
        }

        if last_alpha == alpha || evaluations >= config.max_iterations {
            return accept(alpha, val);
        }

        if der >= 0.0 {
            a = alpha;
            a_val = val;
            a_der = der;
            b = last_alpha;
            b_val = last_val;
            b_der = last_der;
            break;
        }

        let (first, last) = if mu > 0.0 {
            (
                mu.min(alpha + EXTRAPOLATION_MIN * (alpha - last_alpha)),
                mu.min(alpha + EXTRAPOLATION_MAX * (alpha - last_alpha)),
            )
        } else {
            (
                mu.max(alpha + EXTRAPOLATION_MIN * (alpha - last_alpha)),
                mu.max(alpha + EXTRAPOLATION_MAX * (alpha - last_alpha)),
            )
        };

        // Slopes are rescaled so the interpolation runs on [0, 1]
        let previous = alpha;
        let width = (alpha - last_alpha).abs();
        alpha = if last_alpha < alpha {
            last_alpha
                + width * poly_min_extrap(last_val, last_der * width, val, der * width, 1e10)
        } else {
            alpha + width * poly_min_extrap(val, der * width, last_val, last_der * width, 1e10)
        };
        alpha = put_in_range(first, last, alpha);

        last_alpha = previous;
        last_val = val;
        last_der = der;
    }

    // Sectioning: a always holds the best value seen so far
    loop {
        let first = a + SECTION_LOWER * (b - a);
        let last = b - SECTION_UPPER * (b - a);

        let width = b - a;
        alpha = a + width * poly_min_extrap(a_val, a_der * width, b_val, b_der * width, 1.0);
        alpha = put_in_range(first, last, alpha);

        evaluations += 1;
        let val = phi(alpha);
        let der = dphi(alpha);

        let best = |alpha: f64, value: f64| {
            let (alpha, value) = if value <= a_val { (alpha, value) } else { (a, a_val) };
            LineSearchResult {
                alpha,
                value,
                evaluations,
            }
        };

        if val <= min_f {
            return LineSearchResult {
                alpha,
                value: val,
                evaluations,
            };
        }
        if evaluations >= config.max_iterations {
            return best(alpha, val);
        }

        // Interval no longer shrinks under rounding
        if a == first || b == last {
            return best(b, b_val);
        }

        // Even the widest step in the bracket cannot change the objective
        let max_possible_alpha = a.abs().max(b.abs());
        if (max_possible_alpha * dphi0).abs() <= phi0.abs() * f64::EPSILON {
            return best(alpha, val);
        }

        if !val.is_finite() || val > phi0 + rho * alpha * dphi0 || val >= a_val {
            b = alpha;
            b_val = val;
            b_der = der;
        } else {
            if der.abs() <= thresh {
                return best(alpha, val);
            }

            if (b - a) * der >= 0.0 {
                b = a;
                b_val = a_val;
                b_der = a_der;
            }

            a = alpha;
            a_val = val;
            a_der = der;
        }
    }
}
