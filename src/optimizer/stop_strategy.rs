//! Stopping rules for iterative minimization
//!
//! A rule is consulted once before every iteration (including the first). Each
//! consultation counts as one check; the search stops once the number of checks
//! exceeds `max_iter`, so `max_iter = 0` runs no iterations at all.

use crate::optimizer::OptimizationStatus;
use tracing::info;

/// Convergence criterion plus iteration budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopStrategy {
    /// Stop when `||g|| < min_norm`
    GradientNorm { min_norm: f64, max_iter: usize },
    /// Stop when `|f_prev - f| < min_delta`, from the second check on
    ObjectiveDelta { min_delta: f64, max_iter: usize },
}

impl Default for StopStrategy {
    fn default() -> Self {
        StopStrategy::GradientNorm {
            min_norm: 1e-7,
            max_iter: 100,
        }
    }
}

impl StopStrategy {
    pub fn gradient_norm(min_norm: f64, max_iter: usize) -> Self {
        StopStrategy::GradientNorm { min_norm, max_iter }
    }

    pub fn objective_delta(min_delta: f64, max_iter: usize) -> Self {
        StopStrategy::ObjectiveDelta {
            min_delta,
            max_iter,
        }
    }

    pub fn threshold(&self) -> f64 {
        match *self {
            StopStrategy::GradientNorm { min_norm, .. } => min_norm,
            StopStrategy::ObjectiveDelta { min_delta, .. } => min_delta,
        }
    }

    pub fn max_iter(&self) -> usize {
        match *self {
            StopStrategy::GradientNorm { max_iter, .. }
            | StopStrategy::ObjectiveDelta { max_iter, .. } => max_iter,
        }
    }
}

/// Per-run state of a [`StopStrategy`].
#[derive(Debug, Clone)]
pub(crate) struct StopMonitor {
    strategy: StopStrategy,
    checks: usize,
    prev_cost: Option<f64>,
    verbose: bool,
}

impl StopMonitor {
    pub(crate) fn new(strategy: StopStrategy, verbose: bool) -> Self {
        Self {
            strategy,
            checks: 0,
            prev_cost: None,
            verbose,
        }
    }

    /// Returns the status to stop with, or `None` to run another iteration.
    pub(crate) fn check(&mut self, cost: f64, gradient_norm: f64) -> Option<OptimizationStatus> {
        self.checks += 1;

        if self.verbose {
            info!(
                "iteration: {}   objective: {:.9e}   gradient norm: {:.6e}",
                self.checks, cost, gradient_norm
            );
        }

        match self.strategy {
            StopStrategy::GradientNorm { min_norm, max_iter } => {
                if self.checks > max_iter {
                    return Some(OptimizationStatus::MaxIterationsReached);
                }
                if gradient_norm < min_norm {
                    return Some(OptimizationStatus::GradientToleranceReached);
                }
            }
            StopStrategy::ObjectiveDelta {
                min_delta,
                max_iter,
            } => {
                if let Some(prev_cost) = self.prev_cost {
                    if self.checks > max_iter {
                        return Some(OptimizationStatus::MaxIterationsReached);
                    }
                    if (prev_cost - cost).abs() < min_delta {
                        return Some(OptimizationStatus::CostToleranceReached);
                    }
                } else if max_iter == 0 {
                    return Some(OptimizationStatus::MaxIterationsReached);
                }
                self.prev_cost = Some(cost);
            }
        }

        None
    }
}
