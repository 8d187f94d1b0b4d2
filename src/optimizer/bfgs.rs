//! BFGS quasi-Newton minimization with numerical derivatives.
//!
//! Each iteration:
//! - approximates the gradient by central differences
//! - builds a search direction from the inverse-Hessian estimate
//! - runs a Wolfe line search along that direction, with slopes again taken by
//!   central differences
//! - updates the inverse-Hessian estimate from the observed step and gradient change
//!
//! The estimate starts as the identity and is rescaled once, on the first update,
//! by `δ·γ / γ·γ` clamped to `[0.01, 100]`. Whenever an update would be
//! non-finite or divide by zero the estimate resets to the identity.

use crate::core::Objective;
use crate::optimizer::line_search::line_search;
use crate::optimizer::numerical::{central_difference_derivative, central_difference_gradient};
use crate::optimizer::stop_strategy::StopMonitor;
use crate::optimizer::{
    ConvergenceInfo, OptimizationStatus, OptimizerConfig, OptimizerError, Solver, SolverResult,
};
use nalgebra::{DMatrix, DVector};
use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Summary statistics for a BFGS run.
#[derive(Debug, Clone)]
pub struct BfgsSummary {
    /// Initial cost value
    pub initial_cost: f64,
    /// Final cost value
    pub final_cost: f64,
    /// Total number of iterations performed
    pub iterations: usize,
    /// Iterations whose line search found no better point
    pub zero_steps: usize,
    /// Final gradient norm
    pub final_gradient_norm: f64,
    /// Maximum parameter update norm
    pub max_parameter_update_norm: f64,
    /// Objective evaluation count
    pub cost_evaluations: usize,
    /// Why the run stopped
    pub status: OptimizationStatus,
    /// Total time elapsed
    pub total_time: Duration,
}

impl fmt::Display for BfgsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== BFGS Optimization Summary ===")?;
        writeln!(f, "Initial cost:              {:.6e}", self.initial_cost)?;
        writeln!(f, "Final cost:                {:.6e}", self.final_cost)?;
        writeln!(
            f,
            "Cost reduction:            {:.6e} ({:.2}%)",
            self.initial_cost - self.final_cost,
            100.0 * (self.initial_cost - self.final_cost) / self.initial_cost.abs().max(1e-12)
        )?;
        writeln!(f, "Total iterations:          {}", self.iterations)?;
        writeln!(f, "Zero-length steps:         {}", self.zero_steps)?;
        writeln!(
            f,
            "Final gradient norm:       {:.6e}",
            self.final_gradient_norm
        )?;
        writeln!(
            f,
            "Max parameter update norm: {:.6e}",
            self.max_parameter_update_norm
        )?;
        writeln!(f, "Cost evaluations:          {}", self.cost_evaluations)?;
        writeln!(f, "Status:                    {}", self.status)?;
        write!(f, "Total time:                {:?}", self.total_time)
    }
}

/// Inverse-Hessian estimate carried across iterations.
#[derive(Debug, Clone)]
struct BfgsSearchStrategy {
    inverse_hessian: DMatrix<f64>,
    previous: Option<(DVector<f64>, DVector<f64>)>,
    scaled: bool,
}

impl BfgsSearchStrategy {
    fn new(dimension: usize) -> Self {
        Self {
            inverse_hessian: DMatrix::identity(dimension, dimension),
            previous: None,
            scaled: false,
        }
    }

    /// Forget all curvature information; the next direction is steepest descent.
    fn reset(&mut self) {
        let n = self.inverse_hessian.nrows();
        self.inverse_hessian = DMatrix::identity(n, n);
        self.previous = None;
        self.scaled = false;
    }

    /// Search direction `-H g` at `x`, after folding in the step from the previous point.
    fn direction(&mut self, x: &DVector<f64>, gradient: &DVector<f64>) -> DVector<f64> {
        let n = x.len();

        if let Some((prev_x, prev_gradient)) = self.previous.take() {
            let delta = x - prev_x;
            let gamma = gradient - prev_gradient;
            let dg = delta.dot(&gamma);

            if !self.scaled {
                let gg = gamma.dot(&gamma);
                if gg.abs() > f64::EPSILON {
                    let scale = (dg / gg).clamp(0.01, 100.0);
                    self.inverse_hessian = DMatrix::identity(n, n) * scale;
                    self.scaled = true;
                }
            }

            let hg = &self.inverse_hessian * &gamma;
            let ghg = gamma.dot(&hg);

            if ghg.is_finite() && dg.is_finite() && dg != 0.0 {
                let outer = &delta * delta.transpose() * ((1.0 + ghg / dg) / dg);
                let cross = (&delta * hg.transpose() + &hg * delta.transpose()) / dg;
                self.inverse_hessian += outer - cross;
            } else {
                self.inverse_hessian = DMatrix::identity(n, n);
                self.scaled = false;
            }
        }

        self.previous = Some((x.clone(), gradient.clone()));
        -(&self.inverse_hessian * gradient)
    }
}

/// BFGS minimizer driven only by objective values.
#[derive(Debug, Clone)]
pub struct Bfgs {
    config: OptimizerConfig,
}

impl Bfgs {
    /// Create a new BFGS solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(OptimizerConfig::default())
    }

    /// Create a new BFGS solver with the given configuration.
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

impl Default for Bfgs {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for Bfgs {
    type Config = OptimizerConfig;
    type Error = OptimizerError;

    fn new(config: Self::Config) -> Self {
        Self::with_config(config)
    }

    fn minimize<T>(
        &mut self,
        problem: &T,
        initial_params: DVector<f64>,
    ) -> Result<SolverResult<DVector<f64>>, Self::Error>
    where
        T: Objective,
    {
        self.config.validate()?;

        let dimension = problem.parameter_count();
        if initial_params.len() != dimension {
            return Err(OptimizerError::DimensionMismatch {
                expected: dimension,
                actual: initial_params.len(),
            });
        }

        let start_time = Instant::now();
        let eps = self.config.derivative_eps;
        let target_cost = self.config.target_cost;

        let cost_evaluations = Cell::new(0usize);
        let cost = |params: &DVector<f64>| {
            cost_evaluations.set(cost_evaluations.get() + 1);
            problem.cost(params)
        };

        let mut params = initial_params;
        let initial_cost = cost(&params);
        let mut current_cost = initial_cost;

        if self.config.verbose {
            info!(
                "Starting BFGS on {} parameters, initial cost: {:.6e}",
                dimension, initial_cost
            );
        }

        if !initial_cost.is_finite() {
            return Ok(SolverResult {
                parameters: params,
                status: OptimizationStatus::NumericalFailure,
                initial_cost,
                final_cost: initial_cost,
                iterations: 0,
                elapsed_time: start_time.elapsed(),
                convergence_info: ConvergenceInfo {
                    final_gradient_norm: f64::NAN,
                    final_parameter_update_norm: 0.0,
                    cost_evaluations: cost_evaluations.get(),
                    gradient_evaluations: 0,
                },
            });
        }

        let mut gradient = central_difference_gradient(&cost, &params, eps);
        let mut gradient_evaluations = 1;

        let mut monitor = StopMonitor::new(self.config.stop_strategy, self.config.verbose);
        let mut strategy = BfgsSearchStrategy::new(dimension);

        let mut iterations = 0;
        let mut zero_steps = 0;
        let mut final_parameter_update_norm = 0.0;
        let mut max_parameter_update_norm: f64 = 0.0;

        let status = loop {
            let gradient_norm = gradient.norm();

            if let Some(status) = monitor.check(current_cost, gradient_norm) {
                break status;
            }
            if current_cost <= target_cost {
                break OptimizationStatus::TargetCostReached;
            }
            if !gradient_norm.is_finite() {
                break OptimizationStatus::NumericalFailure;
            }

            iterations += 1;

            // A zero step is retried once along steepest descent within the same iteration
            let mut retried = false;
            let (direction, step) = loop {
                let direction = strategy.direction(&params, &gradient);
                let slope = gradient.dot(&direction);

                let phi = |alpha: f64| cost(&(&params + &direction * alpha));
                let dphi = |alpha: f64| central_difference_derivative(&phi, alpha, eps);
                let step = line_search(
                    &phi,
                    current_cost,
                    &dphi,
                    slope,
                    target_cost,
                    &self.config.line_search,
                );

                debug!(
                    "iteration {}: slope = {:.6e}, alpha = {:.6e}, line evaluations = {}",
                    iterations, slope, step.alpha, step.evaluations
                );

                if step.alpha != 0.0 || retried {
                    break (direction, step);
                }
                zero_steps += 1;
                retried = true;
                strategy.reset();
            };

            if step.alpha == 0.0 {
                zero_steps += 1;
                break OptimizationStatus::Stalled;
            }

            if !step.value.is_finite() {
                break OptimizationStatus::NumericalFailure;
            }

            let update = &direction * step.alpha;
            final_parameter_update_norm = update.norm();
            max_parameter_update_norm = max_parameter_update_norm.max(final_parameter_update_norm);

            params += update;
            current_cost = step.value;

            gradient = central_difference_gradient(&cost, &params, eps);
            gradient_evaluations += 1;
        };

        let elapsed = start_time.elapsed();
        let final_gradient_norm = gradient.norm();

        if self.config.verbose {
            let summary = BfgsSummary {
                initial_cost,
                final_cost: current_cost,
                iterations,
                zero_steps,
                final_gradient_norm,
                max_parameter_update_norm,
                cost_evaluations: cost_evaluations.get(),
                status,
                total_time: elapsed,
            };
            info!("\n{}", summary);
        }

        Ok(SolverResult {
            parameters: params,
            status,
            initial_cost,
            final_cost: current_cost,
            iterations,
            elapsed_time: elapsed,
            convergence_info: ConvergenceInfo {
                final_gradient_norm,
                final_parameter_update_norm,
                cost_evaluations: cost_evaluations.get(),
                gradient_evaluations,
            },
        })
    }
}
