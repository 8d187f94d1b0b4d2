//! Minimizers for small scalar objectives using numerical derivatives.
//!
//! This module provides a quasi-Newton minimizer driven only by objective values:
//! - [`Bfgs`]: BFGS inverse-Hessian updates with a bracketing line search
//! - [`numerical`]: central finite differences for gradients and slopes
//! - [`line_search`]: Wolfe line search with cubic interpolation
//! - [`stop_strategy`]: gradient-norm and objective-delta stopping rules

use crate::core::Objective;
use nalgebra::DVector;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod bfgs;
pub mod line_search;
pub mod numerical;
pub mod stop_strategy;

pub use bfgs::{Bfgs, BfgsSummary};
pub use line_search::{LineSearchConfig, LineSearchResult};
pub use numerical::DERIVATIVE_EPS;
pub use stop_strategy::StopStrategy;

/// Objective value at or below which the search ends immediately.
///
/// Negative, so it never fires for non-negative objectives.
pub const DEFAULT_TARGET_COST: f64 = -1.0;

/// Errors raised before any iteration runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    #[error("Parameter dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid optimizer configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration parameters for the minimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Convergence criterion and iteration budget
    pub stop_strategy: StopStrategy,
    /// Stop as soon as the objective is at or below this value
    pub target_cost: f64,
    /// Finite-difference step used for gradients and line slopes
    pub derivative_eps: f64,
    /// Line search parameters
    pub line_search: LineSearchConfig,
    /// Emit per-iteration traces
    pub verbose: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            stop_strategy: StopStrategy::default(),
            target_cost: DEFAULT_TARGET_COST,
            derivative_eps: DERIVATIVE_EPS,
            line_search: LineSearchConfig::default(),
            verbose: false,
        }
    }
}

impl OptimizerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stopping strategy
    pub fn with_stop_strategy(mut self, stop_strategy: StopStrategy) -> Self {
        self.stop_strategy = stop_strategy;
        self
    }

    /// Set the early-exit objective value
    pub fn with_target_cost(mut self, target_cost: f64) -> Self {
        self.target_cost = target_cost;
        self
    }

    /// Set the finite-difference step
    pub fn with_derivative_eps(mut self, derivative_eps: f64) -> Self {
        self.derivative_eps = derivative_eps;
        self
    }

    /// Set the line search parameters
    pub fn with_line_search(mut self, line_search: LineSearchConfig) -> Self {
        self.line_search = line_search;
        self
    }

    /// Enable or disable verbose tracing
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        if !(self.derivative_eps.is_finite() && self.derivative_eps > 0.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "derivative step must be positive and finite, got {}",
                self.derivative_eps
            )));
        }
        let threshold = self.stop_strategy.threshold();
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "stop threshold must be non-negative and finite, got {threshold}"
            )));
        }
        if self.target_cost.is_nan() {
            return Err(OptimizerError::InvalidConfig(
                "target cost must not be NaN".to_string(),
            ));
        }
        self.line_search.validate()
    }
}

/// Why the search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Gradient norm fell below the threshold
    GradientToleranceReached,
    /// Objective change between iterations fell below the threshold
    CostToleranceReached,
    /// Objective reached the configured target value
    TargetCostReached,
    /// Iteration budget exhausted
    MaxIterationsReached,
    /// Neither the quasi-Newton nor the steepest-descent direction made progress
    Stalled,
    /// Objective became NaN or infinite
    NumericalFailure,
}

impl OptimizationStatus {
    /// True for the statuses produced by a convergence test.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            OptimizationStatus::GradientToleranceReached
                | OptimizationStatus::CostToleranceReached
                | OptimizationStatus::TargetCostReached
        )
    }
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::GradientToleranceReached => write!(f, "Gradient tolerance reached"),
            OptimizationStatus::CostToleranceReached => write!(f, "Cost tolerance reached"),
            OptimizationStatus::TargetCostReached => write!(f, "Target cost reached"),
            OptimizationStatus::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            OptimizationStatus::Stalled => write!(f, "Stalled"),
            OptimizationStatus::NumericalFailure => write!(f, "Numerical failure"),
        }
    }
}

/// Detailed convergence information.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceInfo {
    /// Final gradient norm
    pub final_gradient_norm: f64,
    /// Norm of the last accepted parameter step
    pub final_parameter_update_norm: f64,
    /// Objective evaluation count, finite differences included
    pub cost_evaluations: usize,
    /// Gradient evaluation count
    pub gradient_evaluations: usize,
}

impl fmt::Display for ConvergenceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Final gradient norm: {:.2e}, Final parameter update norm: {:.2e}, Cost evaluations: {}, Gradient evaluations: {}",
            self.final_gradient_norm,
            self.final_parameter_update_norm,
            self.cost_evaluations,
            self.gradient_evaluations
        )
    }
}

/// Result of a solver execution.
#[derive(Debug, Clone)]
pub struct SolverResult<T> {
    /// Final parameters
    pub parameters: T,
    /// Final optimization status
    pub status: OptimizationStatus,
    /// Objective at the initial parameters
    pub initial_cost: f64,
    /// Objective at the final parameters
    pub final_cost: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Total time elapsed
    pub elapsed_time: Duration,
    /// Convergence statistics
    pub convergence_info: ConvergenceInfo,
}

impl<T> SolverResult<T> {
    /// Same result carrying different parameters.
    pub fn map_parameters<U>(self, f: impl FnOnce(T) -> U) -> SolverResult<U> {
        SolverResult {
            parameters: f(self.parameters),
            status: self.status,
            initial_cost: self.initial_cost,
            final_cost: self.final_cost,
            iterations: self.iterations,
            elapsed_time: self.elapsed_time,
            convergence_info: self.convergence_info,
        }
    }
}

/// Core trait for optimization solvers.
pub trait Solver {
    /// Configuration type for this solver
    type Config;
    /// Error type
    type Error;

    /// Create a new solver with the given configuration
    fn new(config: Self::Config) -> Self;

    /// Minimize `problem` starting from `initial_params`
    fn minimize<T>(
        &mut self,
        problem: &T,
        initial_params: DVector<f64>,
    ) -> Result<SolverResult<DVector<f64>>, Self::Error>
    where
        T: Objective;
}
