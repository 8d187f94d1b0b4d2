//! Problem formulation for bearing-based pose estimation
//!
//! This module contains the pieces the optimizer consumes:
//! - [`Objective`], the scalar function interface every solver minimizes
//! - [`residual`], the angular residual model over a correspondence set
//! - [`estimator`], the glue that runs a solver on that model and returns a [`Pose`]
//!
//! [`Pose`]: crate::geometry::Pose

use nalgebra::DVector;

pub mod estimator;
pub mod residual;

pub use estimator::{refine_pose, refine_pose_from_rays};
pub use residual::{BearingProblem, CorrespondenceSet, DEFAULT_BOUND_RADIUS, error_function};

/// Scalar function of a real parameter vector that can be minimized
///
/// No derivatives are requested: solvers approximate them numerically.
pub trait Objective {
    /// Get the number of parameters
    fn parameter_count(&self) -> usize;

    /// Evaluate the objective at the given parameters
    ///
    /// Implementations return NaN rather than panicking on degenerate input.
    fn cost(&self, parameters: &DVector<f64>) -> f64;
}
