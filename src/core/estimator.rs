//! Pose refinement over a correspondence set.

use crate::core::residual::{BearingProblem, CorrespondenceSet};
use crate::error::{BearingPoseError, BearingPoseResult};
use crate::geometry::Pose;
use crate::optimizer::{Bfgs, OptimizerConfig, Solver, SolverResult};
use nalgebra::{Isometry3, Point3};
use tracing::debug;

/// Minimize the bounded mean angular error starting from `initial`.
///
/// The returned pose is whatever the solver ended on; a non-converged status is
/// not an error. `rotz` is left unwrapped.
///
/// # Errors
/// `Solver` if `config` is rejected before the first iteration.
pub fn refine_pose(
    correspondences: &CorrespondenceSet,
    initial: &Pose,
    config: OptimizerConfig,
) -> BearingPoseResult<SolverResult<Pose>> {
    let problem = BearingProblem::new(correspondences);
    let mut solver = Bfgs::with_config(config);

    let result = solver.minimize(&problem, initial.to_dvector())?;

    debug!(
        "refined pose over {} correspondences: {} after {} iterations",
        correspondences.len(),
        result.status,
        result.iterations
    );

    let pose = Pose::from_slice(result.parameters.as_slice()).ok_or_else(|| {
        BearingPoseError::Computation(format!(
            "solver returned {} parameters for a 4-parameter pose",
            result.parameters.len()
        ))
    })?;

    Ok(result.map_parameters(|_| pose))
}

/// Refine a full rigid transform from landmarks and the rays that observed them.
///
/// Only translation and yaw of `initial_guess` seed the search; the returned
/// transform has no roll or pitch.
///
/// # Errors
/// `InvalidInput` if `points` and `rays` are empty or differ in length, and
/// `Solver` if `config` is rejected.
pub fn refine_pose_from_rays(
    points: Vec<Point3<f64>>,
    rays: &[Isometry3<f64>],
    initial_guess: &Isometry3<f64>,
    config: OptimizerConfig,
) -> BearingPoseResult<SolverResult<Isometry3<f64>>> {
    let correspondences = CorrespondenceSet::from_rays(points, rays)?;
    let result = refine_pose(&correspondences, &Pose::from_isometry(initial_guess), config)?;
    Ok(result.map_parameters(|pose| pose.to_isometry()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::optimizer::{OptimizationStatus, StopStrategy};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn observe(points: &[Point3<f64>], truth: &Pose) -> CorrespondenceSet {
        let iso = truth.to_isometry();
        let bearings = points.iter().map(|p| (iso * p).coords).collect();
        CorrespondenceSet::centered_at_origin(points.to_vec(), bearings).unwrap()
    }

    #[test]
    fn test_refine_recovers_small_offset() {
        let points = vec![
            Point3::new(4.0, 1.0, 0.5),
            Point3::new(-2.0, 3.0, 1.0),
            Point3::new(1.0, -4.0, -0.5),
            Point3::new(3.0, 2.5, 2.0),
            Point3::new(-3.5, -1.0, -1.5),
        ];
        let truth = Pose::new(0.3, -0.2, 0.1, 0.25);
        let set = observe(&points, &truth);

        let config = OptimizerConfig::new().with_stop_strategy(StopStrategy::gradient_norm(1e-9, 500));
        let result = refine_pose(&set, &Pose::identity(), config).unwrap();

        assert!(result.final_cost < result.initial_cost);
        assert_abs_diff_eq!(result.parameters.rotz, truth.rotz, epsilon = 1e-3);
        assert_abs_diff_eq!(
            (result.parameters.translation - truth.translation).norm(),
            0.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_zero_budget_keeps_initial_pose() {
        let set = observe(&[Point3::new(1.0, 2.0, 3.0)], &Pose::new(0.5, 0.0, 0.0, 0.1));
        let initial = Pose::new(1.0, 2.0, 3.0, 0.4);

        let config = OptimizerConfig::new().with_stop_strategy(StopStrategy::gradient_norm(1e-7, 0));
        let result = refine_pose(&set, &initial, config).unwrap();

        assert_eq!(result.parameters, initial);
        assert_eq!(result.status, OptimizationStatus::MaxIterationsReached);
    }

    #[test]
    fn test_rays_seed_from_guess_yaw() {
        let rays = [Isometry3::translation(0.0, 0.0, 2.0)];
        let guess = Isometry3::new(Vector3::new(1.0, 0.0, 0.0), Vector3::x() * 0.4);

        let config = OptimizerConfig::new().with_stop_strategy(StopStrategy::gradient_norm(1e-7, 0));
        let result =
            refine_pose_from_rays(vec![Point3::new(1.0, 0.0, 0.0)], &rays, &guess, config).unwrap();

        // Zero budget: the guess comes back with its roll removed
        let pose = Pose::from_isometry(&result.parameters);
        assert_abs_diff_eq!(result.parameters.rotation.euler_angles().0, 0.0, epsilon = 1e-12);
        assert_eq!(pose.translation, guess.translation.vector);
        assert_abs_diff_eq!(pose.rotz, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let set = observe(&[Point3::new(1.0, 2.0, 3.0)], &Pose::identity());
        let config = OptimizerConfig::new().with_derivative_eps(0.0);

        let result = refine_pose(&set, &Pose::identity(), config);
        assert!(matches!(result, Err(BearingPoseError::Solver(_))));
    }
}
