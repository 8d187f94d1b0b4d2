//! Integration tests for pose recovery on synthetic scenes
//!
//! These tests run the full pipeline, from correspondences (structured or packed
//! flat arrays) through BFGS to the refined pose, and check it against the pose
//! that generated the bearings.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::f64::consts::FRAC_PI_2;

use approx::assert_abs_diff_eq;
use bearing_pose::boundary::{EstimatorOptions, StopStrategyKind, estimate_pose};
use bearing_pose::core::{
    BearingProblem, CorrespondenceSet, error_function, refine_pose, refine_pose_from_rays,
};
use bearing_pose::geometry::Pose;
use bearing_pose::optimizer::{OptimizationStatus, OptimizerConfig, StopStrategy};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

mod scene_utils;
use scene_utils::*;

fn tight_config(strategy: StopStrategy) -> OptimizerConfig {
    OptimizerConfig::new().with_stop_strategy(strategy)
}

#[test]
fn test_zero_residual_at_true_pose() {
    let set = scene();
    let truth = true_pose();

    for error in error_function(&set, &truth) {
        assert!(error < 1e-7, "error at true pose: {error}");
    }
    assert!(BearingProblem::new(&set).cost_at(&truth) < 1e-7);
}

#[test]
fn test_recovers_true_pose_gradient_norm() {
    let set = scene();
    let truth = true_pose();

    let result = refine_pose(
        &set,
        &nearby_guess(),
        tight_config(StopStrategy::gradient_norm(1e-9, 500)),
    )
    .unwrap();

    assert!(
        pose_error(&result.parameters, &truth) < 1e-3,
        "recovered {} expected {}",
        result.parameters,
        truth
    );
    assert!(result.final_cost < 1e-3);
    assert!(result.final_cost < result.initial_cost);
}

#[test]
fn test_stop_strategies_agree() {
    let set = scene();
    let truth = true_pose();

    let by_gradient = refine_pose(
        &set,
        &nearby_guess(),
        tight_config(StopStrategy::gradient_norm(1e-9, 500)),
    )
    .unwrap();
    let by_delta = refine_pose(
        &set,
        &nearby_guess(),
        tight_config(StopStrategy::objective_delta(1e-12, 500)),
    )
    .unwrap();

    assert!(pose_error(&by_delta.parameters, &truth) < 1e-3);
    assert!(pose_error(&by_gradient.parameters, &by_delta.parameters) < 2e-3);
}

#[test]
fn test_flat_arrays_recover_true_pose() {
    let points = scene_points();
    let centers = scene_centers();
    let bearings = observe(&points, &centers, &true_pose());

    let mut pose = nearby_guess().to_array();
    let options = EstimatorOptions::new()
        .with_stop_threshold(1e-9)
        .with_max_iter(500);

    let residual = estimate_pose(
        points.len(),
        &flatten_points(&points),
        &flatten_points(&centers),
        &flatten(&bearings),
        &mut pose,
        &options,
    )
    .unwrap();

    assert!(residual < 1e-3);
    assert!(pose_error(&Pose::from_array(&pose), &true_pose()) < 1e-3);
}

#[test]
fn test_shared_center_matches_structured_api() {
    let points = scene_points();
    let center = Point3::new(0.0, 0.0, 1.5);
    let centers = vec![center; points.len()];
    let bearings = observe(&points, &centers, &true_pose());

    let options = EstimatorOptions::new()
        .with_stop_strategy(StopStrategyKind::ObjectiveDelta)
        .with_stop_threshold(1e-12)
        .with_max_iter(300);

    let mut pose = nearby_guess().to_array();
    let residual = estimate_pose(
        points.len(),
        &flatten_points(&points),
        &[center.x, center.y, center.z],
        &flatten(&bearings),
        &mut pose,
        &options,
    )
    .unwrap();

    let set = CorrespondenceSet::with_shared_center(points, center, bearings).unwrap();
    let structured = refine_pose(&set, &nearby_guess(), options.to_optimizer_config()).unwrap();

    assert_eq!(Pose::from_array(&pose), structured.parameters);
    assert_eq!(residual, structured.final_cost);
    assert!(pose_error(&structured.parameters, &true_pose()) < 1e-3);
}

#[test]
fn test_zero_iterations_return_initial_objective() {
    let set = scene();
    let guess = nearby_guess();

    let result = refine_pose(
        &set,
        &guess,
        tight_config(StopStrategy::gradient_norm(1e-7, 0)),
    )
    .unwrap();

    assert_eq!(result.parameters, guess);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.status, OptimizationStatus::MaxIterationsReached);
    assert_abs_diff_eq!(
        result.final_cost,
        BearingProblem::new(&set).cost_at(&guess),
        epsilon = 1e-15
    );
}

#[test]
fn test_single_iteration_returns_promptly() {
    let set = scene();

    for strategy in [
        StopStrategy::gradient_norm(1e-12, 1),
        StopStrategy::objective_delta(1e-12, 1),
    ] {
        let result = refine_pose(&set, &nearby_guess(), tight_config(strategy)).unwrap();

        assert!(result.iterations <= 1);
        assert!(result.final_cost <= result.initial_cost);
    }
}

#[test]
fn test_verbose_does_not_change_result() {
    let set = scene();
    let config = tight_config(StopStrategy::gradient_norm(1e-9, 200));

    let quiet = refine_pose(&set, &nearby_guess(), config.clone()).unwrap();
    let verbose = refine_pose(&set, &nearby_guess(), config.with_verbose(true)).unwrap();

    assert_eq!(quiet.parameters, verbose.parameters);
    assert_eq!(quiet.final_cost, verbose.final_cost);
    assert_eq!(quiet.iterations, verbose.iterations);
}

#[test]
fn test_penalty_outside_bounding_sphere() {
    // Landmarks end up 0.2 from their viewpoints, far outside the 7-unit sphere
    let truth = Pose::new(6.0, 5.0, 1.0, 0.3);
    let offsets = [
        Vector3::new(0.2, 0.0, 0.0),
        Vector3::new(0.0, 0.2, 0.0),
        Vector3::new(0.0, 0.0, 0.2),
        Vector3::new(-0.12, 0.12, -0.1),
        Vector3::new(0.1, -0.15, 0.08),
        Vector3::new(-0.1, -0.1, 0.14),
    ];

    let points = scene_points();
    let iso = truth.to_isometry();
    let centers: Vec<Point3<f64>> = points
        .iter()
        .zip(offsets.iter())
        .map(|(p, o)| iso * p - o)
        .collect();
    let set = CorrespondenceSet::new(points, centers, offsets.to_vec()).unwrap();
    let problem = BearingProblem::new(&set);

    let expected_penalty = truth.translation.norm() - 7.0;
    assert!(expected_penalty > 0.5);
    assert_abs_diff_eq!(problem.penalty(&truth), expected_penalty, epsilon = 1e-12);
    assert_abs_diff_eq!(problem.cost_at(&truth), expected_penalty, epsilon = 1e-6);

    let start = Pose::new(6.05, 4.95, 1.02, 0.31);
    let result = refine_pose(
        &set,
        &start,
        tight_config(StopStrategy::gradient_norm(1e-9, 500)),
    )
    .unwrap();

    assert!(result.final_cost <= problem.cost_at(&start));
    assert!(pose_error(&result.parameters, &truth) < 1e-2);
    assert_abs_diff_eq!(result.final_cost, expected_penalty, epsilon = 1e-2);
}

#[test]
fn test_penalty_is_zero_inside_bounding_sphere() {
    let set = scene();
    let problem = BearingProblem::new(&set);

    assert_eq!(problem.penalty(&true_pose()), 0.0);
    assert_eq!(problem.penalty(&Pose::new(7.0, 0.0, 0.0, 2.0)), 0.0);
    assert!(problem.penalty(&Pose::new(7.5, 0.0, 0.0, 0.0)) > 0.0);
}

#[test]
fn test_single_correspondence_started_at_solution() {
    let mut pose = [3.0, 0.0, 0.0, -FRAC_PI_2];

    let residual = estimate_pose(
        1,
        &[0.0, -1.0, 0.0],
        &[0.0, 0.0, 2.0],
        &[2.0, 0.0, -2.0],
        &mut pose,
        &EstimatorOptions::legacy(),
    )
    .unwrap();

    assert!(residual < 1e-3);
    let expected = [3.0, 0.0, 0.0, -FRAC_PI_2];
    for (actual, expected) in pose.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*actual, *expected, epsilon = 1e-2);
    }
}

#[test]
fn test_recovers_pose_from_ray_transforms() {
    let points = scene_points();
    let centers = scene_centers();
    let bearings = observe(&points, &centers, &true_pose());

    // Each ray looks down its local +x axis
    let rays: Vec<Isometry3<f64>> = centers
        .iter()
        .zip(&bearings)
        .map(|(c, b)| {
            Isometry3::from_parts(
                Translation3::from(c.coords),
                UnitQuaternion::rotation_between(&Vector3::x(), b).unwrap(),
            )
        })
        .collect();

    // Roll and pitch in the guess are ignored
    let guess = Isometry3::from_parts(
        Translation3::from(nearby_guess().translation),
        UnitQuaternion::from_euler_angles(0.3, -0.2, nearby_guess().rotz),
    );

    let result = refine_pose_from_rays(
        points,
        &rays,
        &guess,
        tight_config(StopStrategy::gradient_norm(1e-9, 500)),
    )
    .unwrap();

    let recovered = Pose::from_isometry(&result.parameters);
    assert!(result.final_cost < 1e-3);
    assert!(
        pose_error(&recovered, &true_pose()) < 1e-3,
        "recovered {recovered}"
    );
}
