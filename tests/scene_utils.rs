//! Shared utilities for pose estimation integration tests
//!
//! Scenes are deterministic: landmarks and viewpoints are fixed by hand and
//! bearings are generated exactly from a known pose, so the true pose has zero
//! angular error.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use bearing_pose::core::CorrespondenceSet;
use bearing_pose::geometry::Pose;
use nalgebra::{Point3, Vector3};

/// Pose used to generate the default scene.
pub fn true_pose() -> Pose {
    Pose::new(1.5, -0.8, 0.4, 0.6)
}

/// Initial guess a short distance from [`true_pose`].
pub fn nearby_guess() -> Pose {
    Pose::new(1.2, -0.5, 0.2, 0.35)
}

/// Six landmarks spread around the origin at different heights
pub fn scene_points() -> Vec<Point3<f64>> {
    vec![
        Point3::new(4.0, 1.0, 0.5),
        Point3::new(-2.0, 3.0, 1.0),
        Point3::new(1.0, -4.0, -0.5),
        Point3::new(3.0, 2.5, 2.0),
        Point3::new(-3.5, -1.0, -1.5),
        Point3::new(0.5, 0.5, 3.0),
    ]
}

/// One viewpoint center per landmark
pub fn scene_centers() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 1.5),
        Point3::new(0.5, 0.0, 1.5),
        Point3::new(-0.5, 0.5, 1.2),
        Point3::new(0.0, 0.0, 1.5),
        Point3::new(1.0, -1.0, 0.8),
        Point3::new(0.0, 0.5, 1.5),
    ]
}

/// Exact bearings from `centers[i]` to `points[i]` moved by `pose`.
///
/// Bearings are deliberately left unnormalized with varying lengths.
pub fn observe(points: &[Point3<f64>], centers: &[Point3<f64>], pose: &Pose) -> Vec<Vector3<f64>> {
    let iso = pose.to_isometry();
    points
        .iter()
        .zip(centers)
        .enumerate()
        .map(|(i, (p, c))| (iso * p - c) * (1.0 + 0.5 * i as f64))
        .collect()
}

/// Default scene observed from [`true_pose`].
pub fn scene() -> CorrespondenceSet {
    scene_with_pose(&true_pose())
}

pub fn scene_with_pose(pose: &Pose) -> CorrespondenceSet {
    let points = scene_points();
    let centers = scene_centers();
    let bearings = observe(&points, &centers, pose);
    CorrespondenceSet::new(points, centers, bearings).unwrap()
}

/// Flatten points or vectors into the packed `[x0, y0, z0, x1, ...]` layout.
pub fn flatten<'a, I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Vector3<f64>>,
{
    values.into_iter().flat_map(|v| [v.x, v.y, v.z]).collect()
}

pub fn flatten_points(points: &[Point3<f64>]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}

/// Largest absolute component difference between two poses
pub fn pose_error(actual: &Pose, expected: &Pose) -> f64 {
    actual
        .to_array()
        .iter()
        .zip(expected.to_array().iter())
        .map(|(a, e)| (a - e).abs())
        .fold(0.0, f64::max)
}
