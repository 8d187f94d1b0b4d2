//! Angular residual model
//!
//! For correspondence `i`, the landmark `points[i]` is moved by the candidate pose
//! and the predicted bearing is `transformed - centers[i]`. The residual is the
//! angle between that and the observed bearing. [`BearingProblem`] turns the
//! per-correspondence angles into one scalar: their mean plus a soft penalty on
//! translations leaving a sphere of radius [`DEFAULT_BOUND_RADIUS`].

use crate::core::Objective;
use crate::error::{BearingPoseError, BearingPoseResult};
use crate::geometry::{Pose, angle_between, transform_points};
use nalgebra::{DVector, Isometry3, Point3, Vector3};

/// Translation norm beyond which the bounding penalty grows linearly.
pub const DEFAULT_BOUND_RADIUS: f64 = 7.0;

/// Landmarks, viewpoint centers and observed bearings, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceSet {
    points: Vec<Point3<f64>>,
    centers: Vec<Point3<f64>>,
    bearings: Vec<Vector3<f64>>,
}

impl CorrespondenceSet {
    /// One viewpoint center per correspondence.
    ///
    /// # Errors
    /// `InvalidInput` if the set is empty or the three sequences differ in length.
    pub fn new(
        points: Vec<Point3<f64>>,
        centers: Vec<Point3<f64>>,
        bearings: Vec<Vector3<f64>>,
    ) -> BearingPoseResult<Self> {
        if points.is_empty() {
            return Err(BearingPoseError::InvalidInput(
                "at least one correspondence is required".to_string(),
            ));
        }
        if centers.len() != points.len() || bearings.len() != points.len() {
            return Err(BearingPoseError::InvalidInput(format!(
                "mismatched correspondence lengths: {} points, {} centers, {} bearings",
                points.len(),
                centers.len(),
                bearings.len()
            )));
        }

        Ok(Self {
            points,
            centers,
            bearings,
        })
    }

    /// All bearings observed from the same center.
    pub fn with_shared_center(
        points: Vec<Point3<f64>>,
        center: Point3<f64>,
        bearings: Vec<Vector3<f64>>,
    ) -> BearingPoseResult<Self> {
        let centers = vec![center; points.len()];
        Self::new(points, centers, bearings)
    }

    /// Bearings observed from the origin.
    pub fn centered_at_origin(
        points: Vec<Point3<f64>>,
        bearings: Vec<Vector3<f64>>,
    ) -> BearingPoseResult<Self> {
        Self::with_shared_center(points, Point3::origin(), bearings)
    }

    /// Landmarks observed along rays given as rigid transforms.
    ///
    /// Each ray starts at its transform's origin and points along its local +x
    /// axis, so the center is the translation and the bearing is `rotation * x`.
    pub fn from_rays(points: Vec<Point3<f64>>, rays: &[Isometry3<f64>]) -> BearingPoseResult<Self> {
        let centers = rays
            .iter()
            .map(|ray| Point3::from(ray.translation.vector))
            .collect();
        let bearings = rays.iter().map(|ray| ray.rotation * Vector3::x()).collect();
        Self::new(points, centers, bearings)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn centers(&self) -> &[Point3<f64>] {
        &self.centers
    }

    pub fn bearings(&self) -> &[Vector3<f64>] {
        &self.bearings
    }
}

/// Per-correspondence angular errors, in radians, for `pose`.
pub fn error_function(correspondences: &CorrespondenceSet, pose: &Pose) -> Vec<f64> {
    let transformed = transform_points(correspondences.points(), &pose.to_isometry());

    transformed
        .iter()
        .zip(correspondences.centers())
        .zip(correspondences.bearings())
        .map(|((point, center), bearing)| angle_between(bearing, &(point - center)))
        .collect()
}

/// Mean angular error plus `max(0, ||t|| - radius)`.
#[derive(Debug, Clone)]
pub struct BearingProblem<'a> {
    correspondences: &'a CorrespondenceSet,
    bound_radius: f64,
}

impl<'a> BearingProblem<'a> {
    pub fn new(correspondences: &'a CorrespondenceSet) -> Self {
        Self {
            correspondences,
            bound_radius: DEFAULT_BOUND_RADIUS,
        }
    }

    /// Override the radius of the penalty-free sphere.
    pub fn with_bound_radius(mut self, bound_radius: f64) -> Self {
        self.bound_radius = bound_radius;
        self
    }

    pub fn correspondences(&self) -> &CorrespondenceSet {
        self.correspondences
    }

    pub fn bound_radius(&self) -> f64 {
        self.bound_radius
    }

    pub fn mean_error(&self, pose: &Pose) -> f64 {
        let errors = error_function(self.correspondences, pose);
        errors.iter().sum::<f64>() / errors.len() as f64
    }

    /// Zero inside the sphere, linear outside.
    pub fn penalty(&self, pose: &Pose) -> f64 {
        (pose.translation.norm() - self.bound_radius).max(0.0)
    }

    pub fn cost_at(&self, pose: &Pose) -> f64 {
        self.mean_error(pose) + self.penalty(pose)
    }
}

impl Objective for BearingProblem<'_> {
    fn parameter_count(&self) -> usize {
        4
    }

    fn cost(&self, parameters: &DVector<f64>) -> f64 {
        match Pose::from_slice(parameters.as_slice()) {
            Some(pose) => self.cost_at(&pose),
            None => f64::NAN,
        }
    }
}
