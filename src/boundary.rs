//! Flat-array entry points
//!
//! These functions take the packed `f64` layouts used by foreign callers: `N`
//! points as `3N` values `[x0, y0, z0, x1, ...]`, a pose as `[tx, ty, tz, rotz]`.
//! Viewpoint centers may be given once (3 values, shared by all correspondences)
//! or per correspondence (`3N` values). Shapes are checked before anything is
//! decoded; numerical degeneracy is reported through NaN results instead.

use crate::core::{self, CorrespondenceSet};
use crate::error::{BearingPoseError, BearingPoseResult};
use crate::geometry::{self, Pose};
use crate::optimizer::{OptimizerConfig, StopStrategy};
use nalgebra::{Point3, Vector3};
use tracing::info;

/// Stop threshold used when [`EstimatorOptions::stop_threshold`] is 0.
pub const DEFAULT_STOP_THRESHOLD: f64 = 1e-7;

/// Convergence criterion selector for [`EstimatorOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopStrategyKind {
    /// Stop on a small gradient norm
    #[default]
    GradientNorm,
    /// Stop on a small change of the objective between iterations
    ObjectiveDelta,
}

/// Options accepted by [`estimate_pose`].
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorOptions {
    /// Trace inputs, iterations and the resulting pose
    pub verbose: bool,
    /// Which convergence test to run
    pub stop_strategy: StopStrategyKind,
    /// Threshold for the convergence test; 0 selects [`DEFAULT_STOP_THRESHOLD`]
    pub stop_threshold: f64,
    /// Iteration budget; 0 leaves the pose untouched
    pub max_iter: usize,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            stop_strategy: StopStrategyKind::GradientNorm,
            stop_threshold: 0.0,
            max_iter: 100,
        }
    }
}

impl EstimatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gradient norm below 1e-5, at most 100 iterations.
    pub fn legacy() -> Self {
        Self {
            stop_threshold: 1e-5,
            ..Self::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_stop_strategy(mut self, stop_strategy: StopStrategyKind) -> Self {
        self.stop_strategy = stop_strategy;
        self
    }

    pub fn with_stop_threshold(mut self, stop_threshold: f64) -> Self {
        self.stop_threshold = stop_threshold;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Threshold actually used, with 0 mapped to the default.
    pub fn effective_threshold(&self) -> f64 {
        if self.stop_threshold == 0.0 {
            DEFAULT_STOP_THRESHOLD
        } else {
            self.stop_threshold
        }
    }

    pub fn to_stop_strategy(&self) -> StopStrategy {
        let threshold = self.effective_threshold();
        match self.stop_strategy {
            StopStrategyKind::GradientNorm => StopStrategy::gradient_norm(threshold, self.max_iter),
            StopStrategyKind::ObjectiveDelta => {
                StopStrategy::objective_delta(threshold, self.max_iter)
            }
        }
    }

    pub fn to_optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig::new()
            .with_stop_strategy(self.to_stop_strategy())
            .with_verbose(self.verbose)
    }
}

fn expected_len(count: usize) -> BearingPoseResult<usize> {
    count.checked_mul(3).ok_or_else(|| {
        BearingPoseError::InvalidInput(format!("correspondence count {count} is too large"))
    })
}

fn decode_vectors(name: &str, data: &[f64], count: usize) -> BearingPoseResult<Vec<Vector3<f64>>> {
    let expected = expected_len(count)?;
    if data.len() != expected {
        return Err(BearingPoseError::InvalidInput(format!(
            "{name}: expected {expected} values for {count} correspondences, got {}",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(3)
        .map(|c| Vector3::new(c[0], c[1], c[2]))
        .collect())
}

fn decode_points(name: &str, data: &[f64], count: usize) -> BearingPoseResult<Vec<Point3<f64>>> {
    Ok(decode_vectors(name, data, count)?
        .into_iter()
        .map(Point3::from)
        .collect())
}

fn decode_centers(centers: &[f64], count: usize) -> BearingPoseResult<Vec<Point3<f64>>> {
    if centers.len() == 3 {
        return Ok(vec![Point3::new(centers[0], centers[1], centers[2]); count]);
    }
    decode_points("centers", centers, count).map_err(|_| {
        BearingPoseError::InvalidInput(format!(
            "centers: expected 3 or {} values, got {}",
            count.saturating_mul(3),
            centers.len()
        ))
    })
}

fn decode_correspondences(
    count: usize,
    points: &[f64],
    centers: &[f64],
    bearings: &[f64],
) -> BearingPoseResult<CorrespondenceSet> {
    if count == 0 {
        return Err(BearingPoseError::InvalidInput(
            "at least one correspondence is required".to_string(),
        ));
    }

    CorrespondenceSet::new(
        decode_points("points", points, count)?,
        decode_centers(centers, count)?,
        decode_vectors("bearings", bearings, count)?,
    )
}

/// Refine `pose` in place and return the final objective value.
///
/// The objective is the mean angular error between observed and predicted
/// bearings plus the translation bounding penalty. A run that fails to converge
/// still writes its last pose; a NaN residual signals numerical failure.
///
/// # Errors
/// `InvalidInput` for `count == 0` or mismatched array lengths, `Solver` for
/// unusable options (a negative threshold, for instance).
pub fn estimate_pose(
    count: usize,
    points: &[f64],
    centers: &[f64],
    bearings: &[f64],
    pose: &mut [f64; 4],
    options: &EstimatorOptions,
) -> BearingPoseResult<f64> {
    let correspondences = decode_correspondences(count, points, centers, bearings)?;
    let initial = Pose::from_array(pose);

    if options.verbose {
        info!(
            "estimating pose from {} correspondences, initial guess {}",
            count, initial
        );
        for (i, ((p, c), b)) in correspondences
            .points()
            .iter()
            .zip(correspondences.centers())
            .zip(correspondences.bearings())
            .enumerate()
        {
            info!(
                "  [{}] point ({}, {}, {})  center ({}, {}, {})  bearing ({}, {}, {})",
                i, p.x, p.y, p.z, c.x, c.y, c.z, b.x, b.y, b.z
            );
        }
    }

    let result = core::refine_pose(&correspondences, &initial, options.to_optimizer_config())?;
    *pose = result.parameters.to_array();

    if options.verbose {
        info!(
            "new pose: {}  residual: {:.9e}  ({})",
            result.parameters, result.final_cost, result.status
        );
    }

    Ok(result.final_cost)
}

/// Angle in radians between two packed vectors.
pub fn angle_between(v1: &[f64; 3], v2: &[f64; 3]) -> f64 {
    geometry::angle_between(&Vector3::from(*v1), &Vector3::from(*v2))
}

/// Transform `count` packed points by `pose` into `output`.
pub fn transform_points(
    count: usize,
    points: &[f64],
    pose: &[f64; 4],
    output: &mut [f64],
) -> BearingPoseResult<()> {
    let decoded = decode_points("points", points, count)?;
    let expected = expected_len(count)?;
    if output.len() != expected {
        return Err(BearingPoseError::InvalidInput(format!(
            "output: expected {expected} values, got {}",
            output.len()
        )));
    }

    let transformed = geometry::transform_points(&decoded, &Pose::from_array(pose).to_isometry());
    for (slot, p) in output.chunks_exact_mut(3).zip(&transformed) {
        slot.copy_from_slice(p.coords.as_slice());
    }
    Ok(())
}

/// Per-correspondence angular errors at `pose`, written into `errors`.
pub fn error_function(
    count: usize,
    points: &[f64],
    centers: &[f64],
    bearings: &[f64],
    pose: &[f64; 4],
    errors: &mut [f64],
) -> BearingPoseResult<()> {
    let correspondences = decode_correspondences(count, points, centers, bearings)?;
    if errors.len() != count {
        return Err(BearingPoseError::InvalidInput(format!(
            "errors: expected {count} values, got {}",
            errors.len()
        )));
    }

    let values = core::error_function(&correspondences, &Pose::from_array(pose));
    errors.copy_from_slice(&values);
    Ok(())
}
