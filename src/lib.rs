//! Pose estimation from 3D landmarks and observed bearings.
//!
//! Given landmarks, the viewpoints they were observed from and the observed
//! bearing directions, find the translation and yaw that best align predicted
//! and observed bearings. The objective is the mean angle between them, bounded
//! by a soft penalty on large translations, and it is minimized with BFGS using
//! numerical derivatives.

pub mod boundary;
pub mod core;
pub mod error;
pub mod geometry;
pub mod io;
pub mod logger;
pub mod optimizer;

pub use boundary::{EstimatorOptions, StopStrategyKind, estimate_pose};
pub use core::{BearingProblem, CorrespondenceSet, refine_pose, refine_pose_from_rays};
pub use error::{BearingPoseError, BearingPoseResult};
pub use geometry::Pose;
pub use io::{load_correspondences, parse_correspondences};
pub use logger::{init_logger, init_logger_with_level};
pub use optimizer::{Bfgs, OptimizationStatus, OptimizerConfig, Solver, SolverResult, StopStrategy};
