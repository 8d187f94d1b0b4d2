//! Error types for the bearing-pose library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.
//!
//! Numerical degeneracy (zero-length bearings, non-converging problems) is never
//! reported here: it shows up in the returned residual and pose. Errors are reserved
//! for malformed input shapes and configuration.

use crate::{io::CorrespondenceIoError, optimizer::OptimizerError};
use thiserror::Error;

/// Main result type used throughout the bearing-pose library
pub type BearingPoseResult<T> = Result<T, BearingPoseError>;

/// Main error type for the bearing-pose library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BearingPoseError {
    /// Invalid input parameters (array lengths, correspondence counts)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Solver related errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// General computation errors
    #[error("Computation error: {0}")]
    Computation(String),

    /// IO related errors (file loading, parsing, etc.)
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BearingPoseError {
    fn from(err: std::io::Error) -> Self {
        BearingPoseError::Io(err.to_string())
    }
}

impl From<OptimizerError> for BearingPoseError {
    fn from(err: OptimizerError) -> Self {
        BearingPoseError::Solver(err.to_string())
    }
}

impl From<CorrespondenceIoError> for BearingPoseError {
    fn from(err: CorrespondenceIoError) -> Self {
        BearingPoseError::Io(err.to_string())
    }
}
