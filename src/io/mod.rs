//! Correspondence file loading
//!
//! One correspondence per line, nine whitespace-separated numbers:
//!
//! ```text
//! # px py pz   cx cy cz   bx by bz
//! 1.0 0.0 0.0  0.0 0.0 2.0  2.0 0.0 -2.0
//! ```
//!
//! `(px, py, pz)` is the landmark, `(cx, cy, cz)` the viewpoint center and
//! `(bx, by, bz)` the observed bearing. Blank lines and everything after `#` are
//! ignored.

use crate::core::CorrespondenceSet;
use memmap2::Mmap;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const FIELDS_PER_LINE: usize = 9;

/// Errors that can occur while reading a correspondence file
#[derive(Error, Debug)]
pub enum CorrespondenceIoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid UTF-8 in correspondence file: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Missing required fields at line {line}: expected 9, found {found}")]
    MissingFields { line: usize, found: usize },

    #[error("Unexpected extra fields at line {line}: expected 9, found {found}")]
    ExtraFields { line: usize, found: usize },

    #[error("Invalid number format at line {line}: {value}")]
    InvalidNumber { line: usize, value: String },

    #[error("No correspondences found")]
    Empty,

    #[error("Invalid correspondence set: {0}")]
    Invalid(String),
}

/// Read and parse a correspondence file.
pub fn load_correspondences<P: AsRef<Path>>(
    path: P,
) -> Result<CorrespondenceSet, CorrespondenceIoError> {
    let path = path.as_ref();
    let file = File::open(path)?;

    // Zero-length files cannot be mapped
    if file.metadata()?.len() == 0 {
        return Err(CorrespondenceIoError::Empty);
    }

    let mmap = unsafe { Mmap::map(&file)? };
    let content = std::str::from_utf8(&mmap)?;

    let set = parse_correspondences(content)?;
    debug!(
        "loaded {} correspondences from {}",
        set.len(),
        path.display()
    );
    Ok(set)
}

/// Parse correspondences from text in the file format.
pub fn parse_correspondences(content: &str) -> Result<CorrespondenceSet, CorrespondenceIoError> {
    let mut points = Vec::new();
    let mut centers = Vec::new();
    let mut bearings = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }

        let values = parse_line(line, index + 1)?;
        points.push(Point3::new(values[0], values[1], values[2]));
        centers.push(Point3::new(values[3], values[4], values[5]));
        bearings.push(Vector3::new(values[6], values[7], values[8]));
    }

    if points.is_empty() {
        return Err(CorrespondenceIoError::Empty);
    }

    CorrespondenceSet::new(points, centers, bearings)
        .map_err(|e| CorrespondenceIoError::Invalid(e.to_string()))
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim(),
        None => line.trim(),
    }
}

fn parse_line(line: &str, line_num: usize) -> Result<[f64; FIELDS_PER_LINE], CorrespondenceIoError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() < FIELDS_PER_LINE {
        return Err(CorrespondenceIoError::MissingFields {
            line: line_num,
            found: parts.len(),
        });
    }
    if parts.len() > FIELDS_PER_LINE {
        return Err(CorrespondenceIoError::ExtraFields {
            line: line_num,
            found: parts.len(),
        });
    }

    let mut values = [0.0; FIELDS_PER_LINE];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse::<f64>()
            .map_err(|_| CorrespondenceIoError::InvalidNumber {
                line: line_num,
                value: part.to_string(),
            })?;
    }
    Ok(values)
}
