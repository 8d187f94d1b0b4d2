//! The 4-DOF pose `(tx, ty, tz, rotz)`.

use crate::geometry::make_transform;
use nalgebra::{DVector, Isometry3, UnitComplex, Vector3};
use std::fmt;

/// Translation plus a rotation about +z.
///
/// `rotz` is kept exactly as given; nothing in the crate wraps it implicitly.
/// Use [`Pose::normalized`] to bring it into `[-π, π]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vector3<f64>,
    pub rotz: f64,
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pose(tx: {:.4}, ty: {:.4}, tz: {:.4}, rotz: {:.4})",
            self.translation.x, self.translation.y, self.translation.z, self.rotz
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(tx: f64, ty: f64, tz: f64, rotz: f64) -> Self {
        Self {
            translation: Vector3::new(tx, ty, tz),
            rotz,
        }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn from_array(x: &[f64; 4]) -> Self {
        Self::new(x[0], x[1], x[2], x[3])
    }

    /// Returns `None` unless the slice holds exactly four values.
    pub fn from_slice(x: &[f64]) -> Option<Self> {
        match x {
            [tx, ty, tz, rotz] => Some(Self::new(*tx, *ty, *tz, *rotz)),
            _ => None,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.translation.x,
            self.translation.y,
            self.translation.z,
            self.rotz,
        ]
    }

    /// Parameter vector in the layout the optimizer works on.
    pub fn to_dvector(&self) -> DVector<f64> {
        DVector::from_row_slice(&self.to_array())
    }

    /// Keep the translation and yaw of a full rigid transform; roll and pitch are dropped.
    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self {
            translation: iso.translation.vector,
            rotz: iso.rotation.euler_angles().2,
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        make_transform(
            self.translation.x,
            self.translation.y,
            self.translation.z,
            self.rotz,
        )
    }

    /// Pose undoing this one: rotation `-rotz`, translation `-Rz(-rotz) * t`.
    pub fn inverse(&self) -> Self {
        let back = UnitComplex::new(-self.rotz);
        let xy = back.transform_vector(&self.translation.xy());
        Self::new(-xy.x, -xy.y, -self.translation.z, -self.rotz)
    }

    /// Same pose with `rotz` wrapped into `[-π, π]`.
    pub fn normalized(&self) -> Self {
        Self {
            translation: self.translation,
            rotz: UnitComplex::new(self.rotz).angle(),
        }
    }
}
