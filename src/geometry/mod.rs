//! Point and bearing geometry
//!
//! Points and directions are nalgebra's `Point3<f64>` and `Vector3<f64>`. The only
//! rigid motions used here are a rotation about the +z axis followed by a
//! translation, which is what [`make_transform`] builds.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

pub mod pose;

pub use pose::Pose;

/// Build the rigid transform `p' = Rz(rotz) * p + t`.
///
/// The rotation is applied first, then the translation `(tx, ty, tz)`.
///
/// # Arguments
/// * `tx`, `ty`, `tz` - Translation components
/// * `rotz` - Rotation about +z in radians (counter-clockwise seen from above)
pub fn make_transform(tx: f64, ty: f64, tz: f64, rotz: f64) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(tx, ty, tz),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), rotz),
    )
}

/// Apply `transform` to every point, preserving order and count.
pub fn transform_points(points: &[Point3<f64>], transform: &Isometry3<f64>) -> Vec<Point3<f64>> {
    points.iter().map(|p| transform * p).collect()
}

/// Angle in radians, in `[0, π]`, between two directions.
///
/// Both vectors are normalized first and the dot product is clamped to `[-1, 1]`
/// before `acos`. A zero-length input produces NaN.
pub fn angle_between(v1: &Vector3<f64>, v2: &Vector3<f64>) -> f64 {
    let v1_u = v1 / v1.norm();
    let v2_u = v2 / v2.norm();

    v1_u.dot(&v2_u).clamp(-1.0, 1.0).acos()
}
