//! Euler-angle rotation helpers.
//!
//! All object and camera orientations are extrinsic x-y-z Euler angles in
//! degrees: the matrix composition is
//!
//! ```text
//! R = Rz(rz) · Ry(ry) · Rx(rx)
//! ```
//!
//! which is exactly what `Rotation3::from_euler_angles(roll, pitch, yaw)`
//! builds. The vertical (y) axis is the sweep axis: the capture camera
//! rotates about it, and it is the only axis the merger averages.

use nalgebra::{Rotation3, Vector3};

/// Build the rotation matrix for extrinsic x-y-z Euler angles in degrees.
pub fn rotation_from_euler_deg(euler_deg: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::from_euler_angles(
        euler_deg.x.to_radians(),
        euler_deg.y.to_radians(),
        euler_deg.z.to_radians(),
    )
}

/// Recover extrinsic x-y-z Euler angles in degrees.
///
/// The triple is one of the equivalent decompositions of the matrix; callers
/// comparing orientations should compare matrices, not triples.
pub fn euler_deg_from_rotation(rotation: &Rotation3<f64>) -> Vector3<f64> {
    let (roll, pitch, yaw) = rotation.euler_angles();
    Vector3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
}

/// Rotation about the vertical (up) axis by `angle_deg`.
pub fn yaw_rotation_deg(angle_deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), angle_deg.to_radians())
}
