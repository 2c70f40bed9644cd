//! Camera-relative to world-origin transformation.
//!
//! The camera's pose is known in world coordinates. Each zero-degree-frame
//! estimate is translated by the camera position, rotated by the inverse
//! camera rotation, and then its x coordinate is reflected about the
//! camera's own x (`x' = 2·cam_x − x`). The reflection fixes the handedness
//! mismatch between the camera's forward-facing convention and the world
//! frame and applies to position only.
//!
//! Corners pass through untouched by default, mirroring the behavior of the
//! capture rig this pipeline was built against; `transform_corners` runs the
//! full position chain on them instead.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::error::PipelineError;
use crate::geometry::euler::{euler_deg_from_rotation, rotation_from_euler_deg};
use crate::scene::object::SceneObject;

/// Known world pose of a capture camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vector3<f64>,
    /// Extrinsic x-y-z Euler angles, degrees.
    pub rotation_deg: Vector3<f64>,
}

impl CameraPose {
    pub fn new(position: Vector3<f64>, rotation_deg: Vector3<f64>) -> Self {
        Self {
            position,
            rotation_deg,
        }
    }

    /// Inverse of the camera rotation matrix.
    ///
    /// Euler angles always build an orthogonal matrix, so the only way to
    /// land here is a non-finite configuration; that is a fatal setup error,
    /// not a numeric edge to paper over.
    fn inverse_rotation(&self) -> Result<Matrix3<f64>, PipelineError> {
        let singular = || PipelineError::SingularCameraRotation {
            rotation_deg: self.rotation_deg.into(),
        };
        if !self.rotation_deg.iter().all(|a| a.is_finite()) {
            return Err(singular());
        }
        rotation_from_euler_deg(&self.rotation_deg)
            .into_inner()
            .try_inverse()
            .ok_or_else(singular)
    }
}

/// Map zero-degree-frame objects into world coordinates.
pub fn to_world(
    objects: Vec<SceneObject>,
    camera: &CameraPose,
    transform_corners: bool,
) -> Result<Vec<SceneObject>, PipelineError> {
    let inverse = camera.inverse_rotation()?;

    let mut out = Vec::with_capacity(objects.len());
    for mut obj in objects {
        obj.position = reflect_x(
            inverse * (obj.position - camera.position),
            camera.position.x,
        );

        if transform_corners {
            for corner in obj.corners.iter_mut() {
                *corner = reflect_x(inverse * (*corner - camera.position), camera.position.x);
            }
        }

        // The object's own orientation gets the inverse camera rotation and
        // no reflection.
        let rotated = Rotation3::from_matrix_unchecked(
            inverse * rotation_from_euler_deg(&obj.rotation_deg).into_inner(),
        );
        obj.rotation_deg = euler_deg_from_rotation(&rotated);

        out.push(obj);
    }
    Ok(out)
}

/// Mirror the x coordinate about the camera's x plane.
fn reflect_x(mut p: Vector3<f64>, cam_x: f64) -> Vector3<f64> {
    p.x = 2.0 * cam_x - p.x;
    p
}
