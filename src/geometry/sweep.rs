//! Zero-degree alignment of estimates made under a swept camera.
//!
//! The capture camera rotates about the vertical axis from `start_deg` to
//! `end_deg` linearly over the video. An object lifted at frame `f` was seen
//! from orientation `angle_at(f)`; rotating its estimate by the opposite
//! angle puts every object into the camera's reference (zero-degree) frame.

use crate::error::PipelineError;
use crate::geometry::euler::{euler_deg_from_rotation, rotation_from_euler_deg, yaw_rotation_deg};
use crate::scene::object::SceneObject;

/// Linear camera sweep: angle as a function of frame index.
#[derive(Debug, Clone, Copy)]
pub struct SweepPlan {
    start_deg: f64,
    end_deg: f64,
    num_frames: u32,
}

impl SweepPlan {
    /// Build a sweep plan for a view.
    ///
    /// Zero frames means the video is unusable; one frame leaves the
    /// interpolation step undefined. Both abort the view's run.
    pub fn new(
        view: &str,
        start_deg: f64,
        end_deg: f64,
        num_frames: u32,
    ) -> Result<Self, PipelineError> {
        match num_frames {
            0 => Err(PipelineError::ZeroFrames {
                view: view.to_string(),
            }),
            1 => Err(PipelineError::SingleFrame {
                view: view.to_string(),
            }),
            _ => Ok(Self {
                start_deg,
                end_deg,
                num_frames,
            }),
        }
    }

    /// Camera angle in degrees at the given frame.
    ///
    /// `angle(f) = start + sign(end − start) · f · |end − start| / (n − 1)`;
    /// for `start == end` the magnitude term is zero, so the sign convention
    /// of `f64::signum` cannot leak into the result.
    pub fn angle_at(&self, frame: u32) -> f64 {
        let span = self.end_deg - self.start_deg;
        let step = span.abs() / (self.num_frames - 1) as f64;
        self.start_deg + span.signum() * frame as f64 * step
    }
}

/// Rotate every object back to the zero-degree camera orientation.
///
/// Positions and corners get the inverse sweep rotation; object orientation
/// is composed with it as a matrix product, not by angle subtraction. The
/// source frame number is consumed here and cleared from the record.
pub fn align_to_reference(
    objects: Vec<SceneObject>,
    sweep: &SweepPlan,
) -> Result<Vec<SceneObject>, PipelineError> {
    let mut out = Vec::with_capacity(objects.len());
    for mut obj in objects {
        let frame = obj
            .frame
            .take()
            .ok_or(PipelineError::MissingFrameNumber { id: obj.id })?;

        let undo = yaw_rotation_deg(-sweep.angle_at(frame));
        obj.position = undo * obj.position;
        for corner in obj.corners.iter_mut() {
            *corner = undo * *corner;
        }
        let composed = undo * rotation_from_euler_deg(&obj.rotation_deg);
        obj.rotation_deg = euler_deg_from_rotation(&composed);

        out.push(obj);
    }
    Ok(out)
}
