//! Rerun export of a reconstructed scene.
//!
//! Entity hierarchy:
//!     world/
//!         objects/<id>          - Estimated cuboid (colored by class)
//!         objects/<id>/corners  - The 8 predicted corner points
//!         vertices              - Structural vertex markers (white)
//!
//! The recording is saved to an .rrd file rather than streamed to a live
//! viewer; the pipeline is batch, so there is nothing to watch in real time.

use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::Vector3;

use crate::scene::object::{SceneTable, CORNER_COUNT};

/// One color per class, cycled.
const PALETTE: [[u8; 3]; 6] = [
    [230, 126, 34],
    [52, 152, 219],
    [46, 204, 113],
    [155, 89, 182],
    [241, 196, 15],
    [26, 188, 156],
];

/// Write the merged scene to an .rrd file for offline inspection.
pub fn export_scene(path: &Path, scene: &SceneTable) -> Result<()> {
    let rec = rerun::RecordingStreamBuilder::new("scene-lift")
        .save(path)
        .with_context(|| format!("Failed to create scene export {}", path.display()))?;

    // The world frame is Y-up with X to the right.
    rec.log_static("world", &rerun::ViewCoordinates::RUB())?;

    for obj in &scene.objects {
        let color = PALETTE[obj.class.0 as usize % PALETTE.len()];
        let center = [
            obj.position.x as f32,
            obj.position.y as f32,
            obj.position.z as f32,
        ];

        rec.log(
            format!("world/objects/{}", obj.id).as_str(),
            &rerun::Boxes3D::from_centers_and_sizes([center], [corner_extent(&obj.corners)])
                .with_colors([color]),
        )?;

        let pts: Vec<[f32; 3]> = obj
            .corners
            .iter()
            .map(|c| [c.x as f32, c.y as f32, c.z as f32])
            .collect();
        rec.log(
            format!("world/objects/{}/corners", obj.id).as_str(),
            &rerun::Points3D::new(pts)
                .with_colors([color])
                .with_radii([0.03f32]),
        )?;
    }

    if !scene.vertices.is_empty() {
        let pts: Vec<[f32; 3]> = scene
            .vertices
            .iter()
            .map(|v| [v.position.x as f32, v.position.y as f32, v.position.z as f32])
            .collect();
        rec.log(
            "world/vertices",
            &rerun::Points3D::new(pts)
                .with_colors([[255u8, 255, 255]]) // White
                .with_radii([0.05f32]),
        )?;
    }

    rec.flush_blocking();
    Ok(())
}

/// Axis-aligned extent of the corner block; a 0.1m cube when the corners
/// are degenerate so the object still shows up.
fn corner_extent(corners: &[Vector3<f64>; CORNER_COUNT]) -> [f32; 3] {
    let mut min = corners[0];
    let mut max = corners[0];
    for c in &corners[1..] {
        min = min.inf(c);
        max = max.sup(c);
    }
    let size = max - min;
    if size.norm() < 1e-9 {
        return [0.1, 0.1, 0.1];
    }
    [size.x as f32, size.y as f32, size.z as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_spans_the_corner_block() {
        let mut corners = [Vector3::zeros(); CORNER_COUNT];
        corners[0] = Vector3::new(-1.0, 0.0, 2.0);
        corners[5] = Vector3::new(3.0, 0.5, 4.0);
        assert_eq!(corner_extent(&corners), [4.0, 0.5, 4.0]);
    }

    #[test]
    fn degenerate_corners_fall_back_to_a_small_cube() {
        let corners = [Vector3::zeros(); CORNER_COUNT];
        assert_eq!(corner_extent(&corners), [0.1, 0.1, 0.1]);
    }
}
