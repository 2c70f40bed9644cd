//! CSV tables written at stage boundaries.
//!
//! The canonical 2D table keeps a header row because its keypoint column is
//! variable-length. Object tables are headerless numeric rows:
//!
//! ```text
//! track_id, class_id, x, y, z, rx, ry, rz, c0x, c0y, c0z, .., c7z [, frame]
//! ```
//!
//! The trailing frame column exists only on camera-frame tables; it is
//! consumed by the alignment stage and absent from everything after it.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use nalgebra::{Vector2, Vector3};

use crate::detection::record::{BBox, ClassId, TrackId};
use crate::detection::select::CanonicalObservation;
use crate::error::PipelineError;
use crate::scene::object::{SceneObject, SceneTable, CORNER_COUNT};

/// Columns before the corner block in an object row.
const OBJECT_HEAD_COLS: usize = 8;
/// Object row width without and with the frame column.
const OBJECT_COLS: usize = OBJECT_HEAD_COLS + 3 * CORNER_COUNT;

/// Write the canonical per-track observations selected from a view.
///
/// Values keep full precision; this table can be read back to re-enter the
/// pipeline at the lifting stage.
pub fn write_canonical_csv(path: &Path, observations: &[CanonicalObservation]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record([
        "class_id",
        "cx",
        "cy",
        "w",
        "h",
        "keypoints",
        "track_id",
        "frame_number",
    ])?;
    for obs in observations {
        let keypoints = obs
            .keypoints
            .iter()
            .flat_map(|kp| [kp.x.to_string(), kp.y.to_string()])
            .collect::<Vec<_>>()
            .join(" ");
        wtr.write_record([
            obs.class.to_string(),
            obs.bbox.cx.to_string(),
            obs.bbox.cy.to_string(),
            obs.bbox.w.to_string(),
            obs.bbox.h.to_string(),
            keypoints,
            obs.track.to_string(),
            obs.frame.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_canonical_csv(path: &Path) -> Result<Vec<CanonicalObservation>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut observations = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        if rec.len() != 8 {
            bail!(
                "Row {} of {} has {} columns, expected 8",
                i,
                path.display(),
                rec.len()
            );
        }
        let kp_fields: Vec<&str> = rec[5].split_whitespace().collect();
        if kp_fields.len() % 2 != 0 {
            bail!(
                "Row {} of {} has an odd number of keypoint values",
                i,
                path.display()
            );
        }
        let mut keypoints = Vec::with_capacity(kp_fields.len() / 2);
        for pair in kp_fields.chunks_exact(2) {
            keypoints.push(Vector2::new(pair[0].parse()?, pair[1].parse()?));
        }
        observations.push(CanonicalObservation {
            track: TrackId(rec[6].trim().parse()?),
            class: ClassId(rec[0].trim().parse()?),
            bbox: BBox {
                cx: rec[1].trim().parse()?,
                cy: rec[2].trim().parse()?,
                w: rec[3].trim().parse()?,
                h: rec[4].trim().parse()?,
            },
            keypoints,
            frame: rec[7].trim().parse()?,
        });
    }
    Ok(observations)
}

/// Write a 3D object table. Rows carry the frame column only while their
/// objects still have one.
pub fn write_objects_csv(path: &Path, objects: &[SceneObject]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for obj in objects {
        let mut row = Vec::with_capacity(OBJECT_COLS + 1);
        row.push(obj.id.to_string());
        row.push(obj.class.to_string());
        for v in [obj.position, obj.rotation_deg]
            .iter()
            .flat_map(|v| [v.x, v.y, v.z])
        {
            row.push(format!("{v:.4}"));
        }
        for v in obj.corners.iter().flat_map(|c| [c.x, c.y, c.z]) {
            row.push(format!("{v:.4}"));
        }
        if let Some(frame) = obj.frame {
            row.push(frame.to_string());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a 3D object table back from disk.
///
/// Ids must be unique within one table; a duplicate row makes every id-keyed
/// operation downstream ambiguous and aborts the read.
pub fn read_objects_csv(path: &Path) -> Result<Vec<SceneObject>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut seen = BTreeSet::new();
    let mut objects = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        if rec.len() != OBJECT_COLS && rec.len() != OBJECT_COLS + 1 {
            bail!(
                "Row {} of {} has {} columns, expected {} or {}",
                i,
                path.display(),
                rec.len(),
                OBJECT_COLS,
                OBJECT_COLS + 1
            );
        }
        let value = |j: usize| -> Result<f64> {
            rec[j].trim().parse().with_context(|| {
                format!("Failed to parse row {}, column {} of {}", i, j, path.display())
            })
        };

        let mut corners = [Vector3::zeros(); CORNER_COUNT];
        for (c, corner) in corners.iter_mut().enumerate() {
            let base = OBJECT_HEAD_COLS + 3 * c;
            *corner = Vector3::new(value(base)?, value(base + 1)?, value(base + 2)?);
        }
        let frame = if rec.len() == OBJECT_COLS + 1 {
            Some(rec[OBJECT_COLS].trim().parse().with_context(|| {
                format!("Failed to parse frame number in row {} of {}", i, path.display())
            })?)
        } else {
            None
        };

        let id = TrackId(rec[0].trim().parse()?);
        if !seen.insert(id) {
            return Err(PipelineError::DuplicateObjectId { id }.into());
        }
        objects.push(SceneObject {
            id,
            class: ClassId(rec[1].trim().parse()?),
            position: Vector3::new(value(2)?, value(3)?, value(4)?),
            rotation_deg: Vector3::new(value(5)?, value(6)?, value(7)?),
            corners,
            frame,
        });
    }
    Ok(objects)
}

/// Read an objects/vertices file pair back into a scene table, the form the
/// merger consumes.
pub fn read_scene_table(objects: &Path, vertices: &Path) -> Result<SceneTable> {
    Ok(SceneTable {
        objects: read_objects_csv(objects)?,
        vertices: read_objects_csv(vertices)?,
    })
}
