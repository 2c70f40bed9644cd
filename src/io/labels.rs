//! Label directory loader.
//!
//! A view's detections arrive as one whitespace-delimited text file per video
//! frame, named `<stem>_<frame>.txt`. Files are read in frame order so the
//! fallback centroid tracker sees frames the way the video played.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::detection::record::{parse_tracked_line, parse_untracked_line, Detection};
use crate::detection::CentroidTracker;

/// Where track identities come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Label lines carry a trailing track id from the upstream tracker.
    #[default]
    External,
    /// Label lines are bare detections; ids are assigned by bbox proximity
    /// across consecutive frames.
    Centroid,
}

/// Read every per-frame label file in `dir` into normalized detections.
///
/// Files whose names carry no trailing frame number are ignored with a
/// warning, as are individual records that fail normalization. An empty or
/// all-skipped directory yields no detections; the selection stage decides
/// whether that is fatal.
pub fn read_label_dir(
    dir: &Path,
    mode: TrackingMode,
    centroid_max_distance: f64,
) -> Result<Vec<Detection>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read label directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        match frame_from_path(&path) {
            Some(frame) => files.push((frame, path)),
            None => warn!(
                "Ignoring label file without a frame number: {}",
                path.display()
            ),
        }
    }
    files.sort();

    let mut tracker = CentroidTracker::new(centroid_max_distance);
    let mut detections = Vec::new();
    let mut skipped = 0usize;

    for (frame, path) in &files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read label file {}", path.display()))?;
        let lines = text.lines().filter(|l| !l.trim().is_empty());

        match mode {
            TrackingMode::External => {
                for line in lines {
                    match parse_tracked_line(*frame, line) {
                        Ok(det) => detections.push(det),
                        Err(reason) => {
                            warn!("Skipping record in {}: {}", path.display(), reason);
                            skipped += 1;
                        }
                    }
                }
            }
            TrackingMode::Centroid => {
                let mut untracked = Vec::new();
                for line in lines {
                    match parse_untracked_line(*frame, line) {
                        Ok(det) => untracked.push(det),
                        Err(reason) => {
                            warn!("Skipping record in {}: {}", path.display(), reason);
                            skipped += 1;
                        }
                    }
                }
                detections.extend(tracker.assign_frame(untracked));
            }
        }
    }

    info!(
        "Loaded {} detections from {} label files in {} ({} records skipped)",
        detections.len(),
        files.len(),
        dir.display(),
        skipped
    );
    Ok(detections)
}

/// Frame number from a `<stem>_<frame>.txt` path.
fn frame_from_path(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit('_').next()?.parse().ok()
}
