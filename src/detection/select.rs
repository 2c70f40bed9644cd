//! Single-object selection: one canonical 2D observation per track.
//!
//! Across all frames of a video, each track keeps exactly the sighting whose
//! bbox center lies closest to the horizontal frame center (the proxy for
//! minimal lens distortion and best viewing angle). Selection replaces only
//! on a strictly smaller offset, so ties keep the first-seen frame.

use std::collections::BTreeMap;

use nalgebra::Vector2;

use crate::detection::record::{BBox, ClassId, Detection, TrackId};
use crate::error::PipelineError;

/// The single best 2D sighting of one track across an entire video.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalObservation {
    pub track: TrackId,
    pub class: ClassId,
    pub bbox: BBox,
    pub keypoints: Vec<Vector2<f64>>,
    /// Frame the observation was taken from; reattached after lifting.
    pub frame: u32,
}

impl CanonicalObservation {
    fn from_detection(det: Detection) -> Self {
        Self {
            track: det.track,
            class: det.class,
            bbox: det.bbox,
            keypoints: det.keypoints,
            frame: det.frame,
        }
    }
}

/// Accumulator for the best-centered observation per track.
///
/// Folded over the detection stream; owns all selection state, so two folds
/// over the same stream produce identical tables.
#[derive(Debug, Clone, Default)]
pub struct CenterSelector {
    best: BTreeMap<TrackId, CanonicalObservation>,
}

impl CenterSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one detection into the accumulator.
    pub fn fold(mut self, det: Detection) -> Self {
        let closer = match self.best.get(&det.track) {
            Some(current) => det.bbox.center_offset() < current.bbox.center_offset(),
            None => true,
        };
        if closer {
            self.best
                .insert(det.track, CanonicalObservation::from_detection(det));
        }
        self
    }

    /// Number of distinct tracks seen so far.
    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    /// Finish the fold. An empty stream is fatal: nothing downstream can run.
    pub fn finish(self) -> Result<Vec<CanonicalObservation>, PipelineError> {
        if self.best.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        // BTreeMap order: the table is sorted by track id, so repeated runs
        // are byte-for-byte reproducible.
        Ok(self.best.into_values().collect())
    }
}

/// Collapse a normalized detection stream into canonical observations.
pub fn select_canonical(
    stream: impl IntoIterator<Item = Detection>,
) -> Result<Vec<CanonicalObservation>, PipelineError> {
    stream
        .into_iter()
        .fold(CenterSelector::new(), CenterSelector::fold)
        .finish()
}
