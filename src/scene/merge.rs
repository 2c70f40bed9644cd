//! Cross-view fusion of two world-aligned scene tables.
//!
//! The first view is authoritative: its rows keep their identity and
//! ordering, fused rows inherit its id, and its vertex table passes through
//! untouched (both viewpoints observe the same static room geometry).
//! Matched pairs average positions and corners component-wise. Of the Euler
//! triple only the swing (vertical) axis is averaged; the other two axes
//! stay as the primary row estimated them.

use serde::Deserialize;

use crate::scene::object::{SceneObject, SceneTable};

/// How a primary object finds its counterpart in the secondary table.
///
/// Candidates must always lie within the distance threshold, and every
/// secondary row fuses at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Equal id and class. Ids are unique per view, so at most one candidate
    /// exists and the match is unambiguous.
    #[default]
    IdProximity,
    /// Equal class, first hit in table order. Intended for runs where track
    /// ids are not comparable across videos; with several same-class objects
    /// inside the threshold the winner depends on row order, a known
    /// limitation.
    ClassFirstFound,
    /// Equal class, smallest distance wins.
    ClassNearest,
}

impl MatchStrategy {
    /// Index of the secondary candidate for `object`, if any.
    fn find(
        &self,
        object: &SceneObject,
        secondary: &[SceneObject],
        claimed: &[bool],
        threshold: f64,
    ) -> Option<usize> {
        let mut nearest: Option<(usize, f64)> = None;
        for (i, candidate) in secondary.iter().enumerate() {
            if claimed[i] || candidate.class != object.class {
                continue;
            }
            if *self == MatchStrategy::IdProximity && candidate.id != object.id {
                continue;
            }
            let distance = (candidate.position - object.position).norm();
            if distance >= threshold {
                continue;
            }
            match self {
                MatchStrategy::IdProximity | MatchStrategy::ClassFirstFound => return Some(i),
                MatchStrategy::ClassNearest => {
                    if nearest.map_or(true, |(_, best)| distance < best) {
                        nearest = Some((i, distance));
                    }
                }
            }
        }
        nearest.map(|(i, _)| i)
    }
}

/// Merge stage settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Maximum 3D Euclidean distance between positions for two rows to fuse.
    pub distance_threshold: f64,
    pub strategy: MatchStrategy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            distance_threshold: 3.0,
            strategy: MatchStrategy::default(),
        }
    }
}

/// Index of the swing axis within the Euler triple (the vertical sweep axis).
const SWING_AXIS: usize = 1;

/// Fuse a matched pair. The primary row keeps id, class and the two
/// non-swing rotation axes.
fn fuse(primary: &SceneObject, secondary: &SceneObject) -> SceneObject {
    let mut fused = primary.clone();
    fused.position = (primary.position + secondary.position) / 2.0;
    fused.rotation_deg[SWING_AXIS] =
        (primary.rotation_deg[SWING_AXIS] + secondary.rotation_deg[SWING_AXIS]) / 2.0;
    for (i, corner) in fused.corners.iter_mut().enumerate() {
        *corner = (primary.corners[i] + secondary.corners[i]) / 2.0;
    }
    fused.frame = None;
    fused
}

/// Merge two single-view tables into one scene.
///
/// Every primary object either fuses with its secondary counterpart or
/// passes through unchanged; unmatched secondary objects are appended in
/// their table order. Vertices come from the primary view alone.
pub fn merge_scenes(
    primary: &SceneTable,
    secondary: &SceneTable,
    options: &MergeOptions,
) -> SceneTable {
    let mut claimed = vec![false; secondary.objects.len()];
    let mut objects = Vec::with_capacity(primary.objects.len());

    for obj in &primary.objects {
        match options.strategy.find(
            obj,
            &secondary.objects,
            &claimed,
            options.distance_threshold,
        ) {
            Some(i) => {
                claimed[i] = true;
                objects.push(fuse(obj, &secondary.objects[i]));
            }
            None => objects.push(obj.clone()),
        }
    }

    for (i, obj) in secondary.objects.iter().enumerate() {
        if !claimed[i] {
            objects.push(obj.clone());
        }
    }

    SceneTable {
        objects,
        vertices: primary.vertices.clone(),
    }
}
