//! Error taxonomy for the localization pipeline.
//!
//! Two severities exist: `PipelineError` aborts the run (or one view's run),
//! while `SkipReason` drops a single record and lets the batch continue. Row
//! skips are logged where they happen so data loss stays observable.

use std::path::PathBuf;

use thiserror::Error;

use crate::detection::record::{ClassId, TrackId};

/// Fatal conditions: bad configuration or a broken row correspondence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The configured video has no frames at all.
    #[error("view '{view}' reports zero frames")]
    ZeroFrames { view: String },

    /// A single frame leaves the sweep interpolation undefined.
    #[error("view '{view}' has a single frame; sweep interpolation needs at least two")]
    SingleFrame { view: String },

    /// The configured camera rotation has no inverse (e.g. non-finite angles).
    #[error("camera rotation {rotation_deg:?} deg is not invertible")]
    SingularCameraRotation { rotation_deg: [f64; 3] },

    /// No valid tracked detections were found in the whole video.
    #[error("no tracked detections with valid ids in the input stream")]
    EmptyInput,

    /// The models directory contained no loadable per-class weight files.
    #[error("no lifting models found in {}", dir.display())]
    EmptyRegistry { dir: PathBuf },

    /// Every observed class missed the registry; nothing could be lifted.
    #[error("no lifting model matched any observed class")]
    NoLiftableObjects,

    /// A stage produced a row count that breaks the 1:1 correspondence.
    #[error("{stage}: {output} output rows for {input} input rows")]
    RowCountMismatch {
        stage: &'static str,
        input: usize,
        output: usize,
    },

    /// Two rows in one view claimed the same object id.
    #[error("duplicate object id {id} within one view")]
    DuplicateObjectId { id: TrackId },

    /// An object reached zero-degree alignment without its source frame.
    #[error("object {id} reached alignment without a frame number")]
    MissingFrameNumber { id: TrackId },

    /// Only one- and two-view runs are supported.
    #[error("{count} views configured, expected 1 or 2")]
    UnsupportedViewCount { count: usize },
}

/// Per-record conditions that drop the record and continue the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    /// The trailing track id field is not a non-negative integer.
    #[error("track id field '{field}' is not a non-negative integer")]
    InvalidTrackId { field: String },

    /// A numeric field failed to parse.
    #[error("malformed numeric field '{field}'")]
    MalformedField { field: String },

    /// The field count does not fit the bbox-plus-keypoint-triples layout.
    #[error("record has {count} fields, not a bbox plus whole keypoint triples")]
    BadFieldCount { count: usize },

    /// More keypoints than the fixed-width lifting vector can hold.
    #[error("{count} keypoints exceed the 8-point limit")]
    TooManyKeypoints { count: usize },

    /// No lifting model is registered for the record's class.
    #[error("no lifting model registered for class {class}")]
    UnknownClass { class: ClassId },
}
