//! Label records produced by the external detector/tracker, and the
//! normalizer that turns raw label lines into clean [`Detection`]s.
//!
//! A raw tracked line is whitespace-delimited:
//!
//! ```text
//! class_id cx cy w h [kp_x kp_y kp_conf]* total_conf track_id
//! ```
//!
//! Normalization keeps geometry and identity only: per-keypoint confidences
//! and the trailing total confidence are stripped. Records that cannot carry
//! an identity or do not fit the layout are skipped, never repaired.

use nalgebra::Vector2;

use crate::error::SkipReason;

/// Maximum number of 2D keypoints a record may carry.
pub const MAX_KEYPOINTS: usize = 8;

/// Identity assigned by the tracker, stable across frames for one physical
/// object. Carried through every stage unchanged; the join key for merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

impl TrackId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Detector class tag. A reserved value marks structural vertex/edge markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned bounding box in normalized [0,1] image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    /// Horizontal distance from the frame center, the selection criterion
    /// for canonical observations.
    pub fn center_offset(&self) -> f64 {
        (self.cx - 0.5).abs()
    }
}

/// One normalized detection: geometry plus stable identity, no confidences.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub frame: u32,
    pub track: TrackId,
    pub class: ClassId,
    pub bbox: BBox,
    /// Up to [`MAX_KEYPOINTS`] normalized 2D keypoints.
    pub keypoints: Vec<Vector2<f64>>,
}

/// A detection read from a label stream produced without a tracker; an id is
/// assigned later by the centroid tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct UntrackedDetection {
    pub frame: u32,
    pub class: ClassId,
    pub bbox: BBox,
    pub keypoints: Vec<Vector2<f64>>,
}

impl UntrackedDetection {
    /// Attach an identity, turning this into a full [`Detection`].
    pub fn with_track(self, track: TrackId) -> Detection {
        Detection {
            frame: self.frame,
            track,
            class: self.class,
            bbox: self.bbox,
            keypoints: self.keypoints,
        }
    }
}

/// Parse one raw tracked label line, stripping confidences.
///
/// Layout: `class cx cy w h [x y conf]* total_conf track_id`. The track id is
/// validated first; a record the tracker failed to identify cannot take part
/// in cross-frame selection no matter how well-formed the rest is.
pub fn parse_tracked_line(frame: u32, line: &str) -> Result<Detection, SkipReason> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 7 {
        return Err(SkipReason::BadFieldCount {
            count: fields.len(),
        });
    }

    let track_field = fields[fields.len() - 1];
    let track = track_field
        .parse::<u32>()
        .map_err(|_| SkipReason::InvalidTrackId {
            field: track_field.to_string(),
        })?;

    // The last two fields are total confidence (dropped) and the track id.
    let core = parse_geometry(frame, &fields[..fields.len() - 2])?;
    Ok(core.with_track(TrackId(track)))
}

/// Parse one raw untracked label line (same layout, no trailing track id).
pub fn parse_untracked_line(frame: u32, line: &str) -> Result<UntrackedDetection, SkipReason> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return Err(SkipReason::BadFieldCount {
            count: fields.len(),
        });
    }
    // The last field is the total confidence, dropped.
    parse_geometry(frame, &fields[..fields.len() - 1])
}

/// Parse `class cx cy w h [x y conf]*`, discarding every third keypoint field.
fn parse_geometry(frame: u32, fields: &[&str]) -> Result<UntrackedDetection, SkipReason> {
    let kp_fields = &fields[5..];
    if kp_fields.len() % 3 != 0 {
        return Err(SkipReason::BadFieldCount {
            count: fields.len(),
        });
    }
    let kp_count = kp_fields.len() / 3;
    if kp_count > MAX_KEYPOINTS {
        return Err(SkipReason::TooManyKeypoints { count: kp_count });
    }

    let class = ClassId(parse_u32(fields[0])?);
    let bbox = BBox {
        cx: parse_f64(fields[1])?,
        cy: parse_f64(fields[2])?,
        w: parse_f64(fields[3])?,
        h: parse_f64(fields[4])?,
    };

    let mut keypoints = Vec::with_capacity(kp_count);
    for triple in kp_fields.chunks_exact(3) {
        // triple[2] is the per-keypoint confidence, stripped unparsed.
        keypoints.push(Vector2::new(parse_f64(triple[0])?, parse_f64(triple[1])?));
    }

    Ok(UntrackedDetection {
        frame,
        class,
        bbox,
        keypoints,
    })
}

fn parse_u32(field: &str) -> Result<u32, SkipReason> {
    field.parse().map_err(|_| SkipReason::MalformedField {
        field: field.to_string(),
    })
}

fn parse_f64(field: &str) -> Result<f64, SkipReason> {
    field.parse().map_err(|_| SkipReason::MalformedField {
        field: field.to_string(),
    })
}
