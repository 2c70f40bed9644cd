//! Tracked 2D detections: label records, normalization, canonical selection,
//! and the fallback centroid tracker.

pub mod centroid;
pub mod record;
pub mod select;

pub use centroid::CentroidTracker;
pub use record::{BBox, ClassId, Detection, TrackId, UntrackedDetection, MAX_KEYPOINTS};
pub use select::{select_canonical, CanonicalObservation, CenterSelector};
