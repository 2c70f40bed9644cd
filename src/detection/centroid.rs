//! Fallback identity assignment for label streams without a tracker.
//!
//! Matches each detection to the nearest unclaimed bbox center from the
//! previous frame; anything farther than the threshold starts a new id.
//! Identities only persist across consecutive frames; an object that drops
//! out for a frame comes back with a fresh id.

use nalgebra::Vector2;

use crate::detection::record::{Detection, TrackId, UntrackedDetection};

/// Normalized center distance below which two detections are the same object.
pub const DEFAULT_MAX_DISTANCE: f64 = 0.5;

/// Frame-to-frame identity assigner keyed on bbox centers.
#[derive(Debug, Clone)]
pub struct CentroidTracker {
    max_distance: f64,
    next_id: u32,
    previous: Vec<(TrackId, Vector2<f64>)>,
}

impl CentroidTracker {
    pub fn new(max_distance: f64) -> Self {
        Self {
            max_distance,
            next_id: 0,
            previous: Vec::new(),
        }
    }

    /// Assign ids to one frame's detections.
    ///
    /// Each previous-frame identity is claimed at most once; claims go to the
    /// nearest candidate within the threshold, in detection order.
    pub fn assign_frame(&mut self, detections: Vec<UntrackedDetection>) -> Vec<Detection> {
        let mut claimed = vec![false; self.previous.len()];
        let mut current = Vec::with_capacity(detections.len());
        let mut out = Vec::with_capacity(detections.len());

        for det in detections {
            let center = Vector2::new(det.bbox.cx, det.bbox.cy);

            let mut nearest: Option<(usize, f64)> = None;
            for (i, (_, prev_center)) in self.previous.iter().enumerate() {
                if claimed[i] {
                    continue;
                }
                let distance = (center - prev_center).norm();
                if distance < self.max_distance
                    && nearest.map_or(true, |(_, best)| distance < best)
                {
                    nearest = Some((i, distance));
                }
            }

            let track = match nearest {
                Some((i, _)) => {
                    claimed[i] = true;
                    self.previous[i].0
                }
                None => {
                    let track = TrackId(self.next_id);
                    self.next_id += 1;
                    track
                }
            };

            current.push((track, center));
            out.push(det.with_track(track));
        }

        self.previous = current;
        out
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::record::{BBox, ClassId};

    fn det(frame: u32, cx: f64, cy: f64) -> UntrackedDetection {
        UntrackedDetection {
            frame,
            class: ClassId(1),
            bbox: BBox {
                cx,
                cy,
                w: 0.1,
                h: 0.1,
            },
            keypoints: Vec::new(),
        }
    }

    #[test]
    fn identity_follows_a_moving_object() {
        let mut tracker = CentroidTracker::new(0.5);
        let first = tracker.assign_frame(vec![det(0, 0.30, 0.50)]);
        assert_eq!(first[0].track, TrackId(0));

        let second = tracker.assign_frame(vec![det(1, 0.34, 0.50)]);
        assert_eq!(second[0].track, TrackId(0));

        let third = tracker.assign_frame(vec![det(2, 0.39, 0.52)]);
        assert_eq!(third[0].track, TrackId(0));
    }

    #[test]
    fn distant_detection_starts_a_new_id() {
        let mut tracker = CentroidTracker::new(0.2);
        tracker.assign_frame(vec![det(0, 0.1, 0.1)]);
        let next = tracker.assign_frame(vec![det(1, 0.9, 0.9)]);
        assert_eq!(next[0].track, TrackId(1));
    }

    #[test]
    fn each_identity_is_claimed_once_per_frame() {
        let mut tracker = CentroidTracker::new(0.5);
        tracker.assign_frame(vec![det(0, 0.50, 0.50)]);

        // Both candidates sit within the threshold of track 0; only the
        // nearer one keeps the identity, the other starts fresh.
        let frame = tracker.assign_frame(vec![det(1, 0.52, 0.50), det(1, 0.60, 0.50)]);
        assert_eq!(frame[0].track, TrackId(0));
        assert_eq!(frame[1].track, TrackId(1));
    }

    #[test]
    fn two_objects_keep_separate_identities() {
        let mut tracker = CentroidTracker::new(0.2);
        let first = tracker.assign_frame(vec![det(0, 0.2, 0.5), det(0, 0.8, 0.5)]);
        assert_eq!(first[0].track, TrackId(0));
        assert_eq!(first[1].track, TrackId(1));

        // Listed in the opposite order the next frame; ids still follow
        // positions, not list slots.
        let second = tracker.assign_frame(vec![det(1, 0.82, 0.5), det(1, 0.21, 0.5)]);
        assert_eq!(second[0].track, TrackId(1));
        assert_eq!(second[1].track, TrackId(0));
    }

    #[test]
    fn dropped_object_returns_with_a_fresh_id() {
        let mut tracker = CentroidTracker::new(0.2);
        tracker.assign_frame(vec![det(0, 0.2, 0.5)]);
        tracker.assign_frame(Vec::new());
        let back = tracker.assign_frame(vec![det(2, 0.2, 0.5)]);
        assert_eq!(back[0].track, TrackId(1));
    }
}
