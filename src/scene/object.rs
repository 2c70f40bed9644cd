//! Scene entity types shared by the geometric stages.

use nalgebra::Vector3;

use crate::detection::record::{ClassId, TrackId};

/// Number of 3D corner keypoints per object (a bounding cuboid).
pub const CORNER_COUNT: usize = 8;

/// A localized object estimate.
///
/// Produced once by the lifter and rewritten by each geometric stage; the
/// same entity flows through the whole pipeline. `id` and `class` are never
/// touched by any transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Join key across stages and views; equal to the 2D track id.
    pub id: TrackId,
    /// Detector class tag; drives the vertex/object split and merge matching.
    pub class: ClassId,
    pub position: Vector3<f64>,
    /// Orientation as extrinsic x-y-z Euler angles, degrees.
    pub rotation_deg: Vector3<f64>,
    /// Cuboid corners expressed in the same frame as `position`.
    pub corners: [Vector3<f64>; CORNER_COUNT],
    /// Source frame of the canonical observation. Present from lifting until
    /// zero-degree alignment consumes it.
    pub frame: Option<u32>,
}

/// Final per-view output: regular objects and structural vertex markers.
///
/// The partition is exhaustive and disjoint, and ids are unique across both
/// halves of one view (enforced by the splitter).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneTable {
    pub objects: Vec<SceneObject>,
    pub vertices: Vec<SceneObject>,
}

impl SceneTable {
    /// Total row count across both partitions.
    pub fn len(&self) -> usize {
        self.objects.len() + self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.vertices.is_empty()
    }

    /// Ids of the regular objects, in table order.
    pub fn object_ids(&self) -> Vec<TrackId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    /// Ids of the vertex markers, in table order.
    pub fn vertex_ids(&self) -> Vec<TrackId> {
        self.vertices.iter().map(|o| o.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_len_spans_both_partitions() {
        let object = SceneObject {
            id: TrackId(1),
            class: ClassId(2),
            position: Vector3::zeros(),
            rotation_deg: Vector3::zeros(),
            corners: [Vector3::zeros(); CORNER_COUNT],
            frame: None,
        };
        let mut vertex = object.clone();
        vertex.id = TrackId(2);
        vertex.class = ClassId(0);

        let table = SceneTable {
            objects: vec![object],
            vertices: vec![vertex],
        };
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert_eq!(table.object_ids(), vec![TrackId(1)]);
        assert_eq!(table.vertex_ids(), vec![TrackId(2)]);
    }
}
