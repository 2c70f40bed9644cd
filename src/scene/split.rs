//! Partition of world-frame objects into vertex markers and regular objects.

use std::collections::BTreeSet;

use crate::detection::record::ClassId;
use crate::error::PipelineError;
use crate::scene::object::{SceneObject, SceneTable};

/// Split a world-frame table on the reserved vertex class tag.
///
/// Every row lands in exactly one partition; nothing is dropped. Ids must be
/// unique across the whole view; a duplicate means the selector contract
/// was broken upstream and the table cannot be trusted.
pub fn split_by_class(
    objects: Vec<SceneObject>,
    vertex_class: ClassId,
) -> Result<SceneTable, PipelineError> {
    let mut seen = BTreeSet::new();
    let mut table = SceneTable::default();
    for obj in objects {
        if !seen.insert(obj.id) {
            return Err(PipelineError::DuplicateObjectId { id: obj.id });
        }
        if obj.class == vertex_class {
            table.vertices.push(obj);
        } else {
            table.objects.push(obj);
        }
    }
    Ok(table)
}
