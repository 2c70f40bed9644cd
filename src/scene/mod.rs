//! Scene tables: object records, the vertex/object split, cross-view merge.

pub mod merge;
pub mod object;
pub mod split;

pub use merge::{merge_scenes, MatchStrategy, MergeOptions};
pub use object::{SceneObject, SceneTable, CORNER_COUNT};
pub use split::split_by_class;
