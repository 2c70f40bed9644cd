pub mod labels;
pub mod tables;

pub use labels::{read_label_dir, TrackingMode};
pub use tables::{
    read_canonical_csv, read_objects_csv, read_scene_table, write_canonical_csv, write_objects_csv,
};
