pub mod rerun;

pub use self::rerun::export_scene;
