//! Geometry stages: Euler conventions, sweep alignment, world transform.

pub mod euler;
pub mod sweep;
pub mod world;

pub use sweep::{align_to_reference, SweepPlan};
pub use world::{to_world, CameraPose};
