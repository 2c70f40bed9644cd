pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod io;
pub mod lift;
pub mod pipeline;
pub mod scene;
pub mod viz;
