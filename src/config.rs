//! Run configuration, one YAML file per pipeline invocation.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nalgebra::Vector3;
use serde::Deserialize;

use crate::detection::centroid::DEFAULT_MAX_DISTANCE;
use crate::error::PipelineError;
use crate::geometry::CameraPose;
use crate::io::TrackingMode;
use crate::scene::MergeOptions;

/// One capture view: a label directory plus the camera that produced it.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Names the per-view output subdirectory and log lines.
    pub name: String,
    pub labels_dir: PathBuf,
    /// Frame count of the source video, for sweep interpolation.
    pub num_frames: u32,
    pub camera_position: [f64; 3],
    /// Extrinsic x-y-z Euler angles, degrees.
    pub camera_rotation_deg: [f64; 3],
    pub start_angle_deg: f64,
    pub end_angle_deg: f64,
}

impl ViewConfig {
    pub fn camera(&self) -> CameraPose {
        CameraPose::new(
            Vector3::from(self.camera_position),
            Vector3::from(self.camera_rotation_deg),
        )
    }
}

/// Top-level configuration for a full run.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Directory of `class_<id>.json` lifting models.
    pub models_dir: PathBuf,
    pub output_dir: PathBuf,
    pub views: Vec<ViewConfig>,
    /// Detections of this class are structural vertex markers, split from
    /// the object table.
    #[serde(default)]
    pub vertex_class: u32,
    #[serde(default)]
    pub merge: MergeOptions,
    #[serde(default)]
    pub tracking: TrackingMode,
    /// Matching threshold for the fallback centroid tracker.
    #[serde(default = "default_centroid_max_distance")]
    pub centroid_max_distance: f64,
    /// Run the full world-transform chain on corners instead of passing
    /// them through.
    #[serde(default)]
    pub transform_corners: bool,
    /// Write the merged scene to this .rrd file when set.
    #[serde(default)]
    pub scene_export: Option<PathBuf>,
}

fn default_centroid_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// A run takes one view (no merge) or two (merged scene).
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self.views.len() {
            1 | 2 => Ok(()),
            count => Err(PipelineError::UnsupportedViewCount { count }),
        }
    }
}
