//! End-to-end orchestration of the localization pipeline.
//!
//! ```text
//! labels -> normalize -> select -> lift -> align -> world -> split
//!             (per view, writing a CSV at every stage boundary)
//!                                |
//!            two views? -> merge -> merged scene tables
//! ```
//!
//! Everything runs single-threaded in batch; the stages communicate by
//! value, the CSVs exist so any boundary can be inspected after the run.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{PipelineConfig, ViewConfig};
use crate::detection::record::ClassId;
use crate::detection::select_canonical;
use crate::geometry::{align_to_reference, to_world, SweepPlan};
use crate::io::{read_label_dir, write_canonical_csv, write_objects_csv};
use crate::lift::{lift_observations, LiftRegistry};
use crate::scene::{merge_scenes, split_by_class, SceneTable};
use crate::viz;

/// Run one view through every per-view stage and write its tables.
pub fn run_view(
    view: &ViewConfig,
    config: &PipelineConfig,
    registry: &LiftRegistry,
) -> Result<SceneTable> {
    let sweep = SweepPlan::new(
        &view.name,
        view.start_angle_deg,
        view.end_angle_deg,
        view.num_frames,
    )?;
    let out_dir = config.output_dir.join(&view.name);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let detections = read_label_dir(
        &view.labels_dir,
        config.tracking,
        config.centroid_max_distance,
    )?;

    let canonical = select_canonical(detections)?;
    write_canonical_csv(&out_dir.join("canonical_2d.csv"), &canonical)?;
    info!("[{}] {} canonical observations", view.name, canonical.len());

    let lifted = lift_observations(&canonical, registry)?;
    for (id, reason) in &lifted.skipped {
        warn!("[{}] skipping object {}: {}", view.name, id, reason);
    }
    write_objects_csv(&out_dir.join("lifted_3d.csv"), &lifted.objects)?;
    info!("[{}] {} objects lifted to 3D", view.name, lifted.objects.len());

    let aligned = align_to_reference(lifted.objects, &sweep)?;
    write_objects_csv(&out_dir.join("aligned_3d.csv"), &aligned)?;

    let world = to_world(aligned, &view.camera(), config.transform_corners)?;
    write_objects_csv(&out_dir.join("world_3d.csv"), &world)?;

    let table = split_by_class(world, ClassId(config.vertex_class))?;
    write_objects_csv(&out_dir.join("objects.csv"), &table.objects)?;
    write_objects_csv(&out_dir.join("vertices.csv"), &table.vertices)?;
    info!(
        "[{}] {} objects, {} vertices in world frame",
        view.name,
        table.objects.len(),
        table.vertices.len()
    );

    Ok(table)
}

/// Run the configured pipeline: one view, or two views plus the merge.
pub fn run(config: &PipelineConfig) -> Result<()> {
    config.validate()?;

    let registry = LiftRegistry::load_dir(&config.models_dir)?;
    info!(
        "Loaded lifting models for classes {:?}",
        registry.classes()
    );

    let primary = run_view(&config.views[0], config, &registry)
        .with_context(|| format!("View '{}' failed", config.views[0].name))?;

    let scene = match config.views.get(1) {
        Some(view) => {
            let secondary = run_view(view, config, &registry)
                .with_context(|| format!("View '{}' failed", view.name))?;
            let merged = merge_scenes(&primary, &secondary, &config.merge);
            write_objects_csv(&config.output_dir.join("merged_objects.csv"), &merged.objects)?;
            write_objects_csv(
                &config.output_dir.join("merged_vertices.csv"),
                &merged.vertices,
            )?;
            info!(
                "Merged scene: {} objects, {} vertices",
                merged.objects.len(),
                merged.vertices.len()
            );
            merged
        }
        None => {
            info!("Single view configured; merge skipped");
            primary
        }
    };

    if let Some(path) = &config.scene_export {
        viz::export_scene(path, &scene)?;
        info!("Scene written to {}", path.display());
    }

    Ok(())
}
