use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use nalgebra::Vector3;

use scene_lift::config::PipelineConfig;
use scene_lift::detection::{ClassId, TrackId};
use scene_lift::error::PipelineError;
use scene_lift::io::{read_objects_csv, read_scene_table};
use scene_lift::pipeline;
use scene_lift::scene::{merge_scenes, MergeOptions};

/// Fresh scratch directory under the system temp dir.
fn fresh_root(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("scene-lift-{name}"));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();
    root
}

/// Single linear layer mapping bbox center to position: x <- cx, z <- cy.
/// Rotation and corners come out zero, so every 3D value is predictable.
fn write_planar_model(path: &Path) {
    let mut weights = vec![vec![0.0f64; 20]; 30];
    weights[0][0] = 1.0;
    weights[2][1] = 1.0;
    let json = serde_json::json!({
        "layers": [{ "weights": weights, "bias": vec![0.0f64; 30] }]
    });
    fs::write(path, json.to_string()).unwrap();
}

fn write_view(root: &Path, name: &str, files: &[(u32, &str)]) -> PathBuf {
    let dir = root.join("labels").join(name);
    fs::create_dir_all(&dir).unwrap();
    for (frame, content) in files {
        fs::write(dir.join(format!("{name}_{frame}.txt")), content).unwrap();
    }
    dir
}

/// Stationary sweep and an identity camera at the origin: lifting is the
/// only geometry until the world reflection flips x.
fn view_yaml(name: &str, labels_dir: &Path) -> String {
    format!(
        "  - name: {name}\n    \
         labels_dir: {}\n    \
         num_frames: 5\n    \
         camera_position: [0.0, 0.0, 0.0]\n    \
         camera_rotation_deg: [0.0, 0.0, 0.0]\n    \
         start_angle_deg: 0.0\n    \
         end_angle_deg: 0.0\n",
        labels_dir.display()
    )
}

#[test]
fn single_view_run_writes_every_stage_table() {
    let root = fresh_root("e2e-single");
    let models = root.join("models");
    fs::create_dir_all(&models).unwrap();
    write_planar_model(&models.join("class_0.json"));
    write_planar_model(&models.join("class_1.json"));

    // Track 1 drifts toward the image center; frame 1 is its best view.
    // Track 2 is a vertex marker (class 0), track 3 has no lifting model.
    let labels = write_view(
        &root,
        "front",
        &[
            (0, "1 0.30 0.40 0.10 0.10 0.9 1\n"),
            (1, "1 0.45 0.40 0.10 0.10 0.9 1\n0 0.50 0.20 0.05 0.05 0.8 2\n"),
            (2, "1 0.56 0.40 0.10 0.10 0.9 1\n7 0.50 0.50 0.10 0.10 0.9 3\n"),
        ],
    );

    let config_path = root.join("run.yaml");
    fs::write(
        &config_path,
        format!(
            "models_dir: {}\noutput_dir: {}\nviews:\n{}",
            models.display(),
            root.join("out").display(),
            view_yaml("front", &labels)
        ),
    )
    .unwrap();

    let config = PipelineConfig::load(&config_path).unwrap();
    pipeline::run(&config).unwrap();

    let out = root.join("out").join("front");

    // All three tracked objects survive selection.
    let canonical = fs::read_to_string(out.join("canonical_2d.csv")).unwrap();
    let lines: Vec<&str> = canonical.lines().collect();
    assert_eq!(lines.len(), 4, "header plus one row per track:\n{canonical}");
    assert_eq!(lines[0], "class_id,cx,cy,w,h,keypoints,track_id,frame_number");

    // Camera-frame tables keep the source frame column; world tables drop it.
    let lifted = fs::read_to_string(out.join("lifted_3d.csv")).unwrap();
    let first: Vec<&str> = lifted.lines().next().unwrap().split(',').collect();
    assert_eq!(first.len(), 33);
    assert_eq!(*first.last().unwrap(), "1");
    let world = fs::read_to_string(out.join("world_3d.csv")).unwrap();
    assert_eq!(world.lines().next().unwrap().split(',').count(), 32);

    // Track 1: best view cx=0.45, cy=0.40, world reflection flips x.
    let objects = read_objects_csv(&out.join("objects.csv")).unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].id, TrackId(1));
    assert_eq!(objects[0].class, ClassId(1));
    assert_eq!(objects[0].frame, None);
    assert_relative_eq!(
        objects[0].position,
        Vector3::new(-0.45, 0.0, 0.40),
        epsilon = 1e-9
    );

    let vertices = read_objects_csv(&out.join("vertices.csv")).unwrap();
    assert_eq!(vertices.len(), 1);
    assert_eq!(vertices[0].id, TrackId(2));
    assert_eq!(vertices[0].class, ClassId(0));
    assert_relative_eq!(
        vertices[0].position,
        Vector3::new(-0.50, 0.0, 0.20),
        epsilon = 1e-9
    );
}

#[test]
fn two_view_run_merges_counterparts_and_exports_the_scene() {
    let root = fresh_root("e2e-merge");
    let models = root.join("models");
    fs::create_dir_all(&models).unwrap();
    write_planar_model(&models.join("class_0.json"));
    write_planar_model(&models.join("class_1.json"));

    // Both views see object 1 near the same world position; the side view
    // also sees object 9, unknown to the front view.
    let front = write_view(
        &root,
        "front",
        &[
            (0, "1 0.45 0.40 0.10 0.10 0.9 1\n0 0.50 0.20 0.05 0.05 0.8 2\n"),
            (1, "1 0.30 0.40 0.10 0.10 0.9 1\n"),
        ],
    );
    let side = write_view(
        &root,
        "side",
        &[
            (0, "1 0.47 0.40 0.10 0.10 0.9 1\n1 0.80 0.30 0.10 0.10 0.9 9\n"),
            (1, "1 0.82 0.30 0.10 0.10 0.9 9\n"),
        ],
    );

    let export = root.join("scene.rrd");
    let config_path = root.join("run.yaml");
    fs::write(
        &config_path,
        format!(
            "models_dir: {}\noutput_dir: {}\nscene_export: {}\nviews:\n{}{}",
            models.display(),
            root.join("out").display(),
            export.display(),
            view_yaml("front", &front),
            view_yaml("side", &side)
        ),
    )
    .unwrap();

    let config = PipelineConfig::load(&config_path).unwrap();
    pipeline::run(&config).unwrap();

    // Object 1 fuses to the average of (-0.45, .., 0.40) and (-0.47, .., 0.40);
    // object 9 is appended unchanged from the side view.
    let merged = read_objects_csv(&root.join("out").join("merged_objects.csv")).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, TrackId(1));
    assert_relative_eq!(
        merged[0].position,
        Vector3::new(-0.46, 0.0, 0.40),
        epsilon = 1e-9
    );
    assert_eq!(merged[1].id, TrackId(9));
    assert_relative_eq!(
        merged[1].position,
        Vector3::new(-0.80, 0.0, 0.30),
        epsilon = 1e-9
    );

    // Vertex tables are never merged; the front view's is authoritative.
    let vertices = read_objects_csv(&root.join("out").join("merged_vertices.csv")).unwrap();
    assert_eq!(vertices.len(), 1);
    assert_eq!(vertices[0].id, TrackId(2));

    let metadata = fs::metadata(&export).expect("scene export file missing");
    assert!(metadata.len() > 0, "scene export file is empty");
}

/// Headerless 32-column object row as a finished run writes it.
fn object_row(id: u32, class: u32, x: f64) -> String {
    let mut cols = vec![id.to_string(), class.to_string(), format!("{x:.4}")];
    cols.extend(std::iter::repeat("0.0000".to_string()).take(29));
    cols.join(",")
}

#[test]
fn merging_tables_from_disk_fuses_counterparts() {
    let root = fresh_root("merge-files");
    let first_objects = root.join("a_objects.csv");
    let first_vertices = root.join("a_vertices.csv");
    let second_objects = root.join("b_objects.csv");
    let second_vertices = root.join("b_vertices.csv");
    fs::write(&first_objects, format!("{}\n", object_row(7, 1, 1.0))).unwrap();
    fs::write(&first_vertices, format!("{}\n", object_row(2, 0, 0.0))).unwrap();
    fs::write(&second_objects, format!("{}\n", object_row(7, 1, 3.0))).unwrap();
    fs::write(&second_vertices, "").unwrap();

    let primary = read_scene_table(&first_objects, &first_vertices).unwrap();
    let secondary = read_scene_table(&second_objects, &second_vertices).unwrap();
    let merged = merge_scenes(&primary, &secondary, &MergeOptions::default());

    assert_eq!(merged.objects.len(), 1);
    assert_relative_eq!(
        merged.objects[0].position,
        Vector3::new(2.0, 0.0, 0.0),
        epsilon = 1e-9
    );
    assert_eq!(merged.vertices.len(), 1);
    assert_eq!(merged.vertices[0].id, TrackId(2));
}

#[test]
fn stored_tables_with_duplicate_ids_are_rejected() {
    let root = fresh_root("merge-duplicate");
    let objects = root.join("objects.csv");
    let vertices = root.join("vertices.csv");
    // Two rows both claiming id 7, as a corrupted or hand-edited table would.
    fs::write(
        &objects,
        format!("{}\n{}\n", object_row(7, 1, 1.0), object_row(7, 1, 3.0)),
    )
    .unwrap();
    fs::write(&vertices, format!("{}\n", object_row(2, 0, 0.0))).unwrap();

    let err = read_scene_table(&objects, &vertices).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::DuplicateObjectId { id: TrackId(7) })
    );
}
