//! 2D-to-3D lifting: per-class regression models and the batch lift stage.
//!
//! Each canonical observation is packed into a fixed 20-value feature vector
//! (bbox center/size plus zero-padded keypoints) and fed to the regression
//! model registered for its class. The 30-value output parses into position,
//! orientation and eight cuboid corners. Classes without a registered model
//! skip the object; an input from which nothing lifts aborts the run.

pub mod dense;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::Vector3;

use crate::detection::record::{ClassId, TrackId, MAX_KEYPOINTS};
use crate::detection::select::CanonicalObservation;
use crate::error::{PipelineError, SkipReason};
use crate::scene::object::{SceneObject, CORNER_COUNT};

pub use dense::DenseLift;

/// Width of the model input: 4 bbox values + 8 keypoint (x, y) pairs.
pub const FEATURE_DIM: usize = 20;

/// Width of the model output: position + rotation + 8 corner triples.
pub const PREDICTION_DIM: usize = 30;

/// Fixed-width input vector for a lifting model.
#[derive(Debug, Clone, PartialEq)]
pub struct LiftFeatures(pub [f64; FEATURE_DIM]);

impl LiftFeatures {
    /// Pack a canonical observation: `cx, cy, w, h`, then keypoint pairs in
    /// detection order, zero-padded up to the fixed width.
    pub fn from_observation(obs: &CanonicalObservation) -> Result<Self, SkipReason> {
        if obs.keypoints.len() > MAX_KEYPOINTS {
            return Err(SkipReason::TooManyKeypoints {
                count: obs.keypoints.len(),
            });
        }
        let mut values = [0.0; FEATURE_DIM];
        values[0] = obs.bbox.cx;
        values[1] = obs.bbox.cy;
        values[2] = obs.bbox.w;
        values[3] = obs.bbox.h;
        for (i, kp) in obs.keypoints.iter().enumerate() {
            values[4 + 2 * i] = kp.x;
            values[5 + 2 * i] = kp.y;
        }
        Ok(Self(values))
    }
}

/// Parsed model output.
#[derive(Debug, Clone, PartialEq)]
pub struct LiftPrediction {
    pub position: Vector3<f64>,
    /// Extrinsic x-y-z Euler angles, degrees.
    pub rotation_deg: Vector3<f64>,
    pub corners: [Vector3<f64>; CORNER_COUNT],
}

impl LiftPrediction {
    /// Split a raw 30-value output into position, rotation and corners.
    pub fn from_values(values: &[f64; PREDICTION_DIM]) -> Self {
        let mut corners = [Vector3::zeros(); CORNER_COUNT];
        for (i, corner) in corners.iter_mut().enumerate() {
            let base = 6 + 3 * i;
            *corner = Vector3::new(values[base], values[base + 1], values[base + 2]);
        }
        Self {
            position: Vector3::new(values[0], values[1], values[2]),
            rotation_deg: Vector3::new(values[3], values[4], values[5]),
            corners,
        }
    }
}

/// A pretrained per-class regression producing a 3D estimate.
///
/// Implementations are fixed deterministic functions: identical features
/// must produce identical predictions.
pub trait LiftModel {
    fn predict(&self, features: &LiftFeatures) -> LiftPrediction;
}

/// Per-class model registry, populated once at startup.
pub struct LiftRegistry {
    models: BTreeMap<ClassId, Box<dyn LiftModel>>,
}

impl LiftRegistry {
    pub fn new() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, class: ClassId, model: Box<dyn LiftModel>) {
        self.models.insert(class, model);
    }

    pub fn get(&self, class: ClassId) -> Option<&dyn LiftModel> {
        self.models.get(&class).map(|m| m.as_ref())
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.models.contains_key(&class)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Registered classes in ascending order.
    pub fn classes(&self) -> Vec<ClassId> {
        self.models.keys().copied().collect()
    }

    /// Load every `class_<id>.json` weight file in a directory.
    ///
    /// Other files are ignored; malformed weights are fatal. An empty
    /// registry means the run cannot lift anything and stops here.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read models directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            let Some(class) = class_from_file_name(&path) else {
                continue;
            };
            let model = DenseLift::from_file(&path)?;
            registry.insert(class, Box::new(model));
        }
        if registry.is_empty() {
            return Err(PipelineError::EmptyRegistry {
                dir: dir.to_path_buf(),
            }
            .into());
        }
        Ok(registry)
    }
}

impl Default for LiftRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LiftRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiftRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}

/// Class id from a `class_<id>.json` file name, if it is one.
fn class_from_file_name(path: &Path) -> Option<ClassId> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let id = stem.strip_prefix("class_")?.parse().ok()?;
    Some(ClassId(id))
}

/// Lifted batch plus the rows that were skipped and why.
#[derive(Debug)]
pub struct LiftOutcome {
    pub objects: Vec<SceneObject>,
    pub skipped: Vec<(TrackId, SkipReason)>,
}

/// Lift a canonical table through the registry.
///
/// Skips are per-row and non-fatal; a non-empty input that produces nothing
/// means no configured model matched any observed class, which is fatal.
pub fn lift_observations(
    observations: &[CanonicalObservation],
    registry: &LiftRegistry,
) -> Result<LiftOutcome, PipelineError> {
    let mut kept = Vec::with_capacity(observations.len());
    let mut predictions = Vec::with_capacity(observations.len());
    let mut skipped = Vec::new();

    for obs in observations {
        let Some(model) = registry.get(obs.class) else {
            skipped.push((obs.track, SkipReason::UnknownClass { class: obs.class }));
            continue;
        };
        let features = match LiftFeatures::from_observation(obs) {
            Ok(features) => features,
            Err(reason) => {
                skipped.push((obs.track, reason));
                continue;
            }
        };
        predictions.push(model.predict(&features));
        kept.push(obs);
    }

    if !observations.is_empty() && predictions.is_empty() {
        return Err(PipelineError::NoLiftableObjects);
    }

    let objects = attach_frames(&kept, predictions)?;
    Ok(LiftOutcome { objects, skipped })
}

/// Reattach source frame numbers to a prediction batch.
///
/// The batch must correspond to the observations 1:1; a length mismatch
/// would misalign every following stage and aborts instead.
pub fn attach_frames(
    observations: &[&CanonicalObservation],
    predictions: Vec<LiftPrediction>,
) -> Result<Vec<SceneObject>, PipelineError> {
    if observations.len() != predictions.len() {
        return Err(PipelineError::RowCountMismatch {
            stage: "lift",
            input: observations.len(),
            output: predictions.len(),
        });
    }
    Ok(observations
        .iter()
        .zip(predictions)
        .map(|(obs, prediction)| SceneObject {
            id: obs.track,
            class: obs.class,
            position: prediction.position,
            rotation_deg: prediction.rotation_deg,
            corners: prediction.corners,
            frame: Some(obs.frame),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::record::BBox;
    use nalgebra::Vector2;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    /// Test double: position from the bbox center, everything else fixed.
    struct Planar;

    impl LiftModel for Planar {
        fn predict(&self, features: &LiftFeatures) -> LiftPrediction {
            let mut values = [0.0; PREDICTION_DIM];
            values[0] = features.0[0];
            values[2] = features.0[1];
            values[4] = 90.0;
            LiftPrediction::from_values(&values)
        }
    }

    fn observation(track: u32, class: u32, keypoints: usize) -> CanonicalObservation {
        CanonicalObservation {
            track: TrackId(track),
            class: ClassId(class),
            bbox: BBox {
                cx: 0.25,
                cy: 0.75,
                w: 0.2,
                h: 0.4,
            },
            keypoints: (0..keypoints)
                .map(|i| Vector2::new(0.1 * i as f64, 0.2 * i as f64))
                .collect(),
            frame: 11,
        }
    }

    #[test]
    fn features_pack_bbox_then_padded_keypoints() {
        let features = LiftFeatures::from_observation(&observation(1, 1, 2)).unwrap();
        assert_eq!(&features.0[..4], &[0.25, 0.75, 0.2, 0.4]);
        assert_eq!(&features.0[4..8], &[0.0, 0.0, 0.1, 0.2]);
        // Remaining slots are zero padding.
        assert!(features.0[8..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn prediction_layout_is_position_rotation_corners() {
        let mut values = [0.0; PREDICTION_DIM];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as f64;
        }
        let prediction = LiftPrediction::from_values(&values);
        assert_eq!(prediction.position, Vector3::new(0.0, 1.0, 2.0));
        assert_eq!(prediction.rotation_deg, Vector3::new(3.0, 4.0, 5.0));
        assert_eq!(prediction.corners[0], Vector3::new(6.0, 7.0, 8.0));
        assert_eq!(prediction.corners[7], Vector3::new(27.0, 28.0, 29.0));
    }

    #[test]
    fn lifting_keeps_ids_and_reattaches_frames() {
        let mut registry = LiftRegistry::new();
        registry.insert(ClassId(1), Box::new(Planar));

        let outcome =
            lift_observations(&[observation(3, 1, 4), observation(9, 1, 0)], &registry).unwrap();
        assert_eq!(outcome.objects.len(), 2);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.objects[0].id, TrackId(3));
        assert_eq!(outcome.objects[1].id, TrackId(9));
        assert_eq!(outcome.objects[0].frame, Some(11));
        assert_eq!(outcome.objects[0].position, Vector3::new(0.25, 0.0, 0.75));
    }

    #[test]
    fn unknown_class_skips_the_object_and_continues() {
        let mut registry = LiftRegistry::new();
        registry.insert(ClassId(1), Box::new(Planar));

        let outcome =
            lift_observations(&[observation(3, 1, 0), observation(4, 2, 0)], &registry).unwrap();
        assert_eq!(outcome.objects.len(), 1);
        assert_eq!(
            outcome.skipped,
            vec![(
                TrackId(4),
                SkipReason::UnknownClass { class: ClassId(2) }
            )]
        );
    }

    #[test]
    fn nothing_liftable_is_fatal() {
        let registry = LiftRegistry::new();
        let err = lift_observations(&[observation(3, 1, 0)], &registry).unwrap_err();
        assert_eq!(err, PipelineError::NoLiftableObjects);
    }

    #[test]
    fn empty_input_lifts_to_an_empty_batch() {
        let registry = LiftRegistry::new();
        let outcome = lift_observations(&[], &registry).unwrap();
        assert!(outcome.objects.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn prediction_count_mismatch_aborts_the_stage() {
        let obs = observation(1, 1, 0);
        let err = attach_frames(&[&obs], Vec::new()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::RowCountMismatch {
                stage: "lift",
                input: 1,
                output: 0,
            }
        );
    }

    #[test]
    fn identical_features_produce_identical_predictions() {
        let features = LiftFeatures::from_observation(&observation(1, 1, 5)).unwrap();
        assert_eq!(Planar.predict(&features), Planar.predict(&features));
    }

    #[test]
    fn model_files_are_recognized_by_name() {
        assert_eq!(
            class_from_file_name(&PathBuf::from("models/class_3.json")),
            Some(ClassId(3))
        );
        assert_eq!(class_from_file_name(&PathBuf::from("models/class_3.pth")), None);
        assert_eq!(class_from_file_name(&PathBuf::from("models/readme.json")), None);
        assert_eq!(class_from_file_name(&PathBuf::from("models/class_.json")), None);
    }

    #[test]
    fn load_dir_builds_models_from_weights_keyed_files() {
        let dir = env::temp_dir().join("scene-lift-registry-load");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        // A single linear layer scaling the first feature by 1.5.
        let rows: Vec<Vec<f64>> = (0..PREDICTION_DIM)
            .map(|i| {
                let mut row = vec![0.0; FEATURE_DIM];
                if i == 0 {
                    row[0] = 1.5;
                }
                row
            })
            .collect();
        let text = serde_json::json!({
            "layers": [{ "weights": rows, "bias": vec![0.0; PREDICTION_DIM] }]
        })
        .to_string();
        fs::write(dir.join("class_3.json"), text).unwrap();

        let registry = LiftRegistry::load_dir(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(registry.classes(), vec![ClassId(3)]);
        let mut values = [0.0; FEATURE_DIM];
        values[0] = 2.0;
        let prediction = registry
            .get(ClassId(3))
            .unwrap()
            .predict(&LiftFeatures(values));
        assert_eq!(prediction.position, Vector3::new(3.0, 0.0, 0.0));
    }
}
