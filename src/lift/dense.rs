//! Dense feed-forward lifting model loaded from exported JSON weights.
//!
//! A weight file is a list of layers, each a row-major weight matrix, a bias
//! vector and an activation tag. Layer widths must chain from the 20-value
//! feature input to the 30-value prediction output; anything else is a broken
//! export and rejected at load time.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use super::{LiftFeatures, LiftModel, LiftPrediction, FEATURE_DIM, PREDICTION_DIM};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Activation {
    Relu,
    #[default]
    Linear,
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    /// Row-major, one row per output value.
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(default)]
    activation: Activation,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    layers: Vec<RawLayer>,
}

#[derive(Debug)]
struct Layer {
    weight: DMatrix<f64>,
    bias: DVector<f64>,
    relu: bool,
}

/// A fixed dense network: x -> W_n(..relu(W_1 x + b_1)..) + b_n.
#[derive(Debug)]
pub struct DenseLift {
    layers: Vec<Layer>,
}

impl DenseLift {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to load model file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawModel = serde_json::from_str(text).context("Failed to parse model JSON")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawModel) -> Result<Self> {
        if raw.layers.is_empty() {
            bail!("Model has no layers");
        }
        let mut layers = Vec::with_capacity(raw.layers.len());
        let mut width = FEATURE_DIM;
        for (i, layer) in raw.layers.into_iter().enumerate() {
            let rows = layer.weights.len();
            if rows == 0 {
                bail!("Layer {i} has an empty weight matrix");
            }
            let cols = layer.weights[0].len();
            if layer.weights.iter().any(|row| row.len() != cols) {
                bail!("Layer {i} has ragged weight rows");
            }
            if cols != width {
                bail!("Layer {i} expects {cols} inputs, previous layer produces {width}");
            }
            if layer.bias.len() != rows {
                bail!(
                    "Layer {i} has {rows} outputs but {} bias values",
                    layer.bias.len()
                );
            }
            let weight =
                DMatrix::from_row_iterator(rows, cols, layer.weights.into_iter().flatten());
            layers.push(Layer {
                weight,
                bias: DVector::from_vec(layer.bias),
                relu: layer.activation == Activation::Relu,
            });
            width = rows;
        }
        if width != PREDICTION_DIM {
            bail!("Final layer produces {width} values, expected {PREDICTION_DIM}");
        }
        Ok(Self { layers })
    }

    fn forward(&self, input: DVector<f64>) -> DVector<f64> {
        self.layers.iter().fold(input, |x, layer| {
            let mut y = &layer.weight * x + &layer.bias;
            if layer.relu {
                y.apply(|v| *v = v.max(0.0));
            }
            y
        })
    }
}

impl LiftModel for DenseLift {
    fn predict(&self, features: &LiftFeatures) -> LiftPrediction {
        let output = self.forward(DVector::from_row_slice(&features.0));
        let mut values = [0.0; PREDICTION_DIM];
        values.copy_from_slice(output.as_slice());
        LiftPrediction::from_values(&values)
    }
}
