//! JSON persistence (feature: `serde`).
//!
//! - [`NetworkState`] snapshots of any [`crate::Regressor`], e.g. the best state of a fit.
//! - [`Mlp`] models, architecture included.
//! - [`FitConfig`] loading and [`FitReport`] export.
//!
//! On-disk formats are versioned and do not serialize internal structs directly, so the
//! in-memory layout can change without breaking saved files. Loading validates shapes
//! and rejects non-finite parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Activation, Error, FitConfig, FitReport, Layer, Mlp, NetworkState, Result};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedState {
    pub format_version: u32,
    pub parameters: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMlp {
    pub format_version: u32,
    pub layers: Vec<SerializedLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    pub activation: Activation,
    /// Row-major (out_dim, in_dim).
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

fn check_version(found: u32) -> Result<()> {
    if found != FORMAT_VERSION {
        return Err(Error::InvalidData(format!(
            "unsupported format_version {found}; expected {FORMAT_VERSION}"
        )));
    }
    Ok(())
}

fn check_finite(values: &[f32], what: &str) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidData(format!(
            "{what} must contain only finite values"
        )));
    }
    Ok(())
}

fn write_file(path: &Path, contents: String) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

impl From<&NetworkState> for SerializedState {
    fn from(state: &NetworkState) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            parameters: state.parameters().to_vec(),
        }
    }
}

impl TryFrom<SerializedState> for NetworkState {
    type Error = Error;

    fn try_from(value: SerializedState) -> Result<Self> {
        check_version(value.format_version)?;
        check_finite(&value.parameters, "parameters")?;
        Ok(NetworkState::new(value.parameters))
    }
}

impl NetworkState {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&SerializedState::from(self))?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedState = serde_json::from_str(s)?;
        ser.try_into()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_file(path.as_ref(), self.to_json_string()?)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }
}

impl From<&Mlp> for SerializedMlp {
    fn from(model: &Mlp) -> Self {
        let layers = model
            .layers()
            .iter()
            .enumerate()
            .filter_map(|(i, layer)| {
                let (weights, biases) = model.layer_parameters(i)?;
                Some(SerializedLayer {
                    in_dim: layer.in_dim(),
                    out_dim: layer.out_dim(),
                    activation: layer.activation(),
                    weights: weights.to_vec(),
                    biases: biases.to_vec(),
                })
            })
            .collect();
        Self {
            format_version: FORMAT_VERSION,
            layers,
        }
    }
}

impl TryFrom<SerializedMlp> for Mlp {
    type Error = Error;

    fn try_from(value: SerializedMlp) -> Result<Self> {
        check_version(value.format_version)?;

        let mut layers = Vec::with_capacity(value.layers.len());
        let mut params = Vec::new();
        for (i, ser) in value.layers.into_iter().enumerate() {
            let layer = Layer::new(ser.in_dim, ser.out_dim, ser.activation, params.len())
                .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;
            if ser.weights.len() != ser.in_dim * ser.out_dim {
                return Err(Error::InvalidData(format!(
                    "layer {i} weights length {} does not match out_dim * in_dim ({} * {})",
                    ser.weights.len(),
                    ser.out_dim,
                    ser.in_dim
                )));
            }
            if ser.biases.len() != ser.out_dim {
                return Err(Error::InvalidData(format!(
                    "layer {i} biases length {} does not match out_dim {}",
                    ser.biases.len(),
                    ser.out_dim
                )));
            }
            params.extend_from_slice(&ser.weights);
            params.extend_from_slice(&ser.biases);
            layers.push(layer);
        }

        // Checks layer chaining, parameter count and finiteness.
        Mlp::from_parts(layers, params)
    }
}

impl Mlp {
    /// Serialize the model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&SerializedMlp::from(self))?)
    }

    /// Parse a model from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedMlp = serde_json::from_str(s)?;
        ser.try_into()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_file(path.as_ref(), self.to_json_string_pretty()?)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }
}

impl FitConfig {
    /// Parse a config; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: FitConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }
}

impl FitReport {
    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
