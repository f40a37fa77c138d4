//! Saving and loading network parameters.
//!
//! `SerializedMlp` is a versioned, plain-data record of everything needed to rebuild
//! an `Mlp`: topology, activations, learning rate, weights and biases. Conversions
//! to and from `Mlp` are always available; the JSON encoding needs the `serde`
//! feature.
//!
//! Design notes:
//! - Internal `Mlp`/`Layer` structs are not serialized directly, so the file format
//!   stays stable if the in-memory representation changes.
//! - Loading validates dimensions, parameter lengths, and that all parameters are
//!   finite.

#[cfg(feature = "serde")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Layer, Mlp, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedMlp {
    pub format_version: u32,
    pub learning_rate: f32,
    /// Updates applied before saving.
    #[cfg_attr(feature = "serde", serde(default))]
    pub updates: u64,
    pub layers: Vec<SerializedLayer>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedLayer {
    pub name: String,
    pub width: usize,
    /// 0 for the input layer.
    pub in_width: usize,
    /// Activation name, see `Activation::name`. Always "identity" for the input layer.
    pub activation: String,
    /// Row-major (width, in_width). Empty for the input layer.
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl SerializedMlp {
    /// Structural checks that do not need the parameter values.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "model format_version {} is not supported (this build reads {MODEL_FORMAT_VERSION})",
                self.format_version
            )));
        }
        let Some(first) = self.layers.first() else {
            return Err(Error::InvalidData("model has no layers".to_owned()));
        };
        if first.in_width != 0 {
            return Err(Error::InvalidData(format!(
                "layer '{}' is first but has in_width {}",
                first.name, first.in_width
            )));
        }
        if self.layers.len() == 1 {
            return Err(Error::InvalidData("model has no output layer".to_owned()));
        }

        let mut prev = first;
        for layer in &self.layers[1..] {
            if layer.in_width != prev.width {
                return Err(Error::InvalidData(format!(
                    "layer '{}' reads {} values but '{}' produces {}",
                    layer.name, layer.in_width, prev.name, prev.width
                )));
            }
            prev = layer;
        }
        Ok(())
    }
}

impl From<&Mlp> for SerializedMlp {
    fn from(model: &Mlp) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            learning_rate: model.learning_rate(),
            updates: model.updates(),
            layers: model.layers().iter().map(SerializedLayer::from).collect(),
        }
    }
}

impl From<&Layer> for SerializedLayer {
    fn from(layer: &Layer) -> Self {
        Self {
            name: layer.name().to_owned(),
            width: layer.width(),
            in_width: layer.in_width(),
            activation: layer.activation().name().to_owned(),
            weights: layer.weights().to_vec(),
            biases: layer.biases().to_vec(),
        }
    }
}

/// The input layer has no parameters and passes values through unchanged.
fn check_input_layer(saved: &SerializedLayer) -> Result<()> {
    if !saved.weights.is_empty() || !saved.biases.is_empty() {
        return Err(Error::InvalidData(format!(
            "input layer '{}' cannot carry weights or biases",
            saved.name
        )));
    }
    if Activation::from_name(&saved.activation)? != Activation::Identity {
        return Err(Error::InvalidData(format!(
            "input layer '{}' must use the identity activation, found '{}'",
            saved.name, saved.activation
        )));
    }
    Ok(())
}

impl TryFrom<SerializedMlp> for Mlp {
    type Error = Error;

    fn try_from(value: SerializedMlp) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let layers = value
            .layers
            .into_iter()
            .enumerate()
            .map(|(idx, saved)| {
                let layer = if idx == 0 {
                    check_input_layer(&saved)
                        .and_then(|()| Layer::input(saved.name, saved.width))
                } else {
                    Activation::from_name(&saved.activation).and_then(|activation| {
                        Layer::from_parts(
                            saved.name,
                            saved.in_width,
                            saved.width,
                            activation,
                            saved.weights,
                            saved.biases,
                        )
                    })
                };
                layer.map_err(|e| Error::InvalidData(format!("layer {idx} invalid: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut mlp = Mlp::from_layers(layers, value.learning_rate)
            .map_err(|e| Error::InvalidData(format!("invalid model: {e}")))?;
        mlp.set_updates(value.updates);
        Ok(mlp)
    }
}

impl Mlp {
    /// Snapshot of all parameters, independent of any encoding.
    pub fn save_parameters(&self) -> SerializedMlp {
        SerializedMlp::from(self)
    }

    /// Rebuild a network from a parameter snapshot.
    pub fn load_parameters(params: SerializedMlp) -> Result<Self> {
        Self::try_from(params)
    }
}

#[cfg(feature = "serde")]
impl SerializedMlp {
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let encoded = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        encoded.map_err(|e| Error::InvalidData(format!("cannot encode model as json: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidData(format!("malformed model json: {e}")))
    }
}

#[cfg(feature = "serde")]
impl Mlp {
    pub fn to_json_string(&self) -> Result<String> {
        self.save_parameters().to_json(false)
    }

    /// Indented JSON, as written by [`Mlp::save_json`].
    pub fn to_json_string_pretty(&self) -> Result<String> {
        self.save_parameters().to_json(true)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::load_parameters(SerializedMlp::from_json(json)?)
    }

    /// Write the model to `path` as indented JSON, replacing any existing file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_string_pretty()?;
        std::fs::write(path, json).map_err(|e| {
            Error::InvalidData(format!("cannot write model to {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), updates = self.updates(), "model saved");
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidData(format!("cannot read model from {}: {e}", path.display()))
        })?;
        let mlp = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), layers = mlp.num_layers(), "model loaded");
        Ok(mlp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MlpBuilder;

    fn model() -> Mlp {
        MlpBuilder::new()
            .layer("input", 3)
            .layer("hidden", 2)
            .layer("output", 2)
            .output_activation(Activation::Softmax)
            .learning_rate(0.25)
            .build_with_seed(5)
            .unwrap()
    }

    #[test]
    fn parameters_round_trip_exactly() {
        let mlp = model();
        let loaded = Mlp::load_parameters(mlp.save_parameters()).unwrap();
        assert_eq!(loaded, mlp);
    }

    #[test]
    fn rejects_broken_topology() {
        let mut params = model().save_parameters();
        params.layers[2].in_width = 5;
        assert!(Mlp::load_parameters(params).is_err());

        let mut params = model().save_parameters();
        params.layers[1].weights.pop();
        let err = Mlp::load_parameters(params).unwrap_err();
        assert!(err.to_string().contains("layer 1 invalid"));

        let mut params = model().save_parameters();
        params.layers[2].activation = "swish".to_owned();
        assert!(Mlp::load_parameters(params).is_err());
    }

    #[test]
    fn rejects_parameters_on_the_input_layer() {
        let mut params = model().save_parameters();
        params.layers[0].weights = vec![1.0];
        let err = Mlp::load_parameters(params).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().contains("layer 0 invalid"));

        let mut params = model().save_parameters();
        params.layers[0].biases = vec![0.0; 3];
        assert!(matches!(
            Mlp::load_parameters(params),
            Err(Error::InvalidData(_))
        ));

        let mut params = model().save_parameters();
        params.layers[0].activation = "sigmoid".to_owned();
        let err = Mlp::load_parameters(params).unwrap_err();
        assert!(err.to_string().contains("identity"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trips_and_keeps_update_count() {
        let mut mlp = model();
        let mut trainer = mlp.trainer();
        mlp.train_example(&[0.1, 0.2, 0.3], &[1.0, 0.0], &mut trainer)
            .unwrap();

        let pretty = mlp.to_json_string_pretty().unwrap();
        assert!(pretty.contains("\"activation\": \"softmax\""));
        let json = mlp.to_json_string().unwrap();
        let loaded = Mlp::from_json_str(&json).unwrap();
        assert_eq!(loaded, mlp);
        assert_eq!(loaded.updates(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn rejects_unknown_version() {
        let mut params = model().save_parameters();
        params.format_version = 2;
        let json = params.to_json(false).unwrap();
        let err = Mlp::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("format_version 2"));
        assert!(Mlp::from_json_str("{").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mlp = model();
        mlp.save_json(&path).unwrap();
        assert_eq!(Mlp::load_json(&path).unwrap(), mlp);
        assert!(Mlp::load_json(dir.path().join("missing.json")).is_err());
    }
}
