//! Network configuration files.
//!
//! A [`NetworkConfig`] describes a topology and its training hyperparameters in a form
//! that can be read from JSON. Missing fields fall back to the digit-recognition
//! defaults (784-100-10, learning rate 0.1, sigmoid everywhere).
//!
//! ```json
//! {
//!   "layers": [
//!     { "name": "input", "width": 784 },
//!     { "name": "hidden1", "width": 100 },
//!     { "name": "output", "width": 10 }
//!   ],
//!   "learning_rate": 0.1,
//!   "hidden_activation": "sigmoid",
//!   "output_activation": "softmax",
//!   "seed": 7
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Activation, Error, LayerDescriptor, MlpBuilder, Result};

/// Width of a flattened 28x28 digit image.
pub const INPUT_WIDTH: usize = 784;
/// Hidden layer width of the default topology.
pub const HIDDEN_WIDTH: usize = 100;
/// One output per digit.
pub const OUTPUT_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Ordered from input to output.
    pub layers: Vec<LayerDescriptor>,
    pub learning_rate: f32,
    /// Activation name for every hidden layer, see `Activation::name`.
    pub hidden_activation: String,
    pub output_activation: String,
    /// Seed for weight initialization and shuffling; random when absent.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            layers: vec![
                LayerDescriptor::new("input", INPUT_WIDTH),
                LayerDescriptor::new("hidden1", HIDDEN_WIDTH),
                LayerDescriptor::new("output", OUTPUT_WIDTH),
            ],
            learning_rate: MlpBuilder::DEFAULT_LEARNING_RATE,
            hidden_activation: Activation::Sigmoid.name().to_owned(),
            output_activation: Activation::Sigmoid.name().to_owned(),
            seed: None,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(Error::InvalidConfig(format!(
                "config needs at least 2 layers, got {}",
                self.layers.len()
            )));
        }
        if let Some(desc) = self.layers.iter().find(|d| d.width == 0) {
            return Err(Error::InvalidConfig(format!(
                "layer '{}' must have a positive width",
                desc.name
            )));
        }
        crate::mlp::validate_learning_rate(self.learning_rate)?;
        let hidden = Activation::from_name(&self.hidden_activation)?;
        if self.layers.len() > 2 {
            hidden.validate_hidden()?;
        }
        Activation::from_name(&self.output_activation)?;
        Ok(())
    }

    /// Builder for the configured network. Call `build_with_seed` or `build` on it.
    pub fn builder(&self) -> Result<MlpBuilder> {
        self.validate()?;
        Ok(MlpBuilder::from_descriptors(&self.layers, self.learning_rate)
            .hidden_activation(Activation::from_name(&self.hidden_activation)?)
            .output_activation(Activation::from_name(&self.output_activation)?))
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, |d| d.width)
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, |d| d.width)
    }
}

/// Parse and validate a config from JSON text.
pub fn parse_config(json: &str) -> Result<NetworkConfig> {
    let config: NetworkConfig = serde_json::from_str(json)
        .map_err(|e| Error::InvalidConfig(format!("failed to parse config json: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load a config from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
    let p = path.as_ref();
    let contents = fs::read_to_string(p)
        .map_err(|e| Error::InvalidConfig(format!("failed to read {}: {e}", p.display())))?;
    let config = parse_config(&contents)?;
    tracing::debug!(path = %p.display(), layers = config.layers.len(), "config loaded");
    Ok(config)
}
