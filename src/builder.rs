//! Model builder.
//!
//! `MlpBuilder` turns an ordered list of `{name, width}` layer descriptors plus a
//! learning rate into an initialized `Mlp`. The first descriptor is the input layer,
//! the last one is the output layer (one neuron per class).
//!
//! Activation policy is per network: every hidden layer uses `hidden_activation`
//! and the output layer uses `output_activation` (both sigmoid by default). Weights
//! are drawn from `Init::for_activation` unless an initializer is set explicitly.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Init, Layer, Mlp, Result};

/// Name and width of one layer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub name: String,
    pub width: usize,
}

impl LayerDescriptor {
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// Builder for an `Mlp`.
///
/// ```rust
/// use digit_mlp::MlpBuilder;
///
/// # fn main() -> digit_mlp::Result<()> {
/// let mlp = MlpBuilder::new()
///     .layer("input", 4)
///     .layer("hidden", 3)
///     .layer("output", 2)
///     .learning_rate(0.5)
///     .build_with_seed(0)?;
/// assert_eq!(mlp.output_width(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MlpBuilder {
    layers: Vec<LayerDescriptor>,
    learning_rate: f32,
    hidden_activation: Activation,
    output_activation: Activation,
    init: Option<Init>,
}

impl Default for MlpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MlpBuilder {
    pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            hidden_activation: Activation::Sigmoid,
            output_activation: Activation::Sigmoid,
            init: None,
        }
    }

    /// Start from a descriptor list and a learning rate.
    pub fn from_descriptors(layers: &[LayerDescriptor], learning_rate: f32) -> Self {
        Self {
            layers: layers.to_vec(),
            learning_rate,
            ..Self::new()
        }
    }

    /// Append a layer. The first call declares the input layer.
    pub fn layer(mut self, name: impl Into<String>, width: usize) -> Self {
        self.layers.push(LayerDescriptor::new(name, width));
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn hidden_activation(mut self, activation: Activation) -> Self {
        self.hidden_activation = activation;
        self
    }

    pub fn output_activation(mut self, activation: Activation) -> Self {
        self.output_activation = activation;
        self
    }

    /// Use `init` for every layer instead of the per-activation default.
    pub fn init(mut self, init: Init) -> Self {
        self.init = Some(init);
        self
    }

    pub fn descriptors(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Mlp> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build with a seed drawn from the operating system.
    pub fn build(self) -> Result<Mlp> {
        let mut rng = StdRng::from_entropy();
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Mlp> {
        if self.layers.len() < 2 {
            return Err(Error::InvalidConfig(format!(
                "an mlp needs an input and an output layer, got {} layer(s)",
                self.layers.len()
            )));
        }
        if self.layers.len() > 2 {
            self.hidden_activation.validate_hidden()?;
        }
        if let Some(init) = self.init {
            init.validate()?;
        }

        let mut seen = HashSet::with_capacity(self.layers.len());
        for desc in &self.layers {
            if !seen.insert(desc.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate layer name '{}'",
                    desc.name
                )));
            }
        }

        let last = self.layers.len() - 1;
        let mut layers = Vec::with_capacity(self.layers.len());
        layers.push(Layer::input(self.layers[0].name.clone(), self.layers[0].width)?);

        for (idx, desc) in self.layers.iter().enumerate().skip(1) {
            let activation = if idx == last {
                self.output_activation
            } else {
                self.hidden_activation
            };
            let init = self
                .init
                .unwrap_or_else(|| Init::for_activation(activation));
            let in_width = self.layers[idx - 1].width;
            layers.push(Layer::new_with_rng(
                desc.name.clone(),
                in_width,
                desc.width,
                activation,
                init,
                rng,
            )?);
        }

        Mlp::from_layers(layers, self.learning_rate)
    }
}
