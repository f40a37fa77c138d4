use rand::Rng;

use crate::{Activation, Error, Result};

/// Weight initializer. Biases always start at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Xavier/Glorot uniform: `U(-sqrt(6 / (in + out)), +sqrt(6 / (in + out)))`.
    Xavier,
    /// He/Kaiming uniform: `U(-sqrt(6 / in), +sqrt(6 / in))`.
    He,
    /// `U(-limit, +limit)`.
    Uniform { limit: f32 },
}

impl Init {
    pub fn validate(self) -> Result<()> {
        if let Init::Uniform { limit } = self {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "uniform init limit must be finite and > 0, got {limit}"
                )));
            }
        }
        Ok(())
    }

    /// Default initializer for layers using `activation`.
    pub fn for_activation(activation: Activation) -> Self {
        match activation {
            Activation::ReLU => Init::He,
            _ => Init::Xavier,
        }
    }

    fn limit(self, in_width: usize, width: usize) -> f32 {
        match self {
            Init::Xavier => (6.0 / (in_width + width) as f32).sqrt(),
            Init::He => (6.0 / in_width as f32).sqrt(),
            Init::Uniform { limit } => limit,
        }
    }
}

/// One layer of the network.
///
/// The first layer of every network is an input layer: it has no parameters and its
/// activations are the raw input. Every other layer is fully connected to the layer
/// before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    width: usize,
    in_width: usize,
    activation: Activation,
    /// Row-major matrix with shape (width, in_width). Empty for the input layer.
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    /// A parameterless pass-through layer holding `width` raw inputs.
    pub fn input(name: impl Into<String>, width: usize) -> Result<Self> {
        let name = checked_name(name.into())?;
        if width == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer '{name}' width must be > 0"
            )));
        }
        Ok(Self {
            name,
            width,
            in_width: 0,
            activation: Activation::Identity,
            weights: Vec::new(),
            biases: Vec::new(),
        })
    }

    /// A dense layer with randomly initialized weights and zero biases.
    pub fn new_with_rng<R: Rng + ?Sized>(
        name: impl Into<String>,
        in_width: usize,
        width: usize,
        activation: Activation,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        let name = checked_name(name.into())?;
        if in_width == 0 || width == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer '{name}' dims must be > 0, got in_width={in_width} width={width}"
            )));
        }
        init.validate()?;

        let limit = init.limit(in_width, width);
        let weights = (0..in_width * width)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();

        Ok(Self {
            name,
            width,
            in_width,
            activation,
            weights,
            biases: vec![0.0; width],
        })
    }

    /// A dense layer from explicit parameters.
    ///
    /// Validates shapes and that every parameter is finite.
    pub fn from_parts(
        name: impl Into<String>,
        in_width: usize,
        width: usize,
        activation: Activation,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        let name = checked_name(name.into())?;
        if in_width == 0 || width == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer '{name}' dims must be > 0, got in_width={in_width} width={width}"
            )));
        }
        if weights.len() != in_width * width {
            return Err(Error::DimensionMismatch(format!(
                "layer '{name}' weights length {} does not match width * in_width ({width} * {in_width})",
                weights.len()
            )));
        }
        if biases.len() != width {
            return Err(Error::DimensionMismatch(format!(
                "layer '{name}' biases length {} does not match width {width}",
                biases.len()
            )));
        }
        if weights.iter().chain(&biases).any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!(
                "layer '{name}' parameters must be finite"
            )));
        }

        Ok(Self {
            name,
            width,
            in_width,
            activation,
            weights,
            biases,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Width of the previous layer; 0 for the input layer.
    #[inline]
    pub fn in_width(&self) -> usize {
        self.in_width
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        self.in_width == 0
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[inline]
    pub(crate) fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    #[inline]
    pub(crate) fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Forward pass for a single example.
    ///
    /// Computes `outputs = activation(W * inputs + b)`.
    ///
    /// Shape contract:
    /// - `inputs.len() == self.in_width`
    /// - `outputs.len() == self.width`
    #[inline]
    pub(crate) fn forward(&self, inputs: &[f32], outputs: &mut [f32]) {
        debug_assert!(!self.is_input());
        debug_assert_eq!(inputs.len(), self.in_width);
        debug_assert_eq!(outputs.len(), self.width);

        for (o, out) in outputs.iter_mut().enumerate() {
            let row = &self.weights[o * self.in_width..(o + 1) * self.in_width];
            let mut sum = self.biases[o];
            for (&w, &x) in row.iter().zip(inputs) {
                sum = w.mul_add(x, sum);
            }
            *out = sum;
        }
        self.activation.apply(outputs);
    }

    /// Carry this layer's delta back to the previous layer's outputs.
    ///
    /// Overwrites `prev_error` with `W^T * delta`.
    #[inline]
    pub(crate) fn propagate(&self, delta: &[f32], prev_error: &mut [f32]) {
        debug_assert_eq!(delta.len(), self.width);
        debug_assert_eq!(prev_error.len(), self.in_width);

        prev_error.fill(0.0);
        for (o, &d) in delta.iter().enumerate() {
            let row = &self.weights[o * self.in_width..(o + 1) * self.in_width];
            for (e, &w) in prev_error.iter_mut().zip(row) {
                *e = w.mul_add(d, *e);
            }
        }
    }

    /// Delta-rule update for a single example.
    ///
    /// `W += lr * delta ⊗ inputs`, `b += lr * delta`, where `inputs` are the
    /// activations of the previous layer.
    #[inline]
    pub(crate) fn update(&mut self, inputs: &[f32], delta: &[f32], lr: f32) {
        debug_assert_eq!(inputs.len(), self.in_width);
        debug_assert_eq!(delta.len(), self.width);

        for (o, &d) in delta.iter().enumerate() {
            let step = lr * d;
            self.biases[o] += step;
            let row = &mut self.weights[o * self.in_width..(o + 1) * self.in_width];
            for (w, &x) in row.iter_mut().zip(inputs) {
                *w = step.mul_add(x, *w);
            }
        }
    }
}

fn checked_name(name: String) -> Result<String> {
    if name.trim().is_empty() {
        return Err(Error::InvalidConfig("layer name must not be empty".to_owned()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn input_layer_has_no_parameters() {
        let layer = Layer::input("input", 4).unwrap();
        assert!(layer.is_input());
        assert!(layer.weights().is_empty());
        assert!(layer.biases().is_empty());
        assert!(Layer::input("input", 0).is_err());
        assert!(Layer::input("  ", 4).is_err());
    }

    #[test]
    fn random_init_respects_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = Layer::new_with_rng(
            "hidden",
            10,
            5,
            Activation::Sigmoid,
            Init::Uniform { limit: 0.05 },
            &mut rng,
        )
        .unwrap();
        assert_eq!(layer.weights().len(), 50);
        assert!(layer.weights().iter().all(|w| w.abs() <= 0.05));
        assert!(layer.biases().iter().all(|&b| b == 0.0));

        let bad = Layer::new_with_rng(
            "hidden",
            10,
            5,
            Activation::Sigmoid,
            Init::Uniform { limit: 0.0 },
            &mut rng,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn from_parts_validates_shapes() {
        let err = Layer::from_parts("out", 2, 2, Activation::Sigmoid, vec![0.0; 3], vec![0.0; 2])
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));

        let err = Layer::from_parts(
            "out",
            1,
            1,
            Activation::Sigmoid,
            vec![f32::NAN],
            vec![0.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn forward_propagate_and_update_by_hand() {
        let mut layer = Layer::from_parts(
            "out",
            2,
            2,
            Activation::Identity,
            vec![1.0, 2.0, 3.0, 4.0],
            vec![0.5, -0.5],
        )
        .unwrap();

        let mut out = [0.0_f32; 2];
        layer.forward(&[1.0, 1.0], &mut out);
        assert_eq!(out, [3.5, 6.5]);

        let mut prev = [9.0_f32; 2];
        layer.propagate(&[1.0, -1.0], &mut prev);
        assert_eq!(prev, [-2.0, -2.0]);

        layer.update(&[1.0, 2.0], &[1.0, -1.0], 0.5);
        assert_eq!(layer.weights(), &[1.5, 3.0, 2.5, 3.0]);
        assert_eq!(layer.biases(), &[1.0, -1.0]);
    }
}
