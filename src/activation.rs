//! Activation functions.
//!
//! A dense layer computes `z = W x + b` and then maps the whole vector through its
//! activation: `y = activation(z)`. Element-wise activations act on each entry on its
//! own; `Softmax` normalizes the vector into a probability distribution.
//!
//! Only the post-activation outputs `y` are cached in `Scratch`, so every derivative
//! here is expressed in terms of `y`.

use crate::{Error, Result};

/// Per-layer activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    /// Logistic sigmoid, maps into `(0, 1)`.
    #[default]
    Sigmoid,
    Tanh,
    ReLU,
    Identity,
    /// Normalized exponential over the whole layer. Output layers only.
    Softmax,
}

impl Activation {
    /// Whether the activation is valid on a hidden layer.
    pub fn validate_hidden(self) -> Result<()> {
        if self == Activation::Softmax {
            return Err(Error::InvalidConfig(
                "softmax is only supported on the output layer".to_owned(),
            ));
        }
        Ok(())
    }

    /// Short lowercase name, as used in config files.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::ReLU => "relu",
            Activation::Identity => "identity",
            Activation::Softmax => "softmax",
        }
    }

    /// Parse a name produced by [`Activation::name`].
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::ReLU),
            "identity" => Ok(Activation::Identity),
            "softmax" => Ok(Activation::Softmax),
            other => Err(Error::InvalidConfig(format!(
                "unknown activation '{other}', expected one of: sigmoid, tanh, relu, identity, softmax"
            ))),
        }
    }

    /// Apply the activation in place: `values` holds `z` on entry and `y` on return.
    #[inline]
    pub(crate) fn apply(self, values: &mut [f32]) {
        match self {
            Activation::Sigmoid => values.iter_mut().for_each(|v| *v = sigmoid(*v)),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::ReLU => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Identity => {}
            Activation::Softmax => softmax_in_place(values),
        }
    }

    /// Derivative of an element-wise activation, from its cached output `y`.
    ///
    /// For `Softmax` this is the diagonal of the Jacobian only; use
    /// [`Activation::backprop`] for the exact product.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f32) -> f32 {
        match self {
            Activation::Sigmoid | Activation::Softmax => y * (1.0 - y),
            Activation::Tanh => 1.0 - y * y,
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Identity => 1.0,
        }
    }

    /// Turn the error arriving at a layer's outputs into that layer's delta.
    ///
    /// `error` is the descent direction with respect to the outputs (for the output
    /// layer, `target - output`). Writes `delta = dy/dz^T * error`.
    #[inline]
    pub(crate) fn backprop(self, outputs: &[f32], error: &[f32], delta: &mut [f32]) {
        debug_assert_eq!(outputs.len(), error.len());
        debug_assert_eq!(outputs.len(), delta.len());

        match self {
            Activation::Softmax => {
                // J = diag(y) - y y^T, so J e = y * (e - <y, e>).
                let dot: f32 = outputs.iter().zip(error).map(|(&y, &e)| y * e).sum();
                for ((d, &y), &e) in delta.iter_mut().zip(outputs).zip(error) {
                    *d = y * (e - dot);
                }
            }
            act => {
                for ((d, &y), &e) in delta.iter_mut().zip(outputs).zip(error) {
                    *d = e * act.grad_from_output(y);
                }
            }
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0_f32;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    let inv = 1.0 / sum;
    values.iter_mut().for_each(|v| *v *= inv);
}
