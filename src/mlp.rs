use crate::{Error, Frame, Layer, Result, loss};

#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Layer>,
    learning_rate: f32,
    updates: u64,
}

/// Whether any training update has been applied yet.
///
/// A network is `Training` only while `train` holds it mutably borrowed, so that
/// state is never observable from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Untrained,
    Trained,
}

/// Reusable activation buffers for `Mlp::forward`, one per layer.
///
/// Entry 0 holds the raw input; the last entry holds the network output.
#[derive(Debug, Clone)]
pub struct Scratch {
    activations: Vec<Vec<f32>>,
}

/// Reusable backward-pass buffers (overwrite semantics).
///
/// For every layer `l` after the input layer:
/// - `errors[l]`: descent direction w.r.t. the layer outputs
///   (`target - output` for the last layer, `W[l+1]^T * delta[l+1]` otherwise)
/// - `deltas[l]`: error term after the activation derivative
#[derive(Debug, Clone)]
pub struct Deltas {
    errors: Vec<Vec<f32>>,
    deltas: Vec<Vec<f32>>,
}

impl Mlp {
    /// Assemble a network from already-built layers.
    ///
    /// `layers[0]` must be an input layer and every later layer must be dense with
    /// `in_width` equal to the width of the layer before it.
    pub fn from_layers(layers: Vec<Layer>, learning_rate: f32) -> Result<Self> {
        if layers.len() < 2 {
            return Err(Error::InvalidConfig(
                "an mlp needs an input and an output layer".to_owned(),
            ));
        }
        if !layers[0].is_input() {
            return Err(Error::InvalidConfig(format!(
                "first layer '{}' must be an input layer",
                layers[0].name()
            )));
        }
        for (idx, pair) in layers.windows(2).enumerate() {
            let (prev, layer) = (&pair[0], &pair[1]);
            if layer.is_input() {
                return Err(Error::InvalidConfig(format!(
                    "layer {} '{}' is an input layer but is not first",
                    idx + 1,
                    layer.name()
                )));
            }
            if layer.in_width() != prev.width() {
                return Err(Error::DimensionMismatch(format!(
                    "layer '{}' expects {} inputs but layer '{}' has width {}",
                    layer.name(),
                    layer.in_width(),
                    prev.name(),
                    prev.width()
                )));
            }
        }
        let last = layers.len() - 1;
        for layer in &layers[1..last] {
            layer.activation().validate_hidden()?;
        }
        validate_learning_rate(learning_rate)?;

        Ok(Self {
            layers,
            learning_rate,
            updates: 0,
        })
    }

    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Number of single-example updates applied since construction.
    #[inline]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub(crate) fn set_updates(&mut self, updates: u64) {
        self.updates = updates;
    }

    pub fn state(&self) -> TrainingState {
        if self.updates == 0 {
            TrainingState::Untrained
        } else {
            TrainingState::Trained
        }
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn input_width(&self) -> usize {
        self.layers[0].width()
    }

    #[inline]
    pub fn output_width(&self) -> usize {
        self.layers[self.layers.len() - 1].width()
    }

    pub fn scratch(&self) -> Scratch {
        Scratch::new(self)
    }

    pub fn deltas(&self) -> Deltas {
        Deltas::new(self)
    }

    /// Convenience constructor: allocate all training buffers.
    #[inline]
    pub fn trainer(&self) -> Trainer {
        Trainer::new(self)
    }

    /// Forward pass for a single example.
    ///
    /// Writes every layer's activations into `scratch` and returns the output slice.
    pub fn forward<'a>(&self, input: &[f32], scratch: &'a mut Scratch) -> Result<&'a [f32]> {
        if input.len() != self.input_width() {
            return Err(Error::DimensionMismatch(format!(
                "input len {} does not match input layer '{}' width {}",
                input.len(),
                self.layers[0].name(),
                self.input_width()
            )));
        }
        scratch.check(self)?;

        scratch.activations[0].copy_from_slice(input);
        for idx in 1..self.layers.len() {
            // Borrow the previous activations immutably and the current ones mutably.
            let (left, right) = scratch.activations.split_at_mut(idx);
            self.layers[idx].forward(&left[idx - 1], &mut right[0]);
        }

        Ok(scratch.output())
    }

    /// Backward pass for a single example.
    ///
    /// `scratch` must hold the forward pass for the same example. Fills `deltas`
    /// using the current (pre-update) weights and returns the squared-error loss
    /// `0.5 * sum((target - output)^2)`.
    pub fn backward(&self, target: &[f32], scratch: &Scratch, deltas: &mut Deltas) -> Result<f32> {
        if target.len() != self.output_width() {
            return Err(Error::DimensionMismatch(format!(
                "target len {} does not match output layer '{}' width {}",
                target.len(),
                self.layers[self.layers.len() - 1].name(),
                self.output_width()
            )));
        }
        scratch.check(self)?;
        deltas.check(self)?;

        let last = self.layers.len() - 1;
        let output = &scratch.activations[last];
        for ((e, &t), &y) in deltas.errors[last].iter_mut().zip(target).zip(output) {
            *e = t - y;
        }

        for idx in (1..=last).rev() {
            let layer = &self.layers[idx];
            layer.activation().backprop(
                &scratch.activations[idx],
                &deltas.errors[idx],
                &mut deltas.deltas[idx],
            );
            if idx > 1 {
                layer.propagate(&deltas.deltas[idx], &mut deltas.errors[idx - 1]);
            }
        }

        Ok(loss::squared_error(output, target))
    }

    /// Apply the delta rule to every layer:
    /// `W[l] += lr * delta[l] ⊗ activations[l-1]`, `b[l] += lr * delta[l]`.
    pub fn apply_deltas(&mut self, scratch: &Scratch, deltas: &Deltas) -> Result<()> {
        scratch.check(self)?;
        deltas.check(self)?;

        let lr = self.learning_rate;
        for idx in 1..self.layers.len() {
            self.layers[idx].update(&scratch.activations[idx - 1], &deltas.deltas[idx], lr);
        }
        self.updates += 1;
        Ok(())
    }

    /// One online SGD step: forward, backward, update. Returns the pre-update loss.
    ///
    /// Shape errors are reported before any parameter is touched.
    pub fn train_example(
        &mut self,
        input: &[f32],
        target: &[f32],
        trainer: &mut Trainer,
    ) -> Result<f32> {
        self.forward(input, &mut trainer.scratch)?;
        let loss = self.backward(target, &trainer.scratch, &mut trainer.deltas)?;
        self.apply_deltas(&trainer.scratch, &trainer.deltas)?;
        Ok(loss)
    }

    /// Run the forward pass over every row of `inputs`.
    ///
    /// Returns one output row per input row, in order. Uses its own scratch buffer,
    /// so it only needs `&self`.
    pub fn predict(&self, inputs: &Frame) -> Result<Frame> {
        if inputs.width() != self.input_width() {
            return Err(Error::DimensionMismatch(format!(
                "frame width {} does not match input width {}",
                inputs.width(),
                self.input_width()
            )));
        }

        let mut scratch = self.scratch();
        let out_width = self.output_width();
        let mut preds = Vec::with_capacity(inputs.len() * out_width);
        for row in inputs.rows() {
            preds.extend_from_slice(self.forward(row, &mut scratch)?);
        }

        Frame::from_flat(preds, out_width)
    }

    /// Forward pass for one example, returning an owned output vector.
    pub fn predict_one(&self, input: &[f32]) -> Result<Vec<f32>> {
        let mut scratch = self.scratch();
        Ok(self.forward(input, &mut scratch)?.to_vec())
    }
}

pub(crate) fn validate_learning_rate(learning_rate: f32) -> Result<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {learning_rate}"
        )));
    }
    Ok(())
}

/// Reusable buffers for training a specific `Mlp`.
///
/// This is the ergonomic wrapper around `Scratch` + `Deltas`.
#[derive(Debug, Clone)]
pub struct Trainer {
    pub scratch: Scratch,
    pub deltas: Deltas,
}

impl Trainer {
    pub fn new(mlp: &Mlp) -> Self {
        Self {
            scratch: Scratch::new(mlp),
            deltas: Deltas::new(mlp),
        }
    }
}

impl Scratch {
    pub fn new(mlp: &Mlp) -> Self {
        let activations = mlp.layers.iter().map(|l| vec![0.0; l.width()]).collect();
        Self { activations }
    }

    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.activations[self.activations.len() - 1]
    }

    /// Activations of layer `idx` from the most recent forward pass.
    #[inline]
    pub fn activations(&self, idx: usize) -> &[f32] {
        &self.activations[idx]
    }

    fn check(&self, mlp: &Mlp) -> Result<()> {
        let fits = self.activations.len() == mlp.layers.len()
            && self
                .activations
                .iter()
                .zip(&mlp.layers)
                .all(|(a, l)| a.len() == l.width());
        if !fits {
            return Err(Error::DimensionMismatch(
                "scratch buffer was built for a different topology".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Deltas {
    pub fn new(mlp: &Mlp) -> Self {
        let sized = |l: &Layer| {
            if l.is_input() {
                Vec::new()
            } else {
                vec![0.0; l.width()]
            }
        };
        Self {
            errors: mlp.layers.iter().map(sized).collect(),
            deltas: mlp.layers.iter().map(sized).collect(),
        }
    }

    /// Delta of layer `idx` from the most recent backward pass (empty for the input layer).
    #[inline]
    pub fn delta(&self, idx: usize) -> &[f32] {
        &self.deltas[idx]
    }

    fn check(&self, mlp: &Mlp) -> Result<()> {
        let fits = self.deltas.len() == mlp.layers.len()
            && self.errors.len() == mlp.layers.len()
            && mlp.layers.iter().enumerate().all(|(i, l)| {
                let expected = if l.is_input() { 0 } else { l.width() };
                self.deltas[i].len() == expected && self.errors[i].len() == expected
            });
        if !fits {
            return Err(Error::DimensionMismatch(
                "delta buffer was built for a different topology".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activation, MlpBuilder};

    fn net(sizes: &[usize], seed: u64) -> Mlp {
        let mut b = MlpBuilder::new().learning_rate(0.5);
        for (i, &w) in sizes.iter().enumerate() {
            b = b.layer(format!("l{i}"), w);
        }
        b.build_with_seed(seed).unwrap()
    }

    fn loss_for_mlp(mlp: &Mlp, input: &[f32], target: &[f32], scratch: &mut Scratch) -> f32 {
        mlp.forward(input, scratch).unwrap();
        loss::squared_error(scratch.output(), target)
    }

    fn assert_close(analytic: f32, numeric: f32, abs_tol: f32, rel_tol: f32) {
        let diff = (analytic - numeric).abs();
        let scale = analytic.abs().max(numeric.abs()).max(1.0);
        assert!(
            diff <= abs_tol || diff / scale <= rel_tol,
            "analytic={analytic} numeric={numeric} diff={diff}"
        );
    }

    #[test]
    fn seeded_init_is_deterministic() {
        let a = net(&[2, 3, 1], 123);
        let b = net(&[2, 3, 1], 123);

        let input = [0.3_f32, -0.7_f32];
        assert_eq!(a.predict_one(&input).unwrap(), b.predict_one(&input).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn update_follows_negative_numeric_gradient() {
        let mlp = net(&[2, 3, 2], 0);
        let input = [0.3_f32, 0.7_f32];
        let target = [1.0_f32, 0.0];

        let mut trained = mlp.clone();
        let mut trainer = trained.trainer();
        trained.train_example(&input, &target, &mut trainer).unwrap();

        let lr = mlp.learning_rate();
        let eps = 1e-3_f32;
        let mut perturbed = mlp.clone();
        let mut scratch = perturbed.scratch();

        for layer_idx in 1..mlp.num_layers() {
            for p in 0..mlp.layers[layer_idx].weights().len() {
                let orig = mlp.layers[layer_idx].weights()[p];

                perturbed.layers[layer_idx].weights_mut()[p] = orig + eps;
                let loss_plus = loss_for_mlp(&perturbed, &input, &target, &mut scratch);
                perturbed.layers[layer_idx].weights_mut()[p] = orig - eps;
                let loss_minus = loss_for_mlp(&perturbed, &input, &target, &mut scratch);
                perturbed.layers[layer_idx].weights_mut()[p] = orig;

                let numeric = -(loss_plus - loss_minus) / (2.0 * eps);
                let applied = (trained.layers[layer_idx].weights()[p] - orig) / lr;
                assert_close(applied, numeric, 1e-3, 1e-2);
            }

            for p in 0..mlp.layers[layer_idx].biases().len() {
                let orig = mlp.layers[layer_idx].biases()[p];

                perturbed.layers[layer_idx].biases_mut()[p] = orig + eps;
                let loss_plus = loss_for_mlp(&perturbed, &input, &target, &mut scratch);
                perturbed.layers[layer_idx].biases_mut()[p] = orig - eps;
                let loss_minus = loss_for_mlp(&perturbed, &input, &target, &mut scratch);
                perturbed.layers[layer_idx].biases_mut()[p] = orig;

                let numeric = -(loss_plus - loss_minus) / (2.0 * eps);
                let applied = (trained.layers[layer_idx].biases()[p] - orig) / lr;
                assert_close(applied, numeric, 1e-3, 1e-2);
            }
        }
    }

    #[test]
    fn softmax_output_update_follows_numeric_gradient() {
        let mlp = MlpBuilder::new()
            .layer("input", 3)
            .layer("output", 3)
            .output_activation(Activation::Softmax)
            .learning_rate(0.1)
            .build_with_seed(4)
            .unwrap();
        let input = [0.2_f32, -0.4, 0.9];
        let target = [0.0_f32, 1.0, 0.0];

        let mut trained = mlp.clone();
        let mut trainer = trained.trainer();
        trained.train_example(&input, &target, &mut trainer).unwrap();

        let eps = 1e-3_f32;
        let mut perturbed = mlp.clone();
        let mut scratch = perturbed.scratch();
        for p in 0..mlp.layers[1].weights().len() {
            let orig = mlp.layers[1].weights()[p];
            perturbed.layers[1].weights_mut()[p] = orig + eps;
            let loss_plus = loss_for_mlp(&perturbed, &input, &target, &mut scratch);
            perturbed.layers[1].weights_mut()[p] = orig - eps;
            let loss_minus = loss_for_mlp(&perturbed, &input, &target, &mut scratch);
            perturbed.layers[1].weights_mut()[p] = orig;

            let numeric = -(loss_plus - loss_minus) / (2.0 * eps);
            let applied = (trained.layers[1].weights()[p] - orig) / mlp.learning_rate();
            assert_close(applied, numeric, 1e-3, 1e-2);
        }
    }

    #[test]
    fn forward_rejects_input_shape_mismatch() {
        let mlp = net(&[2, 3, 1], 0);
        let mut scratch = mlp.scratch();
        let err = mlp.forward(&[0.0; 3], &mut scratch).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn forward_rejects_scratch_from_other_topology() {
        let a = net(&[2, 3, 1], 0);
        let b = net(&[2, 4, 1], 0);
        let mut scratch_b = b.scratch();
        let err = a.forward(&[0.0; 2], &mut scratch_b).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn target_mismatch_leaves_parameters_untouched() {
        let mut mlp = net(&[2, 3, 2], 1);
        let before = mlp.clone();
        let mut trainer = mlp.trainer();

        let err = mlp
            .train_example(&[0.1, 0.2], &[1.0, 0.0, 0.0], &mut trainer)
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
        assert_eq!(mlp, before);
        assert_eq!(mlp.state(), TrainingState::Untrained);
    }

    #[test]
    fn from_layers_rejects_incompatible_widths() {
        let input = Layer::input("input", 3).unwrap();
        let out = Layer::from_parts("out", 2, 1, Activation::Sigmoid, vec![0.0; 2], vec![0.0])
            .unwrap();
        let err = Mlp::from_layers(vec![input, out], 0.1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn train_example_counts_updates() {
        let mut mlp = net(&[2, 2], 3);
        let mut trainer = mlp.trainer();
        for _ in 0..3 {
            mlp.train_example(&[0.5, 0.5], &[1.0, 0.0], &mut trainer)
                .unwrap();
        }
        assert_eq!(mlp.updates(), 3);
        assert_eq!(mlp.state(), TrainingState::Trained);
        assert_eq!(trainer.deltas.delta(0), &[] as &[f32]);
        assert_eq!(trainer.deltas.delta(1).len(), 2);
    }
}
