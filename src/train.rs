//! The training loop.
//!
//! Training is plain online SGD: every example is forwarded, back-propagated and
//! applied to the weights before the next example is looked at, so `epochs * len`
//! examples produce exactly `epochs * len` updates. There is no early stopping,
//! validation split or convergence check.
//!
//! [`Mlp::steps`] exposes the loop as a lazy iterator that performs one update per
//! `next()`; [`Mlp::train`] and [`Mlp::train_with`] drive it to completion.

use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::metrics::Accuracy;
use crate::{
    Error, Frame, Interrupter, Introspection, LayerSnapshot, Mlp, Result, Step, Trainer, loss,
};

/// Order in which examples are visited within an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shuffle {
    /// The order given by the caller.
    #[default]
    None,
    /// A fresh permutation at the start of every epoch, from a seeded RNG.
    Seeded(u64),
}

/// Knobs for a training run.
#[derive(Debug, Default)]
pub struct TrainOptions<'a> {
    pub shuffle: Shuffle,
    /// Attach per-layer activations and deltas to every `Step`.
    pub capture_layers: bool,
    pub introspection: Introspection<'a>,
    pub interrupter: Option<Interrupter>,
}

impl<'a> TrainOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shuffle(mut self, shuffle: Shuffle) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn capture_layers(mut self, capture: bool) -> Self {
        self.capture_layers = capture;
        self
    }

    pub fn introspection(mut self, introspection: Introspection<'a>) -> Self {
        self.introspection = introspection;
        self
    }

    pub fn interrupter(mut self, interrupter: Interrupter) -> Self {
        self.interrupter = Some(interrupter);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Completed epochs.
    pub epochs: usize,
    /// Updates applied.
    pub steps: usize,
    /// Mean squared error over the last completed epoch.
    pub final_loss: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    /// Mean squared error per example.
    pub loss: f32,
    /// Fraction of examples whose predicted class matches the label's class.
    pub accuracy: f32,
}

/// A training run in progress, one update per item.
///
/// Yields `Ok(Step)` after each update and ends after `epochs * len` items, or
/// after the first `Err` (a wrapped training error or `Cancelled`). Updates made
/// before an error are kept.
#[derive(Debug)]
pub struct Steps<'a> {
    mlp: &'a mut Mlp,
    inputs: &'a Frame,
    labels: &'a Frame,
    trainer: Trainer,
    order: Vec<usize>,
    rng: Option<StdRng>,
    capture_layers: bool,
    interrupter: Option<Interrupter>,
    epochs: usize,
    epoch: usize,
    pos: usize,
    iteration: usize,
    epoch_loss: f32,
    completed_epochs: usize,
    last_epoch_loss: Option<f32>,
    done: bool,
}

impl Steps<'_> {
    /// Summary of the run so far.
    pub fn report(&self) -> TrainReport {
        TrainReport {
            epochs: self.completed_epochs,
            steps: self.iteration,
            final_loss: self.last_epoch_loss,
        }
    }

    fn finish_epoch(&mut self) {
        let mean_loss = self.epoch_loss / self.order.len() as f32;
        self.completed_epochs += 1;
        self.last_epoch_loss = Some(mean_loss);
        tracing::debug!(epoch = self.epoch, mean_loss, "epoch complete");
    }

    fn snapshot(&self) -> Vec<LayerSnapshot> {
        self.mlp
            .layers()
            .iter()
            .enumerate()
            .map(|(idx, layer)| LayerSnapshot {
                name: layer.name().to_owned(),
                activations: self.trainer.scratch.activations(idx).to_vec(),
                deltas: self.trainer.deltas.delta(idx).to_vec(),
            })
            .collect()
    }
}

impl Iterator for Steps<'_> {
    type Item = Result<Step>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.pos == self.order.len() {
            if self.epoch > 0 {
                self.finish_epoch();
            }
            if self.epoch == self.epochs || self.order.is_empty() {
                self.done = true;
                return None;
            }
            self.epoch += 1;
            self.pos = 0;
            self.epoch_loss = 0.0;
            if let Some(rng) = self.rng.as_mut() {
                self.order.shuffle(rng);
            }
        }

        let example = self.order[self.pos];
        if self.interrupter.as_ref().is_some_and(Interrupter::should_stop) {
            self.done = true;
            tracing::info!(epoch = self.epoch, example, "training interrupted");
            return Some(Err(Error::Cancelled {
                epoch: self.epoch,
                example,
            }));
        }

        let (inputs, labels) = (self.inputs, self.labels);
        let loss = match self
            .mlp
            .train_example(inputs.row(example), labels.row(example), &mut self.trainer)
        {
            Ok(loss) => loss,
            Err(e) => {
                self.done = true;
                return Some(Err(Error::training(e)));
            }
        };

        self.pos += 1;
        self.iteration += 1;
        self.epoch_loss += loss;
        tracing::trace!(epoch = self.epoch, example, loss, "step");

        let layers = self.capture_layers.then(|| self.snapshot());
        Some(Ok(Step {
            epoch: self.epoch,
            example,
            iteration: self.iteration,
            loss,
            layers,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let total = self.epochs.saturating_mul(self.order.len());
        (0, Some(total.saturating_sub(self.iteration)))
    }
}

impl Mlp {
    /// Train for `epochs` passes over `inputs`/`labels` with default options.
    ///
    /// A second call continues from the current weights.
    pub fn train(&mut self, epochs: usize, inputs: &Frame, labels: &Frame) -> Result<TrainReport> {
        self.train_with(epochs, inputs, labels, TrainOptions::default())
    }

    /// Train with explicit options, publishing every step to the subscribers in
    /// `options.introspection`.
    ///
    /// Shape checks run before the first update: on failure the weights are left
    /// untouched. Errors are wrapped in `Error::Training`, except `Cancelled`.
    pub fn train_with(
        &mut self,
        epochs: usize,
        inputs: &Frame,
        labels: &Frame,
        mut options: TrainOptions<'_>,
    ) -> Result<TrainReport> {
        let started = Instant::now();
        tracing::info!(
            epochs,
            examples = inputs.len(),
            learning_rate = self.learning_rate(),
            "training started"
        );

        let mut steps = self.steps(epochs, inputs, labels, &options)?;
        for step in steps.by_ref() {
            options.introspection.emit(&step?);
        }
        let report = steps.report();

        tracing::info!(
            epochs = report.epochs,
            steps = report.steps,
            final_loss = ?report.final_loss,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training complete"
        );
        Ok(report)
    }

    /// Start a lazy training run.
    ///
    /// `options.introspection` is not used here: the caller consumes the steps.
    pub fn steps<'a>(
        &'a mut self,
        epochs: usize,
        inputs: &'a Frame,
        labels: &'a Frame,
        options: &TrainOptions<'_>,
    ) -> Result<Steps<'a>> {
        self.check_examples(inputs, labels)
            .map_err(Error::training)?;

        let order: Vec<usize> = (0..inputs.len()).collect();
        let pos = order.len();
        let rng = match options.shuffle {
            Shuffle::None => None,
            Shuffle::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        };

        Ok(Steps {
            trainer: self.trainer(),
            mlp: self,
            inputs,
            labels,
            order,
            rng,
            capture_layers: options.capture_layers,
            interrupter: options.interrupter.clone(),
            epochs,
            epoch: 0,
            pos,
            iteration: 0,
            epoch_loss: 0.0,
            completed_epochs: 0,
            last_epoch_loss: None,
            done: false,
        })
    }

    /// Mean loss and classification accuracy over a labelled frame.
    pub fn evaluate(&self, inputs: &Frame, labels: &Frame) -> Result<EvalReport> {
        self.check_examples(inputs, labels)?;
        if inputs.is_empty() {
            return Err(Error::InvalidData(
                "cannot evaluate on an empty frame".to_owned(),
            ));
        }

        let mut scratch = self.scratch();
        let mut total = 0.0_f32;
        let mut accuracy = Accuracy::new();
        for (input, label) in inputs.rows().zip(labels.rows()) {
            let output = self.forward(input, &mut scratch)?;
            total += loss::mse(output, label);
            accuracy.record(output, label);
        }

        Ok(EvalReport {
            loss: total / inputs.len() as f32,
            accuracy: accuracy.value(),
        })
    }

    fn check_examples(&self, inputs: &Frame, labels: &Frame) -> Result<()> {
        if inputs.len() != labels.len() {
            return Err(Error::DimensionMismatch(format!(
                "inputs/labels length mismatch: {} vs {}",
                inputs.len(),
                labels.len()
            )));
        }
        if inputs.width() != self.input_width() {
            return Err(Error::DimensionMismatch(format!(
                "input width {} does not match input width {} of the network",
                inputs.width(),
                self.input_width()
            )));
        }
        if labels.width() != self.output_width() {
            return Err(Error::DimensionMismatch(format!(
                "label width {} does not match output width {} of the network",
                labels.width(),
                self.output_width()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MlpBuilder;

    fn xor() -> (Frame, Frame) {
        let xs = Frame::from_rows(&[
            [0.0_f32, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [1.0, 1.0],
        ])
        .unwrap();
        let ys = Frame::from_rows(&[[1.0_f32, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0]]).unwrap();
        (xs, ys)
    }

    fn net() -> Mlp {
        MlpBuilder::new()
            .layer("input", 2)
            .layer("hidden", 4)
            .layer("output", 2)
            .learning_rate(0.5)
            .build_with_seed(42)
            .unwrap()
    }

    #[test]
    fn steps_visit_examples_in_order() {
        let (xs, ys) = xor();
        let mut mlp = net();
        let steps: Vec<Step> = mlp
            .steps(2, &xs, &ys, &TrainOptions::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        let visited: Vec<(usize, usize, usize)> = steps
            .iter()
            .map(|s| (s.epoch, s.example, s.iteration))
            .collect();
        assert_eq!(
            visited,
            vec![
                (1, 0, 1),
                (1, 1, 2),
                (1, 2, 3),
                (1, 3, 4),
                (2, 0, 5),
                (2, 1, 6),
                (2, 2, 7),
                (2, 3, 8),
            ]
        );
        assert!(steps.iter().all(|s| s.layers.is_none()));
        assert_eq!(mlp.updates(), 8);
    }

    #[test]
    fn seeded_shuffle_visits_every_example_once_per_epoch() {
        let (xs, ys) = xor();
        let options = TrainOptions::new().shuffle(Shuffle::Seeded(3));

        let mut a = net();
        let order_a: Vec<usize> = a
            .steps(3, &xs, &ys, &options)
            .unwrap()
            .map(|s| s.unwrap().example)
            .collect();
        let mut b = net();
        let order_b: Vec<usize> = b
            .steps(3, &xs, &ys, &options)
            .unwrap()
            .map(|s| s.unwrap().example)
            .collect();

        assert_eq!(order_a, order_b);
        assert_eq!(a, b);
        for epoch in order_a.chunks(4) {
            let mut sorted = epoch.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn captured_layers_match_topology() {
        let (xs, ys) = xor();
        let mut mlp = net();
        let options = TrainOptions::new().capture_layers(true);
        let step = mlp.steps(1, &xs, &ys, &options).unwrap().next().unwrap().unwrap();

        let layers = step.layers.unwrap();
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["input", "hidden", "output"]);
        assert_eq!(layers[0].activations, xs.row(0));
        assert!(layers[0].deltas.is_empty());
        assert_eq!(layers[1].deltas.len(), 4);
        assert_eq!(layers[2].activations.len(), 2);
    }

    #[test]
    fn size_hint_saturates_for_huge_epoch_counts() {
        let (xs, ys) = xor();
        let mut mlp = net();
        let options = TrainOptions::new();
        let mut steps = mlp.steps(usize::MAX, &xs, &ys, &options).unwrap();
        assert_eq!(steps.size_hint(), (0, Some(usize::MAX)));

        let step = steps.next().unwrap().unwrap();
        assert_eq!((step.epoch, step.example, step.iteration), (1, 0, 1));
        assert_eq!(steps.size_hint(), (0, Some(usize::MAX - 1)));
    }

    #[test]
    fn training_reduces_loss_on_xor() {
        let (xs, ys) = xor();
        let mut mlp = net();
        let before = mlp.evaluate(&xs, &ys).unwrap();
        let report = mlp.train(2000, &xs, &ys).unwrap();
        let after = mlp.evaluate(&xs, &ys).unwrap();

        assert_eq!(report.epochs, 2000);
        assert_eq!(report.steps, 8000);
        assert!(after.loss < before.loss);
        assert!(report.final_loss.unwrap().is_finite());
    }

    #[test]
    fn empty_inputs_train_nothing() {
        let mut mlp = net();
        let before = mlp.clone();
        let report = mlp
            .train(5, &Frame::empty(2).unwrap(), &Frame::empty(2).unwrap())
            .unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.final_loss, None);
        assert_eq!(mlp, before);
    }

    #[test]
    fn evaluate_rejects_empty_and_mismatched_frames() {
        let (xs, ys) = xor();
        let mlp = net();
        assert!(mlp.evaluate(&Frame::empty(2).unwrap(), &Frame::empty(2).unwrap()).is_err());
        let err = mlp.evaluate(&xs, &ys.clone().truncated(3)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }
}
