//! A from-scratch multilayer perceptron for handwritten digit recognition.
//!
//! `digit-mlp` is a dense feed-forward network trained with online stochastic
//! gradient descent: every example is forwarded, back-propagated and applied to the
//! weights before the next one is looked at.
//!
//! # Design goals
//!
//! - Plain, readable math: sigmoid layers and the classic delta rule, one example at
//!   a time.
//! - Reusable buffers: forward activations live in a [`Scratch`] and back-propagated
//!   errors in [`Deltas`], so layers hold parameters only and a network can be
//!   shared for prediction.
//! - Observable training: every update yields a [`Step`] that any number of
//!   subscribers can watch, and an [`Interrupter`] can cancel a run between examples.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - A [`Frame`] stores examples contiguously in row-major layout, one row per example.
//! - Layer weights are row-major with shape `(width, in_width)`.
//! - The first layer of a network is a parameterless input layer.
//!
//! # Quick start
//!
//! ```rust
//! use digit_mlp::{Frame, MlpBuilder};
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let xs = Frame::from_rows(&[
//!     [0.0_f32, 0.0],
//!     [0.0, 1.0],
//!     [1.0, 0.0],
//!     [1.0, 1.0],
//! ])?;
//! let ys = Frame::from_rows(&[[0.0_f32], [1.0], [1.0], [0.0]])?;
//!
//! let mut mlp = MlpBuilder::new()
//!     .layer("input", 2)
//!     .layer("hidden", 4)
//!     .layer("output", 1)
//!     .learning_rate(0.5)
//!     .build_with_seed(0)?;
//!
//! let report = mlp.train(100, &xs, &ys)?;
//! assert_eq!(report.steps, 400);
//!
//! let out = mlp.predict(&xs)?;
//! assert_eq!(out.len(), 4);
//! assert_eq!(out.width(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Driving training yourself
//!
//! ```rust
//! use digit_mlp::MlpBuilder;
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let mut mlp = MlpBuilder::new()
//!     .layer("input", 3)
//!     .layer("hidden", 8)
//!     .layer("output", 2)
//!     .build_with_seed(0)?;
//!
//! let mut trainer = mlp.trainer();
//! let x = [0.1_f32, -0.2, 0.3];
//! let t = [0.0_f32, 1.0];
//!
//! mlp.forward(&x, &mut trainer.scratch)?;
//! let _loss = mlp.backward(&t, &trainer.scratch, &mut trainer.deltas)?;
//! mlp.apply_deltas(&trainer.scratch, &trainer.deltas)?;
//! assert_eq!(mlp.updates(), 1);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
#[cfg(feature = "serde")]
pub mod config;
pub mod digit_image;
pub mod error;
pub mod frame;
pub mod introspect;
pub mod layer;
pub mod loss;
pub mod metrics;
pub mod mlp;
pub mod mnist;
pub mod serde_model;
pub mod train;

pub use activation::Activation;
pub use builder::{LayerDescriptor, MlpBuilder};
pub use error::{Error, Result};
pub use frame::Frame;
pub use introspect::{Interrupter, Introspection, LayerSnapshot, Step};
pub use layer::{Init, Layer};
pub use mlp::{Deltas, Mlp, Scratch, Trainer, TrainingState};
pub use train::{EvalReport, Shuffle, Steps, TrainOptions, TrainReport};
