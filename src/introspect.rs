//! Training observability.
//!
//! Every training update produces a [`Step`]. Steps are handed to any number of
//! subscribers registered on an [`Introspection`]; the engine never reads them back.
//! An [`Interrupter`] lets another thread stop a run between two examples.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

/// Snapshot of one training update.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// 1-based epoch.
    pub epoch: usize,
    /// Index of the example in the caller's inputs.
    pub example: usize,
    /// 1-based count of updates within this run.
    pub iteration: usize,
    /// Squared error of the output before the update.
    pub loss: f32,
    /// Per-layer state, present when layer capture is enabled.
    pub layers: Option<Vec<LayerSnapshot>>,
}

/// Activations and deltas of one layer at the time of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSnapshot {
    pub name: String,
    pub activations: Vec<f32>,
    /// Empty for the input layer.
    pub deltas: Vec<f32>,
}

type Subscriber<'a> = Box<dyn FnMut(&Step) + 'a>;

/// Fan-out of training steps to independent subscribers.
///
/// ```rust
/// use digit_mlp::Introspection;
///
/// let mut seen = 0;
/// let mut hooks = Introspection::new().subscribe(|_step| seen += 1);
/// let rx = hooks.channel();
/// # drop(hooks);
/// # drop(rx);
/// ```
#[derive(Default)]
pub struct Introspection<'a> {
    subscribers: Vec<Subscriber<'a>>,
}

impl<'a> Introspection<'a> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Register a callback invoked with every step.
    pub fn subscribe<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Step) + 'a,
    {
        self.subscribers.push(Box::new(f));
        self
    }

    /// Register a channel subscriber and return its receiving end.
    ///
    /// Steps sent after the receiver is dropped are discarded.
    pub fn channel(&mut self) -> mpsc::Receiver<Step> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(Box::new(move |step: &Step| {
            let _ = tx.send(step.clone());
        }));
        rx
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn emit(&mut self, step: &Step) {
        for subscriber in &mut self.subscribers {
            subscriber(step);
        }
    }
}

impl fmt::Debug for Introspection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Introspection")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Shared stop flag, checked before every training example.
#[derive(Debug, Clone, Default)]
pub struct Interrupter {
    state: Arc<AtomicBool>,
}

impl Interrupter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running training loop to stop.
    pub fn stop(&self) {
        self.state.store(true, Ordering::Relaxed);
    }

    /// Clear a previous stop request.
    pub fn reset(&self) {
        self.state.store(false, Ordering::Relaxed);
    }

    /// True if `stop` has been called since the last `reset`.
    pub fn should_stop(&self) -> bool {
        self.state.load(Ordering::Relaxed)
    }
}
