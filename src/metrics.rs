//! Metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop).

/// Scores must exceed this floor for `classify` to pick a class.
pub const DEFAULT_FLOOR: f32 = 0.0;

/// Pick the class with the highest score.
///
/// Ties go to the first occurrence. Returns `None` ("no digit detected") when no
/// score is strictly greater than [`DEFAULT_FLOOR`].
#[inline]
pub fn classify(scores: &[f32]) -> Option<usize> {
    classify_above(scores, DEFAULT_FLOOR)
}

/// Like [`classify`] with an explicit floor.
pub fn classify_above(scores: &[f32], floor: f32) -> Option<usize> {
    let mut best = floor;
    let mut class = None;
    for (i, &s) in scores.iter().enumerate() {
        if s > best {
            best = s;
            class = Some(i);
        }
    }
    class
}

/// Accumulates classification accuracy sample by sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accuracy {
    correct: usize,
    total: usize,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one example; a prediction is correct when its class matches the label's.
    #[inline]
    pub fn record(&mut self, scores: &[f32], label: &[f32]) {
        self.total += 1;
        if let Some(class) = classify(scores) {
            if classify(label) == Some(class) {
                self.correct += 1;
            }
        }
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Fraction of correct predictions, or 0 when nothing was recorded.
    pub fn value(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_first_maximum() {
        assert_eq!(classify(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(classify(&[0.9]), Some(0));
    }

    #[test]
    fn classify_reports_nothing_at_or_below_floor() {
        assert_eq!(classify(&[0.0, 0.0, 0.0]), None);
        assert_eq!(classify(&[-1.0, -0.5]), None);
        assert_eq!(classify(&[]), None);
        assert_eq!(classify_above(&[0.2, 0.4], 0.5), None);
        assert_eq!(classify_above(&[0.2, 0.6], 0.5), Some(1));
    }

    #[test]
    fn accuracy_counts_matching_classes() {
        let mut acc = Accuracy::new();
        acc.record(&[0.1, 0.9], &[0.0, 1.0]);
        acc.record(&[0.8, 0.2], &[0.0, 1.0]);
        acc.record(&[0.0, 0.0], &[1.0, 0.0]);
        acc.record(&[0.6, 0.4], &[1.0, 0.0]);
        assert_eq!(acc.correct(), 2);
        assert_eq!(acc.total(), 4);
        assert!((acc.value() - 0.5).abs() < 1e-6);
        assert_eq!(Accuracy::new().value(), 0.0);
    }
}
