//! Shaping raw score vectors into labeled predictions.

use super::labels::{EmotionLabel, EMOTION_LABELS, NUM_EMOTIONS};

/// A labeled classification of one image.
///
/// Derived deterministically from a score vector and immutable once built.
/// The full vector is retained so clients can render every class score, not
/// just the winner.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionPrediction {
    /// The winning class.
    pub label: EmotionLabel,
    /// The raw score at the winning index.
    pub confidence: f32,
    scores: [f32; NUM_EMOTIONS],
}

impl EmotionPrediction {
    /// Selects the arg-max of `scores` (first occurrence wins on ties) and
    /// maps it onto the fixed label set.
    ///
    /// Total over any score vector, including all-zero or negative inputs.
    pub fn from_scores(scores: [f32; NUM_EMOTIONS]) -> Self {
        let mut best = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = i;
            }
        }
        Self {
            label: EMOTION_LABELS[best],
            confidence: scores[best],
            scores,
        }
    }

    /// The raw per-class scores, index-aligned with the label set.
    pub fn scores(&self) -> &[f32; NUM_EMOTIONS] {
        &self.scores
    }

    /// Every label paired with its score, in label-set order.
    pub fn confidences(&self) -> impl Iterator<Item = (EmotionLabel, f32)> + '_ {
        EMOTION_LABELS.iter().copied().zip(self.scores.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_selects_highest_score() {
        let pred = EmotionPrediction::from_scores([0.01, 0.02, 0.03, 0.9, 0.01, 0.02, 0.01]);
        assert_eq!(pred.label, EmotionLabel::Happy);
        assert_eq!(pred.confidence, 0.9);
    }

    #[test]
    fn test_ties_break_to_lowest_index() {
        let pred = EmotionPrediction::from_scores([0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(pred.label, EmotionLabel::Angry);

        let pred = EmotionPrediction::from_scores([0.1, 0.7, 0.7, 0.1, 0.1, 0.1, 0.1]);
        assert_eq!(pred.label, EmotionLabel::Disgust);
    }

    #[test]
    fn test_total_over_degenerate_inputs() {
        let zeros = EmotionPrediction::from_scores([0.0; NUM_EMOTIONS]);
        assert_eq!(zeros.label, EmotionLabel::Angry);
        assert_eq!(zeros.confidence, 0.0);

        let negative = EmotionPrediction::from_scores([-3.0, -1.0, -2.0, -4.0, -5.0, -6.0, -7.0]);
        assert_eq!(negative.label, EmotionLabel::Disgust);
        assert_eq!(negative.confidence, -1.0);
    }

    #[test]
    fn test_deterministic_for_equal_inputs() {
        let scores = [0.1, 0.2, 0.15, 0.05, 0.25, 0.1, 0.15];
        assert_eq!(
            EmotionPrediction::from_scores(scores),
            EmotionPrediction::from_scores(scores)
        );
    }

    #[test]
    fn test_confidence_equals_max_of_scores() {
        let scores = [0.3, 0.1, 0.2, 0.05, 0.15, 0.12, 0.08];
        let pred = EmotionPrediction::from_scores(scores);
        let max = scores.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(pred.confidence, max);
    }

    #[test]
    fn test_confidences_cover_all_labels_in_order() {
        let pred = EmotionPrediction::from_scores([0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let pairs: Vec<_> = pred.confidences().collect();
        assert_eq!(pairs.len(), NUM_EMOTIONS);
        for (i, (label, score)) in pairs.iter().enumerate() {
            assert_eq!(*label, EMOTION_LABELS[i]);
            assert_eq!(*score, pred.scores()[i]);
        }
    }
}
