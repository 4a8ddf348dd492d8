//! The fixed emotion label set the classifier predicts over.
//!
//! The ordering is the FER dataset ordering the model was trained with and
//! is load-bearing: score vectors are aligned to it by index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of classes the classifier outputs.
pub const NUM_EMOTIONS: usize = 7;

/// All labels, in score-vector index order.
pub const EMOTION_LABELS: [EmotionLabel; NUM_EMOTIONS] = [
    EmotionLabel::Angry,
    EmotionLabel::Disgust,
    EmotionLabel::Fear,
    EmotionLabel::Happy,
    EmotionLabel::Sad,
    EmotionLabel::Surprise,
    EmotionLabel::Neutral,
];

/// One emotion class of the FER label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    /// The wire form of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }

    /// Position of this label in the score vector.
    pub fn index(&self) -> usize {
        EMOTION_LABELS
            .iter()
            .position(|l| l == self)
            .expect("label is a member of EMOTION_LABELS")
    }

    /// Label for a score-vector index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        EMOTION_LABELS.get(index).copied()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EMOTION_LABELS
            .iter()
            .find(|l| l.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown emotion label: {s}"))
    }
}
