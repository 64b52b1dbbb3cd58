use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExpressionErr, Result};

/// The emotions the classifier was trained on, in class index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Self::Angry,
        Self::Disgust,
        Self::Fear,
        Self::Happy,
        Self::Sad,
        Self::Surprise,
        Self::Neutral,
    ];

    /// Maps a classifier output class to its emotion.
    pub fn from_class(class: usize) -> Option<Self> {
        Self::ALL.get(class).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Angry => "Angry",
            Self::Disgust => "Disgust",
            Self::Fear => "Fear",
            Self::Happy => "Happy",
            Self::Sad => "Sad",
            Self::Surprise => "Surprise",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of classifier output: the probability of a class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub class: usize,
    pub score: f32,
}

/// The confidence of one emotion, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub emotion: Emotion,
    pub percent: f32,
}

/// Turns raw class probabilities into labelled percentages, most likely first.
///
/// # Errors
/// Returns `ExpressionErr::UnknownClass` if a class has no emotion.
pub fn rank_scores(raw: &[ClassScore]) -> Result<Vec<Score>> {
    let mut scores = raw
        .iter()
        .map(|cs| {
            let emotion = Emotion::from_class(cs.class).ok_or(ExpressionErr::UnknownClass(cs.class))?;
            Ok(Score {
                emotion,
                percent: cs.score * 100.0,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    scores.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_indices_follow_training_order() {
        assert_eq!(Emotion::from_class(3), Some(Emotion::Happy));
        assert_eq!(Emotion::from_class(5), Some(Emotion::Surprise));
        assert_eq!(Emotion::from_class(7), None);
    }

    #[test]
    fn scores_are_sorted_percentages() {
        let raw = [
            ClassScore { class: 4, score: 0.1 },
            ClassScore { class: 3, score: 0.75 },
            ClassScore { class: 6, score: 0.15 },
        ];
        let ranked = rank_scores(&raw).unwrap();
        let emotions: Vec<_> = ranked.iter().map(|s| s.emotion).collect();
        assert_eq!(emotions, [Emotion::Happy, Emotion::Neutral, Emotion::Sad]);
        assert!((ranked[0].percent - 75.0).abs() < 1e-4);
    }

    #[test]
    fn unknown_class_is_an_error() {
        let raw = [ClassScore { class: 9, score: 1.0 }];
        assert!(matches!(rank_scores(&raw), Err(ExpressionErr::UnknownClass(9))));
    }
}
