use serde::Serialize;

use crate::classifier::{ClassificationResult, Polarity};

/// Two-entry sentiment view: the first result and everything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentView {
    pub primary: ClassificationResult,
    pub complementary: ClassificationResult,
}

impl SentimentView {
    /// `[primary, complementary]`, in chart order.
    pub fn entries(&self) -> [&ClassificationResult; 2] {
        [&self.primary, &self.complementary]
    }

    /// Fraction of the total score held by each entry; zeros when the total is zero.
    pub fn shares(&self) -> [f32; 2] {
        let total = self.primary.score + self.complementary.score;
        if total > 0.0 {
            [self.primary.score / total, self.complementary.score / total]
        } else {
            [0.0, 0.0]
        }
    }
}

/// Reduces ordered results to a [`SentimentView`]. Returns `None` for an empty slice.
///
/// The primary entry is `results[0]` unchanged. The complementary entry is
/// named after the primary label's polarity and scores the sum of every
/// other result.
pub fn aggregate(results: &[ClassificationResult]) -> Option<SentimentView> {
    let (primary, rest) = results.split_first()?;
    let complementary = ClassificationResult::new(
        Polarity::of(&primary.label).complement_label(),
        rest.iter().map(|r| r.score).sum(),
    );
    Some(SentimentView {
        primary: primary.clone(),
        complementary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, score: f32) -> ClassificationResult {
        ClassificationResult::new(label, score)
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn test_single_emotion_label() {
        let view = aggregate(&[result("LABEL_1", 0.87)]).unwrap();
        assert_eq!(view.primary, result("LABEL_1", 0.87));
        assert_eq!(view.complementary, result("NON-NEUTRAL", 0.0));
    }

    #[test]
    fn test_positive_with_others() {
        let view = aggregate(&[
            result("POSITIVE", 0.9),
            result("NEGATIVE", 0.05),
            result("NEUTRAL", 0.05),
        ])
        .unwrap();
        assert_eq!(view.primary, result("POSITIVE", 0.9));
        assert_eq!(view.complementary.label, "NON-POSITIVE");
        assert!((view.complementary.score - 0.10).abs() < 1e-6);
    }

    #[test]
    fn test_negative_primary() {
        let view = aggregate(&[result("NEGATIVE", 0.6), result("POSITIVE", 0.4)]).unwrap();
        assert_eq!(view.complementary.label, "NON-NEGATIVE");
        assert!((view.complementary.score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_complement_sums_every_other_result() {
        let results: Vec<_> = (0..5)
            .map(|i| result(&format!("LABEL_{}", i), 0.1 * (i + 1) as f32))
            .collect();
        let view = aggregate(&results).unwrap();
        let expected: f32 = results[1..].iter().map(|r| r.score).sum();
        assert_eq!(view.entries()[0], &results[0]);
        assert!((view.complementary.score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_shares() {
        let view = aggregate(&[result("POSITIVE", 0.75), result("NEGATIVE", 0.25)]).unwrap();
        let [a, b] = view.shares();
        assert!((a - 0.75).abs() < 1e-6 && (b - 0.25).abs() < 1e-6);

        let empty = aggregate(&[result("POSITIVE", 0.0)]).unwrap();
        assert_eq!(empty.shares(), [0.0, 0.0]);
    }
}
