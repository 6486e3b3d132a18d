//! Accuracy: semantic closeness to the evaluation criteria plus a judged
//! logic score.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Weights of the two accuracy sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyWeights {
    pub semantic: f64,
    pub judged: f64,
}

impl Default for AccuracyWeights {
    fn default() -> Self {
        Self {
            semantic: 0.3,
            judged: 0.7,
        }
    }
}

/// Both accuracy sub-scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyScore {
    pub semantic: f64,
    pub judged: f64,
}

impl AccuracyScore {
    /// Score for a payload with no reasoning text.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Weighted total, clamped to `[0, 100]`.
    pub fn total(&self, weights: &AccuracyWeights) -> f64 {
        let total = weights.semantic * self.semantic + weights.judged * self.judged;
        if total.is_finite() {
            total.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Cosine similarity of two embeddings.
///
/// `None` for mismatched lengths, empty vectors or a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Semantic sub-score: cosine similarity scaled to `[0, 100]`, floored at 0.
pub fn semantic_score(criteria: &[f32], reasoning: &[f32]) -> f64 {
    cosine_similarity(criteria, reasoning)
        .map(|sim| (sim * 100.0).clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

/// Judged sub-score from a `{"score": .., "reason": ..}` reply.
///
/// Accepts numbers and numeric strings; clamps to `[0, 100]`. Returns
/// `None` when the score is missing or not numeric.
pub fn judged_score(reply: &Value) -> Option<f64> {
    let score = match reply.get("score")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then(|| score.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_default_weights() {
        let weights = AccuracyWeights::default();
        let score = AccuracyScore {
            semantic: 50.0,
            judged: 100.0,
        };
        assert!((score.total(&weights) - 85.0).abs() < 1e-9);
        assert_eq!(AccuracyScore::zero().total(&weights), 0.0);
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), None);
        let same = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((same - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_semantic_score_floors_negative_similarity() {
        assert_eq!(semantic_score(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert!((semantic_score(&[1.0, 0.0], &[1.0, 0.0]) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_judged_score_parsing() {
        assert_eq!(judged_score(&json!({"score": 85, "reason": "ok"})), Some(85.0));
        assert_eq!(judged_score(&json!({"score": "70"})), Some(70.0));
        assert_eq!(judged_score(&json!({"score": 140})), Some(100.0));
        assert_eq!(judged_score(&json!({"score": "great"})), None);
        assert_eq!(judged_score(&json!({"reason": "no score"})), None);
    }

    proptest! {
        #[test]
        fn total_stays_in_range(semantic in -1e6f64..1e6, judged in -1e6f64..1e6) {
            let total = AccuracyScore { semantic, judged }.total(&AccuracyWeights::default());
            prop_assert!((0.0..=100.0).contains(&total));
        }

        #[test]
        fn semantic_score_stays_in_range(
            a in proptest::collection::vec(-10.0f32..10.0, 1..16),
            b in proptest::collection::vec(-10.0f32..10.0, 1..16),
        ) {
            let score = semantic_score(&a, &b);
            prop_assert!((0.0..=100.0).contains(&score));
        }
    }
}
