//! Consistency: agreement of primary tags across repeated runs.

use std::collections::BTreeMap;

use crate::payload::ParseResult;

/// Counts primary tag votes from repeated runs of one scenario.
///
/// A run that produced no usable tag votes `error_<n>`, where `n` is its
/// 1-based position, so failed runs never agree with anything.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyTally {
    votes: Vec<String>,
}

impl ConsistencyTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tag of a parsed payload.
    pub fn record(&mut self, parsed: &ParseResult) {
        self.record_tag(parsed.primary_tag());
    }

    /// Record a tag directly; `None` and blank tags count as errors.
    pub fn record_tag(&mut self, tag: Option<&str>) {
        let vote = match tag.map(str::trim) {
            Some(tag) if !tag.is_empty() => tag.to_string(),
            _ => format!("error_{}", self.votes.len() + 1),
        };
        self.votes.push(vote);
    }

    pub fn votes(&self) -> &[String] {
        &self.votes
    }

    /// The most common label and its count.
    pub fn mode(&self) -> Option<(&str, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for vote in &self.votes {
            *counts.entry(vote.as_str()).or_default() += 1;
        }
        counts.into_iter().max_by_key(|(_, count)| *count)
    }

    /// Mode count over total votes. 0 when nothing was recorded.
    pub fn score(&self) -> f64 {
        match self.mode() {
            Some((_, count)) => count as f64 / self.votes.len() as f64,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_deterministic_generator_scores_one() {
        let mut tally = ConsistencyTally::new();
        for _ in 0..3 {
            tally.record_tag(Some("focus_piano_calm"));
        }
        assert_eq!(tally.score(), 1.0);
    }

    #[test]
    fn test_three_distinct_tags_score_a_third() {
        let mut tally = ConsistencyTally::new();
        tally.record_tag(Some("focus_piano_calm"));
        tally.record_tag(Some("focus_ambient_calm"));
        tally.record_tag(Some("focus_lo-fi_dreamy"));
        assert!((tally.score() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_failures_never_agree() {
        let mut tally = ConsistencyTally::new();
        tally.record(&ParseResult::parse("garbage"));
        tally.record_tag(None);
        tally.record_tag(Some("   "));
        assert_eq!(tally.votes(), ["error_1", "error_2", "error_3"]);
        assert!((tally.score() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_failure_counts_as_disagreeing_vote() {
        let mut tally = ConsistencyTally::new();
        tally.record_tag(Some("relax_jazz_groovy"));
        tally.record_tag(None);
        tally.record_tag(Some("relax_jazz_groovy"));
        assert!((tally.score() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(tally.mode(), Some(("relax_jazz_groovy", 2)));
    }

    #[test]
    fn test_empty_tally() {
        assert_eq!(ConsistencyTally::new().score(), 0.0);
    }

    proptest! {
        #[test]
        fn score_bounded_by_vote_count(
            tags in proptest::collection::vec(proptest::option::of("[a-c]"), 1..8)
        ) {
            let mut tally = ConsistencyTally::new();
            for tag in &tags {
                tally.record_tag(tag.as_deref());
            }
            let score = tally.score();
            prop_assert!(score >= 1.0 / tags.len() as f64 - 1e-9);
            prop_assert!(score <= 1.0);
        }
    }
}
