//! Diversity: how many distinct tracks a whole run recommended.

use std::collections::HashSet;

use crate::payload::{ParseResult, PARSING_FAILED};

/// Title recorded for a valid payload that names no track.
pub const MISSING_TITLE: &str = "unknown";

/// Run-wide pool of recommended titles, duplicates included.
#[derive(Debug, Clone, Default)]
pub struct DiversityPool {
    titles: Vec<String>,
}

impl DiversityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the first recommended title of a payload.
    pub fn record(&mut self, parsed: &ParseResult) {
        let title = match parsed.first() {
            Some(first) => first.track_title().unwrap_or(MISSING_TITLE).to_string(),
            None => PARSING_FAILED.to_string(),
        };
        self.titles.push(title);
    }

    pub fn record_title(&mut self, title: impl Into<String>) {
        self.titles.push(title.into());
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn distinct(&self) -> usize {
        self.titles.iter().collect::<HashSet<_>>().len()
    }

    /// Distinct over total, as a percentage. 0 for an empty pool.
    pub fn score(&self) -> f64 {
        if self.titles.is_empty() {
            return 0.0;
        }
        self.distinct() as f64 / self.titles.len() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_all_distinct_is_hundred() {
        let mut pool = DiversityPool::new();
        pool.record_title("A");
        pool.record_title("B");
        pool.record_title("C");
        assert_eq!(pool.score(), 100.0);
    }

    #[test]
    fn test_single_title_is_hundred() {
        let mut pool = DiversityPool::new();
        pool.record_title("Only");
        assert_eq!(pool.score(), 100.0);
    }

    #[test]
    fn test_repeats_lower_the_score() {
        let mut pool = DiversityPool::new();
        for title in ["A", "A", "A", "B"] {
            pool.record_title(title);
        }
        assert_eq!(pool.score(), 50.0);
    }

    #[test]
    fn test_placeholders() {
        let mut pool = DiversityPool::new();
        pool.record(&ParseResult::parse("nope"));
        pool.record(&ParseResult::parse(
            r#"[{"recommendation_meta": {}, "track_info": {}, "target_audio_features": {}}]"#,
        ));
        assert_eq!(pool.titles, vec![PARSING_FAILED, MISSING_TITLE]);
    }

    #[test]
    fn test_empty_pool() {
        assert_eq!(DiversityPool::new().score(), 0.0);
    }

    proptest! {
        #[test]
        fn hundred_iff_pairwise_distinct(titles in proptest::collection::vec("[a-d]{1,2}", 1..12)) {
            let mut pool = DiversityPool::new();
            for title in &titles {
                pool.record_title(title.clone());
            }
            let unique = titles.iter().collect::<HashSet<_>>().len() == titles.len();
            prop_assert_eq!(pool.score() == 100.0, unique);
            prop_assert!(pool.score() > 0.0 && pool.score() <= 100.0);
        }
    }
}
