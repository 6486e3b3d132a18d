//! Stability: did the recommender produce a usable structure at all?

use crate::payload::ParseResult;

/// 1 for a valid payload, 0 otherwise.
pub fn stability_score(parsed: &ParseResult) -> u8 {
    u8::from(parsed.is_valid())
}
