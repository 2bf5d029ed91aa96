//! Answer grading shared by the synchronous check endpoint and the async
//! check consumer, so both paths score identically.

/// Score for a correct answer.
pub const FULL_SCORE: i32 = 100;

/// Score for an incorrect (or not yet checked) answer.
pub const ZERO_SCORE: i32 = 0;

/// Normalize an answer string before comparison.
///
/// Only surrounding whitespace is stripped; interior whitespace is
/// significant.
pub fn normalize(answer: &str) -> &str {
    answer.trim()
}

/// Grade a candidate answer against the canonical answer.
///
/// Returns [`FULL_SCORE`] on exact equality after normalization of both
/// sides, [`ZERO_SCORE`] otherwise.
pub fn grade(candidate: &str, canonical: &str) -> i32 {
    if normalize(candidate) == normalize(canonical) {
        FULL_SCORE
    } else {
        ZERO_SCORE
    }
}

/// Returns true if `score` is one of the two values the schema permits.
pub fn is_valid_score(score: i32) -> bool {
    score == ZERO_SCORE || score == FULL_SCORE
}
