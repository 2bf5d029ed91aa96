//! Recommendation pipeline: a fixed, ordered chain of pure filter stages
//! narrowing the candidate set down to the single next problem for a user.
//!
//! Greedy lexicographic minimization over (solved-exclusion, level,
//! popularity, recency): the easiest, least-attempted-by-others, newest
//! unsolved problem wins. The stages must not be reordered.

use chrono::{DateTime, Utc};

/// One problem as seen by the pipeline, with everything the stages need
/// precomputed by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub problem_id: i32,
    pub level: i32,
    /// Total submissions by anyone, a popularity proxy.
    pub submission_count: i64,
    /// True when the requesting user has a 100-score submission.
    pub solved_by_user: bool,
    pub created_at: DateTime<Utc>,
}

type Stage = fn(Vec<Candidate>) -> Vec<Candidate>;

/// The filter chain, applied in order. Each stage consumes the previous
/// stage's survivors; an empty set propagates trivially to the end.
const STAGES: &[Stage] = &[exclude_solved, min_level, least_submitted, latest_first];

/// Run the full pipeline and return the recommended problem id, or `None`
/// when nothing is left to recommend.
pub fn recommend(candidates: Vec<Candidate>) -> Option<Candidate> {
    let mut survivors = candidates;
    for stage in STAGES {
        survivors = stage(survivors);
    }
    survivors.into_iter().next()
}

/// Stage 1: drop every problem the user has already solved.
fn exclude_solved(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.into_iter().filter(|c| !c.solved_by_user).collect()
}

/// Stage 2: keep only problems at the minimum surviving level.
fn min_level(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let Some(min) = candidates.iter().map(|c| c.level).min() else {
        return candidates;
    };
    candidates.into_iter().filter(|c| c.level == min).collect()
}

/// Stage 3: keep only problems with the minimum total submission count.
fn least_submitted(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let Some(min) = candidates.iter().map(|c| c.submission_count).min() else {
        return candidates;
    };
    candidates
        .into_iter()
        .filter(|c| c.submission_count == min)
        .collect()
}

/// Stage 4: pure ordering, no filtering. Creation time descending; id
/// descending breaks ties between equal timestamps (the newer row wins).
fn latest_first(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.problem_id.cmp(&a.problem_id))
    });
    candidates
}
