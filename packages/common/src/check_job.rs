use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An answer-check job message sent to the check queue.
///
/// The payload carries only row identifiers; the consumer re-reads the
/// solution and the canonical answer from the database so that a redelivered
/// message always scores against current data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckJob {
    /// Job identifier (UUID).
    pub job_id: String,
    /// ID of the problem whose canonical answer is compared against.
    pub problem_id: i32,
    /// ID of the solution attempt to score.
    pub solution_id: i32,
}

impl CheckJob {
    /// Create a new check job with a generated UUID.
    pub fn new(problem_id: i32, solution_id: i32) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            problem_id,
            solution_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_job_ids() {
        let a = CheckJob::new(1, 1);
        let b = CheckJob::new(1, 1);
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn serializes_row_ids() {
        let job = CheckJob::new(7, 42);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["problem_id"], 7);
        assert_eq!(value["solution_id"], 42);
        assert!(value["job_id"].is_string());
    }
}
