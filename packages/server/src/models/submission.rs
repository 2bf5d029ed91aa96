use chrono::{DateTime, Utc};
use common::CheckState;
use serde::{Deserialize, Serialize};

use super::shared::validate_answer_text;
use crate::error::AppError;

/// Request body for submitting a solution attempt.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitSolutionRequest {
    /// The answer to be checked.
    #[schema(example = "55")]
    pub answer: String,
}

pub fn validate_submit_solution_request(payload: &SubmitSolutionRequest) -> Result<(), AppError> {
    validate_answer_text(&payload.answer)
}

/// A user's standing on one problem.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    #[schema(example = 10)]
    pub id: i32,
    pub problem_id: i32,
    /// 0 until any solution scores full marks, then 100.
    #[schema(example = 100)]
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::submission::Model> for SubmissionResponse {
    fn from(submission: crate::entity::submission::Model) -> Self {
        Self {
            id: submission.id,
            problem_id: submission.problem_id,
            score: submission.score,
            created_at: submission.created_at,
            updated_at: submission.updated_at,
        }
    }
}

/// One solution attempt and its check progress.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SolutionResponse {
    #[schema(example = 33)]
    pub id: i32,
    pub answer: String,
    /// Final score once `check_state` is `CheckDone`; 0 before that.
    pub score: i32,
    #[schema(value_type = String, example = "CheckDone")]
    pub check_state: CheckState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::solution::Model> for SolutionResponse {
    fn from(solution: crate::entity::solution::Model) -> Self {
        Self {
            id: solution.id,
            answer: solution.answer,
            score: solution.score,
            check_state: solution.check_state,
            created_at: solution.created_at,
            updated_at: solution.updated_at,
        }
    }
}

/// Acknowledgement that a solution was stored and queued for checking.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SolutionAcceptedResponse {
    pub problem_id: i32,
    pub solution_id: i32,
    /// Always `"accepted"`; poll the solutions endpoint for the verdict.
    #[schema(example = "accepted")]
    pub status: &'static str,
}
