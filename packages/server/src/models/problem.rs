use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_answer_text, validate_level, validate_name};
use crate::error::AppError;

/// Request body for creating a problem. The canonical answer and the
/// commentary are created alongside the problem row.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProblemRequest {
    /// Unique problem name (1-50 characters).
    #[schema(example = "fibonacci")]
    pub name: String,
    /// Difficulty level, 1 (easiest) to 5.
    #[schema(example = 2)]
    pub level: i32,
    pub description: String,
    /// Optional category id; must reference an existing category.
    pub category_id: Option<i32>,
    /// Canonical answer used for grading.
    #[schema(example = "55")]
    pub answer: String,
    /// Explanation shown to users who solved the problem.
    pub commentary: String,
}

pub fn validate_create_problem_request(payload: &CreateProblemRequest) -> Result<(), AppError> {
    validate_name(&payload.name)?;
    validate_level(payload.level)?;
    validate_answer_text(&payload.answer)?;
    Ok(())
}

/// Request body for partially updating a problem. Absent fields keep their
/// current values; `category_id: null` detaches the category.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateProblemRequest {
    pub name: Option<String>,
    pub level: Option<i32>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>, nullable)]
    pub category_id: Option<Option<i32>>,
    pub answer: Option<String>,
    pub commentary: Option<String>,
}

pub fn validate_update_problem_request(payload: &UpdateProblemRequest) -> Result<(), AppError> {
    if let Some(name) = &payload.name {
        validate_name(name)?;
    }
    if let Some(level) = payload.level {
        validate_level(level)?;
    }
    if let Some(answer) = &payload.answer {
        validate_answer_text(answer)?;
    }
    Ok(())
}

/// A problem as shown to users. The canonical answer and commentary are
/// served by their own access-controlled endpoints.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProblemResponse {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "fibonacci")]
    pub name: String,
    #[schema(example = 2)]
    pub level: i32,
    pub description: String,
    pub category_id: Option<i32>,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::problem::Model> for ProblemResponse {
    fn from(problem: crate::entity::problem::Model) -> Self {
        Self {
            id: problem.id,
            name: problem.name,
            level: problem.level,
            description: problem.description,
            category_id: problem.category_id,
            owner_id: problem.owner_id,
            created_at: problem.created_at,
            updated_at: problem.updated_at,
        }
    }
}

/// Query parameters for the problem list.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ProblemListQuery {
    /// Comma-separated difficulty levels, e.g. `1,2`.
    pub levels: Option<String>,
    /// Comma-separated category ids, e.g. `3,5`.
    pub categories: Option<String>,
}

/// Canonical answer, visible to the owner and to solvers.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AnswerResponse {
    #[schema(example = "55")]
    pub answer: String,
}

/// Commentary, visible to the owner and to solvers.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentaryResponse {
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_validates_all_fields() {
        let mut payload = CreateProblemRequest {
            name: "fibonacci".into(),
            level: 2,
            description: "d".into(),
            category_id: None,
            answer: "55".into(),
            commentary: "c".into(),
        };
        assert!(validate_create_problem_request(&payload).is_ok());

        payload.level = 0;
        assert!(validate_create_problem_request(&payload).is_err());
        payload.level = 2;
        payload.answer = "  ".into();
        assert!(validate_create_problem_request(&payload).is_err());
    }

    #[test]
    fn update_request_distinguishes_absent_from_null_category() {
        let absent: UpdateProblemRequest = serde_json::from_str(r#"{"level": 3}"#).unwrap();
        assert_eq!(absent.category_id, None);

        let null: UpdateProblemRequest =
            serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(null.category_id, Some(None));

        let set: UpdateProblemRequest = serde_json::from_str(r#"{"category_id": 5}"#).unwrap();
        assert_eq!(set.category_id, Some(Some(5)));
    }

    #[test]
    fn update_request_validates_present_fields_only() {
        let payload = UpdateProblemRequest {
            level: Some(9),
            ..Default::default()
        };
        assert!(validate_update_problem_request(&payload).is_err());
        assert!(validate_update_problem_request(&UpdateProblemRequest::default()).is_ok());
    }
}
