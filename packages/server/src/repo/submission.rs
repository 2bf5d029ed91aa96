//! Submission and solution ledger operations.
//!
//! Free functions generic over the connection so handlers can run them
//! inside or outside a transaction.

use chrono::Utc;
use common::{CheckState, grading};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};

use crate::entity::{solution, submission};
use crate::error::AppError;

/// Look up the unique (user, problem) submission row.
pub async fn find_submission<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    problem_id: i32,
) -> Result<submission::Model, AppError> {
    submission::Entity::find()
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::ProblemId.eq(problem_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No submission for problem {problem_id}"))
        })
}

/// Fetch the (user, problem) submission, creating it with score 0 on first
/// contact.
///
/// Two concurrent first submissions race on the unique (user, problem)
/// index; the loser's insert fails with a unique violation and is retried
/// as a lookup of the winner's row.
pub async fn get_or_create_submission<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    problem_id: i32,
) -> Result<submission::Model, AppError> {
    if let Ok(existing) = find_submission(conn, user_id, problem_id).await {
        return Ok(existing);
    }

    let now = Utc::now();
    let insert = submission::ActiveModel {
        score: Set(grading::ZERO_SCORE),
        user_id: Set(user_id),
        problem_id: Set(problem_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await;

    match insert {
        Ok(model) => Ok(model),
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                find_submission(conn, user_id, problem_id).await
            }
            _ => Err(err.into()),
        },
    }
}

/// Append a new solution to a submission, pending check.
pub async fn record_solution<C: ConnectionTrait>(
    conn: &C,
    submission_id: i32,
    answer: String,
) -> Result<solution::Model, AppError> {
    let now = Utc::now();
    let model = solution::ActiveModel {
        answer: Set(answer),
        score: Set(grading::ZERO_SCORE),
        check_state: Set(CheckState::PendingCheck),
        submission_id: Set(submission_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(model)
}

/// All of a user's solutions for a problem, newest first.
pub async fn list_solutions<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    problem_id: i32,
) -> Result<Vec<solution::Model>, AppError> {
    let submission = find_submission(conn, user_id, problem_id).await?;

    let solutions = solution::Entity::find()
        .filter(solution::Column::SubmissionId.eq(submission.id))
        .order_by_desc(solution::Column::CreatedAt)
        .all(conn)
        .await?;
    Ok(solutions)
}

/// True when the user has a full-score submission for the problem.
pub async fn has_solved<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    problem_id: i32,
) -> Result<bool, AppError> {
    match find_submission(conn, user_id, problem_id).await {
        Ok(submission) => Ok(submission.score == grading::FULL_SCORE),
        Err(AppError::NotFound(_)) => Ok(false),
        Err(err) => Err(err),
    }
}
