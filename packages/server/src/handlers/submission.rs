use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::CheckJob;
use tracing::{debug, info, instrument, warn};

use crate::entity::solution;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::submission::{
    SolutionAcceptedResponse, SolutionResponse, SubmissionResponse, SubmitSolutionRequest,
    validate_submit_solution_request,
};
use crate::repo::submission::{find_submission, get_or_create_submission, record_solution};
use crate::state::AppState;

/// Get the caller's submission for a problem.
#[utoipa::path(
    get,
    path = "/{id}/submission",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get the caller's submission for a problem",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Submission status", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No submission yet (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_submission(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(problem_id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission = find_submission(&state.db, auth_user.user_id, problem_id).await?;
    Ok(Json(SubmissionResponse::from(submission)))
}

/// List the caller's solutions for a problem, newest first.
#[utoipa::path(
    get,
    path = "/{id}/solutions",
    tag = "Submissions",
    operation_id = "listSolutions",
    summary = "List the caller's solutions for a problem",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Solutions, newest first", body = Vec<SolutionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No submission yet (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_solutions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(problem_id): Path<i32>,
) -> Result<Json<Vec<SolutionResponse>>, AppError> {
    let solutions =
        crate::repo::submission::list_solutions(&state.db, auth_user.user_id, problem_id).await?;
    Ok(Json(
        solutions.into_iter().map(SolutionResponse::from).collect(),
    ))
}

/// Submit a solution attempt. The answer is stored immediately and checked
/// asynchronously; poll the solutions endpoint for the verdict.
#[utoipa::path(
    post,
    path = "/{id}/solutions",
    tag = "Submissions",
    operation_id = "submitSolution",
    summary = "Submit an answer for asynchronous checking",
    params(("id" = i32, Path, description = "Problem ID")),
    request_body = SubmitSolutionRequest,
    responses(
        (status = 202, description = "Stored and queued for checking", body = SolutionAcceptedResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn submit_solution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(problem_id): Path<i32>,
    AppJson(payload): AppJson<SubmitSolutionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_submit_solution_request(&payload)?;

    // 404 before touching the ledger.
    let problem = state.problem_repo().get_by_id(problem_id).await?;

    let submission =
        get_or_create_submission(&state.db, auth_user.user_id, problem.id).await?;
    let solution = record_solution(&state.db, submission.id, payload.answer).await?;

    enqueue_check_job(&state, problem.id, &solution).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(SolutionAcceptedResponse {
            problem_id: problem.id,
            solution_id: solution.id,
            status: "accepted",
        }),
    ))
}

/// Enqueue a check job for a stored solution. Enqueue failures are logged,
/// never returned: the solution stays `PendingCheck` and can be re-driven.
#[instrument(skip(state, solution), fields(solution_id = solution.id))]
async fn enqueue_check_job(state: &AppState, problem_id: i32, solution: &solution::Model) {
    let Some(ref mq) = state.mq else {
        debug!("MQ unavailable, skipping enqueue");
        return;
    };

    let job = CheckJob::new(problem_id, solution.id);
    match mq
        .publish(&state.config.mq.queue_name, None, &job, None)
        .await
    {
        Ok(_) => info!(job_id = %job.job_id, "Check job enqueued"),
        Err(e) => warn!(error = %e, "Failed to enqueue check job"),
    }
}
