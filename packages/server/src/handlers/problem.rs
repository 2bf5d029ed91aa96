use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{answer, category, commentary, problem, submission};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::problem::{
    AnswerResponse, CommentaryResponse, CreateProblemRequest, ProblemListQuery, ProblemResponse,
    UpdateProblemRequest, validate_create_problem_request, validate_update_problem_request,
};
use crate::recommend;
use crate::repo::problem::ProblemFilter;
use crate::repo::submission::has_solved;
use crate::state::AppState;

async fn ensure_category_exists<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
) -> Result<(), AppError> {
    category::Entity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Unknown category {category_id}")))?;
    Ok(())
}

/// Create a problem together with its answer and commentary rows.
#[utoipa::path(
    post,
    path = "/",
    tag = "Problems",
    operation_id = "createProblem",
    summary = "Create a new problem",
    request_body = CreateProblemRequest,
    responses(
        (status = 201, description = "Problem created", body = ProblemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Name already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_problem(
    State(state): State<AppState>,
    auth_user: AuthUser,
    AppJson(payload): AppJson<CreateProblemRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_problem_request(&payload)?;

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;

    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&txn, category_id).await?;
    }

    let answer = answer::ActiveModel {
        answer: Set(payload.answer),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let commentary = commentary::ActiveModel {
        comment: Set(payload.commentary),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let created = problem::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        level: Set(payload.level),
        description: Set(payload.description),
        category_id: Set(payload.category_id),
        owner_id: Set(auth_user.user_id),
        answer_id: Set(answer.id),
        commentary_id: Set(commentary.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(ProblemResponse::from(created))))
}

/// List problems, optionally filtered by level and category.
#[utoipa::path(
    get,
    path = "/",
    tag = "Problems",
    operation_id = "listProblems",
    summary = "List problems filtered by level and category",
    params(ProblemListQuery),
    responses(
        (status = 200, description = "Matching problems", body = Vec<ProblemResponse>),
        (status = 400, description = "Malformed filter (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_problems(
    State(state): State<AppState>,
    Query(query): Query<ProblemListQuery>,
) -> Result<Json<Vec<ProblemResponse>>, AppError> {
    let filter = ProblemFilter::parse(query.levels.as_deref(), query.categories.as_deref())?;

    let problems = state.problem_repo().get_filtered(&filter).await?;
    Ok(Json(
        problems.into_iter().map(ProblemResponse::from).collect(),
    ))
}

/// Get one problem.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Problems",
    operation_id = "getProblem",
    summary = "Get a problem by ID",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Problem details", body = ProblemResponse),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_problem(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProblemResponse>, AppError> {
    let problem = state.problem_repo().get_by_id(id).await?;
    Ok(Json(ProblemResponse::from(problem)))
}

/// Partially update a problem. Owner only.
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Problems",
    operation_id = "updateProblem",
    summary = "Update a problem",
    params(("id" = i32, Path, description = "Problem ID")),
    request_body = UpdateProblemRequest,
    responses(
        (status = 200, description = "Updated problem", body = ProblemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn update_problem(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateProblemRequest>,
) -> Result<Json<ProblemResponse>, AppError> {
    validate_update_problem_request(&payload)?;

    let repo = state.problem_repo();
    let existing = repo.get_by_id(id).await?;
    if existing.owner_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }

    let now = chrono::Utc::now();

    // One transaction for the whole cascade: a failure on any row (for
    // example a duplicate name) must not leave the answer or commentary
    // half-updated.
    let txn = state.db.begin().await?;
    if let Some(Some(category_id)) = payload.category_id {
        ensure_category_exists(&txn, category_id).await?;
    }
    if let Some(answer_text) = payload.answer {
        answer::ActiveModel {
            id: Set(existing.answer_id),
            answer: Set(answer_text),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&txn)
        .await?;
    }
    if let Some(comment) = payload.commentary {
        commentary::ActiveModel {
            id: Set(existing.commentary_id),
            comment: Set(comment),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&txn)
        .await?;
    }

    let mut active = problem::ActiveModel {
        id: Set(existing.id),
        updated_at: Set(now),
        ..Default::default()
    };
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(level) = payload.level {
        active.level = Set(level);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    // Refresh the cached copy if one is resident, after the commit.
    repo.refresh_if_present(&updated).await;
    Ok(Json(ProblemResponse::from(updated)))
}

/// Delete a problem and its answer and commentary. Owner only.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Problems",
    operation_id = "deleteProblem",
    summary = "Delete a problem",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 204, description = "Problem deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Problem has submissions (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_problem(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let existing = problem::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Problem {id} not found")))?;
    if existing.owner_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }

    let submission_count = submission::Entity::find()
        .filter(submission::Column::ProblemId.eq(id))
        .count(&state.db)
        .await?;
    if submission_count > 0 {
        return Err(AppError::Conflict(
            "Problem has submissions and cannot be deleted".into(),
        ));
    }

    // Problem first: it holds the FKs to answer and commentary.
    let txn = state.db.begin().await?;
    problem::Entity::delete_by_id(existing.id).exec(&txn).await?;
    answer::Entity::delete_by_id(existing.answer_id)
        .exec(&txn)
        .await?;
    commentary::Entity::delete_by_id(existing.commentary_id)
        .exec(&txn)
        .await?;
    txn.commit().await?;

    // A deleted problem must not keep being served from the cache.
    state.problem_repo().invalidate(existing.id).await;

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_owner_or_solver(
    state: &AppState,
    auth_user: &AuthUser,
    problem: &problem::Model,
) -> Result<(), AppError> {
    if problem.owner_id == auth_user.user_id {
        return Ok(());
    }
    if has_solved(&state.db, auth_user.user_id, problem.id).await? {
        return Ok(());
    }
    Err(AppError::PermissionDenied)
}

/// Get the canonical answer. Owner or solver only.
#[utoipa::path(
    get,
    path = "/{id}/answer",
    tag = "Problems",
    operation_id = "getProblemAnswer",
    summary = "Get a problem's canonical answer",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Canonical answer", body = AnswerResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not owner or solver (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_answer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<AnswerResponse>, AppError> {
    let problem = state.problem_repo().get_by_id(id).await?;
    ensure_owner_or_solver(&state, &auth_user, &problem).await?;

    let answer = answer::Entity::find_by_id(problem.answer_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Problem {id} has no answer row")))?;

    Ok(Json(AnswerResponse {
        answer: answer.answer,
    }))
}

/// Get the commentary. Owner or solver only.
#[utoipa::path(
    get,
    path = "/{id}/commentary",
    tag = "Problems",
    operation_id = "getProblemCommentary",
    summary = "Get a problem's commentary",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Commentary", body = CommentaryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not owner or solver (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_commentary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<CommentaryResponse>, AppError> {
    let problem = state.problem_repo().get_by_id(id).await?;
    ensure_owner_or_solver(&state, &auth_user, &problem).await?;

    let commentary = commentary::Entity::find_by_id(problem.commentary_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Problem {id} has no commentary row")))?;

    Ok(Json(CommentaryResponse {
        comment: commentary.comment,
    }))
}

/// Recommend the next problem for the caller.
#[utoipa::path(
    get,
    path = "/recommend",
    tag = "Problems",
    operation_id = "recommendProblem",
    summary = "Recommend the next problem to attempt",
    responses(
        (status = 200, description = "Recommended problem", body = ProblemResponse),
        (status = 204, description = "Nothing left to recommend"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn recommend_problem(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.problem_repo();
    let candidates = repo.load_candidates(auth_user.user_id).await?;

    match recommend::recommend(candidates) {
        Some(pick) => {
            let problem = repo.get_by_id(pick.problem_id).await?;
            Ok(Json(ProblemResponse::from(problem)).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::cache::memory::MemoryStore;
    use crate::config::{
        AppConfig, AuthConfig, CacheConfig, CheckerConfig, CorsConfig, DatabaseConfig,
        MqAppConfig, ServerConfig,
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_state(db: DatabaseConnection, cache: Option<Arc<dyn CacheStore>>) -> AppState {
        AppState {
            db,
            cache,
            mq: None,
            config: Arc::new(AppConfig {
                server: ServerConfig {
                    host: "127.0.0.1".into(),
                    port: 0,
                    cors: CorsConfig {
                        allow_origins: vec![],
                        max_age: 3600,
                    },
                },
                database: DatabaseConfig { url: String::new() },
                auth: AuthConfig {
                    jwt_secret: "test-secret".into(),
                },
                cache: CacheConfig::default(),
                mq: MqAppConfig::default(),
                checker: CheckerConfig::default(),
            }),
        }
    }

    fn alice() -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "alice".into(),
        }
    }

    fn sample_problem(id: i32, owner_id: i32) -> problem::Model {
        let now = Utc::now();
        problem::Model {
            id,
            name: format!("problem-{id}"),
            level: 2,
            description: "desc".into(),
            category_id: None,
            owner_id,
            answer_id: 20,
            commentary_id: 30,
            created_at: now,
            updated_at: now,
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    #[tokio::test]
    async fn update_cascades_answer_and_problem_in_one_transaction() {
        let existing = sample_problem(7, 1);
        let answer_row = answer::Model {
            id: 20,
            answer: "43".into(),
            created_at: existing.created_at,
            updated_at: existing.updated_at,
        };
        let mut updated = existing.clone();
        updated.name = "renamed".into();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .append_query_results([vec![answer_row]])
            .append_query_results([vec![updated]])
            .into_connection();
        let state = test_state(db.clone(), None);

        let response = update_problem(
            State(state),
            alice(),
            Path(7),
            AppJson(UpdateProblemRequest {
                name: Some("renamed".into()),
                answer: Some("43".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.name, "renamed");

        // One SELECT, then a single transaction holding both updates. A
        // split write would add a third log entry.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2, "expected select + one transaction: {log:?}");
        let txn_dump = format!("{:?}", log[1]);
        let answer_at = txn_dump.find("UPDATE \\\"answer\\\"").unwrap();
        let problem_at = txn_dump.find("UPDATE \\\"problem\\\"").unwrap();
        assert!(answer_at < problem_at);
    }

    #[tokio::test]
    async fn update_rejects_a_non_owner() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_problem(7, 2)]])
            .into_connection();
        let state = test_state(db, None);

        let err = update_problem(
            State(state),
            alice(),
            Path(7),
            AppJson(UpdateProblemRequest {
                level: Some(3),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
    }

    #[tokio::test]
    async fn delete_refuses_a_problem_with_submissions() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_problem(7, 1)]])
            .append_query_results([vec![count_row(2)]])
            .into_connection();
        let state = test_state(db.clone(), None);

        let err = delete_problem(State(state), alice(), Path(7))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let dump = format!("{:?}", db.into_transaction_log());
        assert!(!dump.contains("DELETE"), "refused delete still ran DDL: {dump}");
    }

    #[tokio::test]
    async fn delete_removes_problem_before_its_answer_and_commentary() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_problem(7, 1)]])
            .append_query_results([vec![count_row(0)]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();
        let store = Arc::new(MemoryStore::new());
        store
            .set("problem:7", "{}", Duration::from_secs(300))
            .await
            .unwrap();
        let state = test_state(db.clone(), Some(store.clone()));

        let status = delete_problem(State(state), alice(), Path(7))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        // The problem row holds the FKs, so it goes first.
        let dump = format!("{:?}", db.into_transaction_log());
        let problem_at = dump.find("DELETE FROM \\\"problem\\\"").unwrap();
        let answer_at = dump.find("DELETE FROM \\\"answer\\\"").unwrap();
        let commentary_at = dump.find("DELETE FROM \\\"commentary\\\"").unwrap();
        assert!(problem_at < answer_at && answer_at < commentary_at);

        // The cached copy must not outlive the row.
        assert!(store.get("problem:7").await.unwrap().is_none());
    }
}
