use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{category, problem};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::category::{
    CategoryResponse, CreateCategoryRequest, validate_create_category_request,
};
use crate::state::AppState;

/// List all categories.
#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List all categories",
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(
        categories.into_iter().map(CategoryResponse::from).collect(),
    ))
}

/// Create a category.
#[utoipa::path(
    post,
    path = "/",
    tag = "Categories",
    operation_id = "createCategory",
    summary = "Create a new category",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Name already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(name = %payload.name))]
pub async fn create_category(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_category_request(&payload)?;

    let now = chrono::Utc::now();
    let created = category::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(created))))
}

/// Delete a category. Problems in it are kept and detached.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Categories",
    operation_id = "deleteCategory",
    summary = "Delete a category, detaching its problems",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_category(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let category = category::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {id} not found")))?;

    // Detach problems first so the delete never trips the FK.
    let txn = state.db.begin().await?;
    problem::Entity::update_many()
        .col_expr(problem::Column::CategoryId, Expr::value(Value::Int(None)))
        .filter(problem::Column::CategoryId.eq(category.id))
        .exec(&txn)
        .await?;
    category::Entity::delete_by_id(category.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AppConfig, AuthConfig, CacheConfig, CheckerConfig, CorsConfig, DatabaseConfig,
        MqAppConfig, ServerConfig,
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn test_state(db: DatabaseConnection) -> AppState {
        AppState {
            db,
            cache: None,
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

    fn sample_category(id: i32) -> category::Model {
        let now = Utc::now();
        category::Model {
            id,
            name: format!("category-{id}"),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn delete_detaches_problems_before_removing_the_category() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_category(3)]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();
        let state = test_state(db.clone());

        let status = delete_category(State(state), alice(), Path(3))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        // One SELECT, then one transaction: detach the problems, drop the
        // category.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2, "expected select + one transaction: {log:?}");
        let txn_dump = format!("{:?}", log[1]);
        let detach_at = txn_dump.find("UPDATE \\\"problem\\\"").unwrap();
        let delete_at = txn_dump.find("DELETE FROM \\\"category\\\"").unwrap();
        assert!(detach_at < delete_at);
    }

    #[tokio::test]
    async fn delete_of_a_missing_category_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<category::Model>::new()])
            .into_connection();
        let state = test_state(db);

        let err = delete_category(State(state), alice(), Path(9))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
