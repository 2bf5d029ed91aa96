use sea_orm::*;
use sea_query::{Index, PostgresQueryBuilder};
use tracing::{info, warn};

use crate::entity::submission;

/// Ensure the constraints exist that schema-sync cannot express.
///
/// CHECK constraints and the composite UNIQUE on (user_id, problem_id) are
/// created manually on startup; each statement is idempotent.
pub async fn ensure_constraints(db: &DatabaseConnection) {
    // At most one submission per (user, problem). This index is the
    // authoritative guard for the get-or-create race: the losing insert
    // fails with a unique violation and is retried as a lookup.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_submission_user_problem")
        .table(submission::Entity)
        .col(submission::Column::UserId)
        .col(submission::Column::ProblemId)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured unique index idx_submission_user_problem exists"),
        Err(e) => warn!("Failed to create index idx_submission_user_problem: {}", e),
    }

    ensure_check(db, "problem", "level_range", "level >= 1 AND level <= 5").await;
    ensure_check(db, "submission", "submission_score_values", "score IN (0, 100)").await;
    ensure_check(db, "solution", "solution_score_values", "score IN (0, 100)").await;
}

/// Recreate a named CHECK constraint on a table.
async fn ensure_check(db: &DatabaseConnection, table: &str, name: &str, expr: &str) {
    let drop = format!("ALTER TABLE \"{table}\" DROP CONSTRAINT IF EXISTS \"{name}\"");
    if let Err(e) = db.execute_unprepared(&drop).await {
        warn!("Failed to drop constraint {name}: {e}");
        return;
    }

    let add = format!("ALTER TABLE \"{table}\" ADD CONSTRAINT \"{name}\" CHECK ({expr})");
    match db.execute_unprepared(&add).await {
        Ok(_) => info!("Ensured constraint {name} on {table} exists"),
        Err(e) => warn!("Failed to create constraint {name}: {e}"),
    }
}
