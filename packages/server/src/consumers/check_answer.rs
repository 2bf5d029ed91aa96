use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{CheckJob, CheckState};
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info};

use crate::entity::{solution, submission};
use crate::repo::problem::ProblemRepository;

/// Consume answer-check jobs from the queue.
pub async fn consume_check_jobs(
    db: DatabaseConnection,
    repo: ProblemRepository,
    mq: Arc<Mq>,
    queue_name: String,
    check_delay: Duration,
) {
    info!(queue = %queue_name, "Starting answer check consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // single-threaded for sequential DB writes
            None,
            move |message: BrokerMessage<CheckJob>| {
                let db = db.clone();
                let repo = repo.clone();
                async move {
                    let job = message.payload;
                    let job_id = job.job_id.clone();
                    let solution_id = job.solution_id;

                    if let Err(e) = process_check_job(&db, &repo, job, check_delay).await {
                        error!(
                            solution_id,
                            job_id = %job_id,
                            error = %e,
                            "Failed to process check job"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Answer check consumer stopped unexpectedly");
    }
}

/// Process a single check job: mark the solution as checking, grade after
/// the configured delay, then finalize the solution and promote the
/// submission score in one transaction.
async fn process_check_job(
    db: &DatabaseConnection,
    repo: &ProblemRepository,
    job: CheckJob,
    check_delay: Duration,
) -> anyhow::Result<()> {
    let solution = solution::Entity::find_by_id(job.solution_id)
        .one(db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Solution {} not found", job.solution_id))?;

    // Redelivered jobs for an already-graded solution are no-ops.
    if solution.check_state.is_done() {
        info!(
            solution_id = solution.id,
            "Solution already checked, skipping"
        );
        return Ok(());
    }

    solution::ActiveModel {
        id: Set(solution.id),
        check_state: Set(CheckState::Checking),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .update(db)
    .await?;

    // Simulated grading latency; clients observe the Checking state.
    tokio::time::sleep(check_delay).await;

    let score = repo
        .check_answer(job.problem_id, &solution.answer)
        .await
        .map_err(|e| anyhow::anyhow!("Grading failed for solution {}: {e:?}", solution.id))?;

    let txn = db.begin().await?;

    let now = Utc::now();
    solution::ActiveModel {
        id: Set(solution.id),
        score: Set(score),
        check_state: Set(CheckState::CheckDone),
        updated_at: Set(now),
        ..Default::default()
    }
    .update(&txn)
    .await?;

    let current = submission::Entity::find_by_id(solution.submission_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Submission {} not found", solution.submission_id))?;

    let promoted = promoted_score(current.score, score);
    if promoted != current.score {
        submission::ActiveModel {
            id: Set(current.id),
            score: Set(promoted),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(
        solution_id = solution.id,
        submission_id = solution.submission_id,
        score,
        "Processed check job"
    );

    Ok(())
}

/// Submission scores only move upward: one full-score solution makes the
/// problem permanently solved, later failed attempts never regress it.
fn promoted_score(current: i32, solution_score: i32) -> i32 {
    current.max(solution_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::grading;

    #[test]
    fn full_score_promotes_the_submission() {
        assert_eq!(
            promoted_score(grading::ZERO_SCORE, grading::FULL_SCORE),
            grading::FULL_SCORE
        );
    }

    #[test]
    fn zero_score_never_regresses_a_solved_submission() {
        assert_eq!(
            promoted_score(grading::FULL_SCORE, grading::ZERO_SCORE),
            grading::FULL_SCORE
        );
    }

    #[test]
    fn promotion_is_idempotent() {
        let once = promoted_score(grading::ZERO_SCORE, grading::FULL_SCORE);
        assert_eq!(promoted_score(once, grading::FULL_SCORE), once);
    }

    #[test]
    fn unsolved_stays_unsolved_on_a_failed_attempt() {
        assert_eq!(
            promoted_score(grading::ZERO_SCORE, grading::ZERO_SCORE),
            grading::ZERO_SCORE
        );
    }
}
