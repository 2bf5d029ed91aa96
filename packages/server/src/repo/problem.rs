//! Problem reads and writes behind a look-aside cache.
//!
//! All problem reads go through this repository: check the cache first,
//! fall through to storage on a miss and populate the cache on the way
//! back. Cache failures are logged and degrade to plain storage reads;
//! they never surface to callers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use tracing::{instrument, warn};

use crate::cache::{CacheStore, fetch_ahead};
use crate::entity::{answer, problem, submission};
use crate::error::AppError;
use crate::recommend::Candidate;

/// Cache key for a single problem.
fn problem_key(id: i32) -> String {
    format!("problem:{id}")
}

/// A parsed, normalized problem list filter.
///
/// Values are sorted and deduplicated at parse time so that every
/// spelling of the same filter (`levels=2,1`, `levels=1,2,2`) maps to one
/// cache key and one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemFilter {
    pub levels: Vec<i32>,
    pub categories: Vec<i32>,
}

impl ProblemFilter {
    /// Parse raw comma-separated query parameters. Empty segments are
    /// skipped; any non-integer segment is a validation error.
    pub fn parse(levels: Option<&str>, categories: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            levels: parse_id_set(levels, "levels")?,
            categories: parse_id_set(categories, "categories")?,
        })
    }

    /// Composite cache key for the filtered list. Stable across filter
    /// spellings because the value sets are normalized.
    pub fn cache_key(&self) -> String {
        format!(
            "problems:levels={}:categories={}",
            join_or_star(&self.levels),
            join_or_star(&self.categories),
        )
    }
}

fn parse_id_set(raw: Option<&str>, field: &str) -> Result<Vec<i32>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut values = Vec::new();
    for segment in raw.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let value: i32 = segment
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid {field} value: {segment:?}")))?;
        values.push(value);
    }
    values.sort_unstable();
    values.dedup();
    Ok(values)
}

fn join_or_star(values: &[i32]) -> String {
    if values.is_empty() {
        "*".into()
    } else {
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Clone)]
pub struct ProblemRepository {
    db: DatabaseConnection,
    cache: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
    jitter_window_ms: u64,
}

impl ProblemRepository {
    pub fn new(
        db: DatabaseConnection,
        cache: Option<Arc<dyn CacheStore>>,
        ttl_secs: u64,
        jitter_window_ms: u64,
    ) -> Self {
        Self {
            db,
            cache,
            ttl: Duration::from_secs(ttl_secs),
            jitter_window_ms,
        }
    }

    /// Fetch one problem via the look-aside cache. Reads never extend an
    /// entry's lifetime, so a stale copy is served for at most the
    /// configured TTL.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<problem::Model, AppError> {
        let key = problem_key(id);

        if let Some(cache) = &self.cache {
            match cache.get(&key).await {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(model) => return Ok(model),
                    Err(e) => warn!(key, error = %e, "Discarding undecodable cache entry"),
                },
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "Cache read failed, falling through"),
            }
        }

        let model = problem::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Problem {id} not found")))?;

        self.cache_put(&key, &model).await;
        Ok(model)
    }

    /// Fetch the problem list for a filter. The cached list uses
    /// jittered fetch-ahead reads so a popular filter re-queries storage
    /// slightly early on one request instead of stampeding at expiry.
    #[instrument(skip(self))]
    pub async fn get_filtered(
        &self,
        filter: &ProblemFilter,
    ) -> Result<Vec<problem::Model>, AppError> {
        let key = filter.cache_key();

        if let Some(cache) = &self.cache {
            match fetch_ahead(cache.as_ref(), &key, self.jitter_window_ms).await {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(models) => return Ok(models),
                    Err(e) => warn!(key, error = %e, "Discarding undecodable cache entry"),
                },
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "Cache read failed, falling through"),
            }
        }

        let mut query = problem::Entity::find();
        if !filter.levels.is_empty() {
            query = query.filter(problem::Column::Level.is_in(filter.levels.clone()));
        }
        if !filter.categories.is_empty() {
            query = query.filter(problem::Column::CategoryId.is_in(filter.categories.clone()));
        }
        let models = query.all(&self.db).await?;

        self.cache_put(&key, &models).await;
        Ok(models)
    }

    /// Drop the cached copy of a problem. Called after a delete commits
    /// so a removed problem is never served from the cache.
    pub async fn invalidate(&self, id: i32) {
        let Some(cache) = &self.cache else { return };
        let key = problem_key(id);
        if let Err(e) = cache.delete(&key).await {
            warn!(key, error = %e, "Cache delete failed, entry expires by TTL");
        }
    }

    /// Overwrite the single-problem cache entry after a committed write,
    /// but only when the key is already resident. A problem that nobody
    /// is reading stays out of the cache; one that is being read keeps
    /// serving the new version without waiting for the old entry to
    /// expire. Filtered lists are left to expire by TTL.
    pub async fn refresh_if_present(&self, model: &problem::Model) {
        let Some(cache) = &self.cache else { return };
        let key = problem_key(model.id);

        match cache.get(&key).await {
            Ok(Some(_)) => self.cache_put(&key, model).await,
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "Cache read failed, skipping refresh"),
        }
    }

    /// Grade a candidate answer for a problem against its canonical
    /// answer.
    #[instrument(skip(self, candidate))]
    pub async fn check_answer(&self, problem_id: i32, candidate: &str) -> Result<i32, AppError> {
        let problem = self.get_by_id(problem_id).await?;
        let canonical = answer::Entity::find_by_id(problem.answer_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Problem {problem_id} has no answer row"))
            })?;

        Ok(common::grading::grade(candidate, &canonical.answer))
    }

    /// Build the recommendation candidate set for a user: every problem,
    /// with its total submission count and the user's solved status.
    #[instrument(skip(self))]
    pub async fn load_candidates(&self, user_id: i32) -> Result<Vec<Candidate>, AppError> {
        let problems = problem::Entity::find().all(&self.db).await?;

        let counts: Vec<(i32, i64)> = submission::Entity::find()
            .select_only()
            .column(submission::Column::ProblemId)
            .column_as(submission::Column::Id.count(), "count")
            .group_by(submission::Column::ProblemId)
            .into_tuple()
            .all(&self.db)
            .await?;

        let solved: Vec<i32> = submission::Entity::find()
            .select_only()
            .column(submission::Column::ProblemId)
            .filter(submission::Column::UserId.eq(user_id))
            .filter(submission::Column::Score.eq(common::grading::FULL_SCORE))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(assemble_candidates(
            problems,
            counts.into_iter().collect(),
            solved.into_iter().collect(),
        ))
    }

    async fn cache_put<T: serde::Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = &self.cache else { return };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Cache encode failed, skipping write");
                return;
            }
        };
        if let Err(e) = cache.set(key, &raw, self.ttl).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }
}

fn assemble_candidates(
    problems: Vec<problem::Model>,
    counts: HashMap<i32, i64>,
    solved: HashSet<i32>,
) -> Vec<Candidate> {
    problems
        .into_iter()
        .map(|p| Candidate {
            problem_id: p.id,
            level: p.level,
            submission_count: counts.get(&p.id).copied().unwrap_or(0),
            solved_by_user: solved.contains(&p.id),
            created_at: p.created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample_problem(id: i32, level: i32) -> problem::Model {
        let now = Utc::now();
        problem::Model {
            id,
            name: format!("problem-{id}"),
            level,
            description: "desc".into(),
            category_id: None,
            owner_id: 1,
            answer_id: id,
            commentary_id: id,
            created_at: now,
            updated_at: now,
        }
    }

    fn repo_with(db: DatabaseConnection, cache: Option<Arc<dyn CacheStore>>) -> ProblemRepository {
        ProblemRepository::new(db, cache, 300, 0)
    }

    #[test]
    fn filter_parse_sorts_and_dedups() {
        let filter = ProblemFilter::parse(Some("3,1,3, 2"), None).unwrap();
        assert_eq!(filter.levels, vec![1, 2, 3]);
        assert!(filter.categories.is_empty());
    }

    #[test]
    fn filter_parse_rejects_non_integers() {
        let err = ProblemFilter::parse(Some("1,abc"), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn filter_parse_skips_empty_segments() {
        let filter = ProblemFilter::parse(Some("1,,2,"), Some("")).unwrap();
        assert_eq!(filter.levels, vec![1, 2]);
        assert!(filter.categories.is_empty());
    }

    #[test]
    fn equivalent_filter_spellings_share_a_cache_key() {
        let a = ProblemFilter::parse(Some("2,1"), Some("5")).unwrap();
        let b = ProblemFilter::parse(Some("1,2,2"), Some("5,")).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "problems:levels=1,2:categories=5");
    }

    #[test]
    fn unfiltered_key_uses_wildcards() {
        let filter = ProblemFilter::parse(None, None).unwrap();
        assert_eq!(filter.cache_key(), "problems:levels=*:categories=*");
    }

    #[test]
    fn candidates_default_to_zero_submissions_and_unsolved() {
        let problems = vec![sample_problem(1, 2), sample_problem(2, 1)];
        let counts = HashMap::from([(1, 3)]);
        let solved = HashSet::from([2]);

        let candidates = assemble_candidates(problems, counts, solved);
        assert_eq!(candidates[0].submission_count, 3);
        assert!(!candidates[0].solved_by_user);
        assert_eq!(candidates[1].submission_count, 0);
        assert!(candidates[1].solved_by_user);
    }

    #[tokio::test]
    async fn get_by_id_populates_the_cache_on_miss() {
        let model = sample_problem(7, 3);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model.clone()]])
            .into_connection();
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(db, Some(store.clone()));

        let fetched = repo.get_by_id(7).await.unwrap();
        assert_eq!(fetched, model);

        let cached = store.get("problem:7").await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn get_by_id_serves_a_resident_entry_without_storage() {
        let model = sample_problem(9, 1);
        // Empty mock: any storage query would fail the test.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "problem:9",
                &serde_json::to_string(&model).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        let repo = repo_with(db, Some(store));

        let fetched = repo.get_by_id(9).await.unwrap();
        assert_eq!(fetched, model);
    }

    #[tokio::test]
    async fn repeated_reads_never_extend_a_cached_entry() {
        // A hot key read more often than its TTL must still expire on
        // schedule, otherwise a deleted or externally changed problem
        // could be served indefinitely.
        let model = sample_problem(5, 2);
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "problem:5",
                &serde_json::to_string(&model).unwrap(),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        let repo = repo_with(db, Some(store.clone()));

        for _ in 0..5 {
            assert_eq!(repo.get_by_id(5).await.unwrap(), model);
        }

        let ttl = store.pttl("problem:5").await.unwrap().unwrap();
        assert!(ttl <= 2000, "cache reads extended the entry: {ttl}ms left");
    }

    #[tokio::test]
    async fn invalidate_drops_the_cached_entry() {
        let model = sample_problem(6, 1);
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "problem:6",
                &serde_json::to_string(&model).unwrap(),
                Duration::from_secs(300),
            )
            .await
            .unwrap();
        let repo = repo_with(db, Some(store.clone()));

        repo.invalidate(6).await;
        assert!(store.get("problem:6").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_leaves_cold_keys_alone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(db, Some(store.clone()));

        repo.refresh_if_present(&sample_problem(3, 1)).await;
        assert!(store.get("problem:3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_overwrites_a_resident_entry() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = Arc::new(MemoryStore::new());
        store
            .set("problem:3", "stale", Duration::from_secs(60))
            .await
            .unwrap();
        let repo = repo_with(db, Some(store.clone()));

        let updated = sample_problem(3, 4);
        repo.refresh_if_present(&updated).await;

        let cached = store.get("problem:3").await.unwrap().unwrap();
        let decoded: problem::Model = serde_json::from_str(&cached).unwrap();
        assert_eq!(decoded.level, 4);
    }

    #[tokio::test]
    async fn get_by_id_maps_storage_miss_to_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<problem::Model>::new()])
            .into_connection();
        let repo = repo_with(db, None);

        let err = repo.get_by_id(404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
