use std::sync::Arc;

use mq::Mq;
use sea_orm::DatabaseConnection;

use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::repo::problem::ProblemRepository;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// None when caching is disabled or the backend was unreachable at boot.
    pub cache: Option<Arc<dyn CacheStore>>,
    /// None when the message queue is disabled; solutions are then stored
    /// but never picked up for checking.
    pub mq: Option<Arc<Mq>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn problem_repo(&self) -> ProblemRepository {
        ProblemRepository::new(
            self.db.clone(),
            self.cache.clone(),
            self.config.cache.default_ttl_secs,
            self.config.cache.jitter_window_ms,
        )
    }
}
