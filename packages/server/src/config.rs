use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Look-aside cache settings for problem reads.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether the cache layer is active. When disabled every read goes
    /// straight to storage. Default: true.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Backend: "redis" or "memory". Default: "redis".
    #[serde(default = "default_cache_backend")]
    pub backend: String,
    /// Redis connection URL (redis backend only).
    #[serde(default = "default_cache_url")]
    pub url: String,
    /// Default TTL for cache entries, in seconds. Bounds the staleness
    /// window of any entry. Default: 300.
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Jitter window for stampede-avoiding early expiry, in milliseconds.
    /// 0 disables fetch-ahead. Default: 3000.
    #[serde(default = "default_cache_jitter_ms")]
    pub jitter_window_ms: u64,
}

fn default_cache_enabled() -> bool {
    true
}
fn default_cache_backend() -> String {
    "redis".into()
}
fn default_cache_url() -> String {
    "redis://localhost:6379".into()
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_jitter_ms() -> u64 {
    3000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            backend: default_cache_backend(),
            url: default_cache_url(),
            default_ttl_secs: default_cache_ttl_secs(),
            jitter_window_ms: default_cache_jitter_ms(),
        }
    }
}

/// Answer-check consumer settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CheckerConfig {
    /// Artificial processing delay per check job, in seconds, modeling the
    /// slow checking backend. Default: 20.
    #[serde(default = "default_checker_delay_secs")]
    pub delay_secs: u64,
}

fn default_checker_delay_secs() -> u64 {
    20
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_checker_delay_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub checker: CheckerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PLATFORM_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., PLATFORM__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("PLATFORM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
