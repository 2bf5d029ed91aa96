use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{Level, info, warn};

use server::cache::init_cache;
use server::config::AppConfig;
use server::consumers::consume_check_jobs;
use server::database::init_db;
use server::seed::ensure_constraints;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = Arc::new(AppConfig::load()?);

    let db = init_db(&config.database).await?;
    ensure_constraints(&db).await;

    let cache = init_cache(&config.cache).await;

    let mq = if config.mq.enabled {
        match mq::init_mq(mq::MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        {
            Ok(queue) => Some(Arc::new(queue)),
            Err(e) => {
                warn!(error = %e, "MQ unavailable, solutions will stay pending");
                None
            }
        }
    } else {
        None
    };

    let state = AppState {
        db: db.clone(),
        cache,
        mq: mq.clone(),
        config: config.clone(),
    };

    if let Some(mq) = mq {
        tokio::spawn(consume_check_jobs(
            db,
            state.problem_repo(),
            mq,
            config.mq.queue_name.clone(),
            Duration::from_secs(config.checker.delay_secs),
        ));
    }

    let app = server::build_router(state).layer(cors_layer(&config));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.server.cors.max_age));

    if config.server.cors.allow_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .server
            .cors
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
