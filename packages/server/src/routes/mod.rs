mod v1;

use utoipa_axum::router::OpenApiRouter;

use crate::state::AppState;

/// All HTTP routes, versioned under `/api/v1`. New breaking surface goes
/// into a future `v2` module; `v1` stays stable.
pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes())
}
