mod v1;

use axum::{Router, middleware::from_fn_with_state, routing::any};

use crate::handlers;
use crate::hooks;
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/v1", v1::routes())
}

/// Distribution API, forwarded upstream with the ledger hooks in front.
pub fn distribution_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/v2/", any(handlers::proxy::forward))
        .route("/v2/{*path}", any(handlers::proxy::forward))
        .route_layer(from_fn_with_state(state.clone(), hooks::registry_hooks))
}
