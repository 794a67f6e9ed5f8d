pub mod blob;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod models;
pub mod project;
pub mod reconcile;
pub mod routes;
pub mod seed;
pub mod state;

use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .nest("/api", routes::api_routes())
        .merge(routes::distribution_routes(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
