use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().nest("/blobs", blob_routes())
}

fn blob_routes() -> Router<AppState> {
    Router::new().route(
        "/{digest}",
        get(handlers::blob::get_blob).head(handlers::blob::head_blob),
    )
}
