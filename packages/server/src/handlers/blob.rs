use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::blob::BlobQuery;
use crate::error::AppError;
use crate::models::blob::{BlobResponse, BlobScopeQuery};
use crate::state::AppState;

fn to_query(digest: String, scope: BlobScopeQuery) -> BlobQuery {
    let mut query = BlobQuery::new(digest);
    query.project_id = scope.project_id;
    query.artifact_digest = scope.artifact_digest;
    query
}

/// Fetch a recorded blob, optionally scoped to a project and/or artifact.
#[instrument(skip(state))]
pub async fn get_blob(
    State(state): State<AppState>,
    Path(digest): Path<String>,
    Query(scope): Query<BlobScopeQuery>,
) -> Result<Json<BlobResponse>, AppError> {
    let blob = state.blobs.get(&to_query(digest, scope)).await?;
    Ok(Json(blob.into()))
}

/// `200` if the blob is recorded (within the given scopes), `404` otherwise.
#[instrument(skip(state))]
pub async fn head_blob(
    State(state): State<AppState>,
    Path(digest): Path<String>,
    Query(scope): Query<BlobScopeQuery>,
) -> Result<StatusCode, AppError> {
    if state.blobs.exist(&to_query(digest, scope)).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
