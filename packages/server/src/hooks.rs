//! Ledger updates driven by distribution API traffic.
//!
//! Each hook recognises one request shape, lets the wrapped handler run, and
//! updates the ledger only when the handler reports success. A ledger failure
//! replaces the handler's response with the error response.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use common::distribution::{BlobUploadPath, ManifestPath};
use tracing::{debug, instrument, warn};

use crate::error::AppError;
use crate::state::AppState;

pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Dispatch a distribution request to the hook matching its method and path.
pub async fn registry_hooks(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();

    if req.method() == Method::PUT {
        if let Some(manifest) = ManifestPath::parse(&path) {
            let repository = manifest.name.to_owned();
            return put_manifest(&state, &repository, req, next).await;
        }
        if let Some(upload) = BlobUploadPath::parse(&path) {
            let repository = upload.name.to_owned();
            let session_id = upload.session_id.to_owned();
            return put_blob_upload(&state, &repository, &session_id, req, next).await;
        }
    } else if req.method() == Method::PATCH {
        if let Some(upload) = BlobUploadPath::parse(&path) {
            let session_id = upload.session_id.to_owned();
            return patch_blob_upload(&state, &session_id, req, next).await;
        }
    }

    next.run(req).await
}

/// Size declared by the request, if it is a usable non-zero `Content-Length`.
fn declared_size(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|size| *size > 0)
}

/// Parse a `Range: 0-<end>` upload progress header into a byte count.
fn accepted_size(headers: &HeaderMap) -> Option<i64> {
    let range = headers.get(header::RANGE)?.to_str().ok()?;
    let (start, end) = range.trim().split_once('-')?;
    if start != "0" {
        return None;
    }
    end.parse::<i64>().ok().map(|end| end + 1)
}

/// Completion of an upload session: record the blob and attach it to the project.
#[instrument(skip(state, req, next))]
async fn put_blob_upload(
    state: &AppState,
    repository: &str,
    session_id: &str,
    req: Request,
    next: Next,
) -> Response {
    let size = declared_size(req.headers());
    let response = next.run(req).await;
    if response.status() != StatusCode::CREATED {
        return response;
    }

    let response_headers = response.headers();
    let result = async {
        let size = match size {
            Some(size) => size,
            None => state.blobs.get_accepted_blob_size(session_id).await?,
        };
        let digest = response_headers
            .get(DOCKER_CONTENT_DIGEST)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Internal("upload completed without a Docker-Content-Digest".into())
            })?;
        state
            .reconciler
            .record_blob_upload(repository, digest, size)
            .await
    }
    .await;

    match result {
        Ok(blob_id) => {
            debug!(blob_id, "Recorded uploaded blob");
            response
        }
        Err(e) => {
            warn!(error = %e, "Failed to record uploaded blob");
            e.into_response()
        }
    }
}

/// Chunk accepted: remember how many bytes the session holds so far.
#[instrument(skip(state, req, next))]
async fn patch_blob_upload(
    state: &AppState,
    session_id: &str,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if response.status() != StatusCode::ACCEPTED {
        return response;
    }

    let Some(size) = accepted_size(response.headers()) else {
        warn!("Chunk accepted without a usable Range header");
        return response;
    };

    match state.blobs.set_accepted_blob_size(session_id, size).await {
        Ok(()) => response,
        Err(e) => {
            warn!(error = %e, "Failed to store accepted blob size");
            e.into_response()
        }
    }
}

/// Manifest stored: reconcile the ledger with the manifest's references.
#[instrument(skip(state, req, next))]
async fn put_manifest(state: &AppState, repository: &str, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let body = match to_bytes(body, state.config.upstream.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            return AppError::BadRequest(format!("Failed to read manifest body: {e}"))
                .into_response();
        }
    };
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let response = next
        .run(Request::from_parts(parts, Body::from(body.clone())))
        .await;
    if response.status() != StatusCode::CREATED {
        return response;
    }

    match state
        .reconciler
        .reconcile_manifest(repository, &content_type, &body)
        .await
    {
        Ok(()) => response,
        Err(e) => {
            warn!(error = %e, "Failed to reconcile manifest");
            e.into_response()
        }
    }
}
