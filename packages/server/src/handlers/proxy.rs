use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderName, Response, header},
};
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Headers that describe a single connection and must not be forwarded.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Forward a distribution API request to the upstream registry.
///
/// Request and response bodies are buffered up to `upstream.max_body_size`.
/// The `Host` header is kept so that upstream builds `Location` URLs that point
/// back at this server.
#[instrument(skip(state, req), fields(method = %req.method(), path = %req.uri().path()))]
pub async fn forward(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response<Body>, AppError> {
    let upstream = &state.config.upstream;
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", upstream.url.trim_end_matches('/'), path_and_query);

    let (parts, body) = req.into_parts();
    let body = to_bytes(body, upstream.max_body_size)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {e}")))?;

    let mut request = state.http.request(parts.method, &url);
    for (name, value) in parts.headers.iter() {
        if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        request = request.header(name, value);
    }

    let reply = request.body(body).send().await.map_err(|e| {
        warn!(%url, error = %e, "Upstream request failed");
        AppError::Internal(format!("upstream request to {url} failed: {e}"))
    })?;

    let mut response = Response::builder().status(reply.status());
    for (name, value) in reply.headers().iter() {
        if !is_hop_by_hop(name) {
            response = response.header(name, value);
        }
    }

    let bytes = reply
        .bytes()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read upstream response: {e}")))?;
    if bytes.len() > upstream.max_body_size {
        return Err(AppError::Internal(format!(
            "upstream response of {} bytes exceeds the limit",
            bytes.len()
        )));
    }

    response
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
