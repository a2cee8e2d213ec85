use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;

use super::object_store_error;
use crate::api::response::{ApiError, AppQuery};
use crate::object_store::{LocalStore, ObjectStore, SignedPutParams};
use crate::AppState;

fn local_store(state: &AppState) -> Result<&LocalStore, ApiError> {
    state
        .local_store
        .as_deref()
        .ok_or_else(|| ApiError::not_found("Local object storage is not enabled"))
}

/// Receive a direct upload against a signed local URL.
/// Route: PUT /objects/:key
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    AppQuery(params): AppQuery<SignedPutParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let store = local_store(&state)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let byte_size = body.len();

    store
        .accept_put(&key, &params, content_type, body, Utc::now())
        .await
        .map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Rejected direct upload");
            object_store_error(e)
        })?;

    tracing::debug!(key = %key, byte_size, "Stored uploaded object");
    Ok(StatusCode::OK)
}

/// Serve a locally stored object.
/// Route: GET /objects/:key
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let store = local_store(&state)?;

    let data = store.get(&key).await.map_err(object_store_error)?;

    // Content type comes from the attachment issued for this object, when there is one
    let content_type = state
        .db
        .get_attachment_by_key(&store.object_url(&key))
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map(|a| a.content_type)
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    // Objects are immutable once written under a random key
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
