use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::issuer::IssueError;

/// Message returned for every unexpected failure. Callers get detail only in `rawError`.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

// ============================================================================
// Success envelope
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> Data<T> {
    pub fn success(data: T) -> Json<Data<T>> {
        Json(Data { data })
    }
}

// ============================================================================
// Paginated envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PaginatedData<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

impl<T: Serialize> PaginatedData<T> {
    pub fn success(items: Vec<T>, pagination: Pagination) -> Json<Data<PaginatedData<T>>> {
        Data::success(PaginatedData { items, pagination })
    }
}

// ============================================================================
// Failure envelopes
// ============================================================================

/// Client errors (4xx): `{error}`
#[derive(Debug, Serialize, Deserialize)]
pub struct FailBody {
    pub error: String,
}

/// Unexpected server errors (5xx): `{error, rawError}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(rename = "rawError")]
    pub raw_error: String,
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// Either a user-facing failure (4xx) or an opaque server error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Fail(code, error) => (code, Json(FailBody { error })).into_response(),
            ApiError::Error(code, raw_error) => {
                tracing::error!(error = %raw_error, "Request failed");
                (
                    code,
                    Json(ErrorBody {
                        error: GENERIC_ERROR_MESSAGE.to_string(),
                        raw_error,
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::FORBIDDEN, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, detail.into())
    }
}

impl From<IssueError> for ApiError {
    fn from(e: IssueError) -> Self {
        if e.is_validation() {
            ApiError::bad_request(e.to_string())
        } else {
            ApiError::internal(e.to_string())
        }
    }
}

// ============================================================================
// Custom extractors (reject with ApiError bodies)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with `{error}` bodies.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with `{error}` bodies.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}
