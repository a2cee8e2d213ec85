use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, Data};
use crate::issuer::{self, SignedUpload, UploadRequest};
use crate::AppState;

/// Issue a presigned upload URL and record the attachment it will fill.
/// Route: POST /api/upload
pub async fn create_upload_url(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<UploadRequest>,
) -> Result<Json<Data<SignedUpload>>, ApiError> {
    let content_type = req.content_type.clone();
    let size = req.size;

    match issuer::issue_signed_url(
        &state.db,
        state.object_store.as_ref(),
        &state.config.uploads,
        req,
    )
    .await
    {
        Ok(signed) => Ok(Data::success(signed)),
        Err(e) => {
            if e.is_validation() {
                tracing::info!(content_type = %content_type, size, reason = %e, "Rejected upload request");
            }
            Err(e.into())
        }
    }
}
