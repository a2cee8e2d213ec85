use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery, Data, PaginatedData, Pagination};
use crate::storage::models::AttachmentRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub byte_size: u64,
    pub checksum: String,
    pub content_type: String,
    pub created_at: String,
    pub file_name: String,
    pub id: String,
    pub key: String,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub record_id: Option<String>,
    pub record_type: Option<String>,
    pub service_name: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ListAttachmentsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub record_type: Option<String>,
}

fn default_limit() -> u32 {
    20
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Data<AttachmentResponse>>, ApiError> {
    let attachment = state
        .db
        .get_attachment(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Attachment not found"))?;

    Ok(Data::success(attachment_to_response(&attachment)))
}

pub async fn list_attachments(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListAttachmentsParams>,
) -> Result<Json<Data<PaginatedData<AttachmentResponse>>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let attachments = state
        .db
        .list_attachments(params.record_id.as_deref(), params.record_type.as_deref())
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let total = attachments.len() as u64;
    let items: Vec<AttachmentResponse> = attachments
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(attachment_to_response)
        .collect();

    Ok(PaginatedData::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

// ============================================================================
// Helpers
// ============================================================================

pub(super) fn attachment_to_response(attachment: &AttachmentRecord) -> AttachmentResponse {
    AttachmentResponse {
        byte_size: attachment.byte_size,
        checksum: attachment.checksum.clone(),
        content_type: attachment.content_type.clone(),
        created_at: attachment.created_at.to_rfc3339(),
        file_name: attachment.file_name.clone(),
        id: attachment.id.clone(),
        key: attachment.key.clone(),
        metadata: attachment.metadata.clone(),
        record_id: attachment.record_id.clone(),
        record_type: attachment.record_type.clone(),
        service_name: attachment.service_name.clone(),
        updated_at: attachment.updated_at.to_rfc3339(),
    }
}
