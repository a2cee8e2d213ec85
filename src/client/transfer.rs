use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;

use super::{UploadError, UploadSource};
use crate::checksum;
use crate::issuer::{SignedUpload, UploadRequest};
use crate::object_store::CHECKSUM_HEADER;

/// Body chunk size; progress is reported once per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IssueResponse {
    Granted {
        data: SignedUpload,
    },
    Refused {
        error: String,
        #[serde(default, rename = "rawError")]
        raw_error: Option<serde_json::Value>,
    },
}

/// Ask the issuance endpoint for a signed upload URL.
pub async fn request_upload_url(
    http: &Client,
    endpoint: &str,
    req: &UploadRequest,
) -> Result<SignedUpload, UploadError> {
    let resp = http
        .post(endpoint)
        .json(req)
        .send()
        .await
        .map_err(|e| UploadError::Authorization(e.to_string()))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| UploadError::Authorization(e.to_string()))?;

    match serde_json::from_str::<IssueResponse>(&body) {
        Ok(IssueResponse::Granted { data }) if status.is_success() => Ok(data),
        Ok(IssueResponse::Refused { error, raw_error }) => {
            if let Some(raw) = raw_error {
                tracing::debug!(raw_error = %raw, "Issuer reported an unexpected failure");
            }
            Err(UploadError::Authorization(error))
        }
        _ => Err(UploadError::Authorization(format!(
            "unexpected response ({status}): {body}"
        ))),
    }
}

/// PUT `source` to a presigned URL, calling `on_progress` with the cumulative
/// number of bytes handed to the transport.
pub async fn put_with_progress(
    http: &Client,
    url: &str,
    source: &UploadSource,
    checksum_hex: &str,
    on_progress: impl Fn(u64) + Send + Sync + 'static,
) -> Result<(), UploadError> {
    let data = source.data.clone();
    let total = data.len();
    let chunks: Vec<Result<Bytes, std::io::Error>> = (0..total)
        .step_by(CHUNK_SIZE)
        .map(|start| Ok(data.slice(start..(start + CHUNK_SIZE).min(total))))
        .collect();

    let mut sent: u64 = 0;
    let body = futures::stream::iter(chunks).inspect(move |chunk| {
        if let Ok(chunk) = chunk {
            sent += chunk.len() as u64;
            on_progress(sent);
        }
    });

    let resp = http
        .put(url)
        .header(CONTENT_TYPE, &source.content_type)
        .header(CONTENT_LENGTH, total)
        .header(CHECKSUM_HEADER, checksum::to_base64(checksum_hex))
        .body(reqwest::Body::wrap_stream(body))
        .send()
        .await
        .map_err(|e| UploadError::Transfer(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(UploadError::Transfer(format!(
            "storage rejected upload ({status}): {body}"
        )));
    }

    Ok(())
}
