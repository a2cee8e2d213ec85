//! Content checksums for uploads.
//!
//! Clients compute a SHA-256 over the file bytes and send it hex-encoded with
//! the upload request. Storage backends verify the uploaded bytes against it.

use base64::Engine;
use ring::digest::{Context, SHA256};

/// SHA-256 of `data`, lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut ctx = Context::new(&SHA256);
    ctx.update(data);
    hex::encode(ctx.finish().as_ref())
}

/// Convert a hex SHA-256 into the base64 form S3 expects in
/// `x-amz-checksum-sha256`. Values that are not 32-byte hex pass through untouched.
pub fn to_base64(checksum: &str) -> String {
    match hex::decode(checksum) {
        Ok(raw) if raw.len() == 32 => base64::engine::general_purpose::STANDARD.encode(raw),
        _ => checksum.to_string(),
    }
}

/// Whether `checksum` (hex or base64) names the SHA-256 of `data`.
pub fn matches(checksum: &str, data: &[u8]) -> bool {
    let actual = sha256_hex(data);
    if checksum.eq_ignore_ascii_case(&actual) {
        return true;
    }
    to_base64(&actual) == checksum
}
