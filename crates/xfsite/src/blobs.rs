//! Content-addressed image storage.
//!
//! Sections never carry image bytes. An image is stored once, under
//! `blob-<sha256 hex>`, as a `{mediaType, data}` record with the bytes in
//! base64, and sections refer to it by hash.

use crate::error::{Result, SiteError};
use crate::keys::blob_key;
use crate::schema::blob_schema;
use crate::service::{PersistenceService, SaveOptions};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPayload {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobRecord {
    media_type: String,
    data: String,
}

pub fn hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Decode a `data:<media type>;base64,<payload>` URL.
pub fn parse_data_url(url: &str) -> Result<BlobPayload> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| SiteError::Validation("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SiteError::Validation("data URL has no payload".to_string()))?;
    let media_type = header.strip_suffix(";base64").ok_or_else(|| {
        SiteError::Validation("only base64 data URLs are supported".to_string())
    })?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| SiteError::Validation(format!("invalid base64 payload: {}", e)))?;
    image_payload(media_type, bytes)
}

/// Guess an image media type from a file extension.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Build a payload, rejecting empty data and non-image media types.
pub fn image_payload(media_type: &str, bytes: Vec<u8>) -> Result<BlobPayload> {
    if !media_type.starts_with("image/") {
        return Err(SiteError::Validation(format!(
            "unsupported media type: {}",
            media_type
        )));
    }
    if bytes.is_empty() {
        return Err(SiteError::Validation("image is empty".to_string()));
    }
    Ok(BlobPayload {
        media_type: media_type.to_string(),
        bytes,
    })
}

/// Store `payload` and return its hash. Storing the same bytes twice is a
/// single record.
pub fn put(service: &PersistenceService, payload: &BlobPayload, user_id: &str) -> Result<String> {
    let hash = hash(&payload.bytes);
    let record = BlobRecord {
        media_type: payload.media_type.clone(),
        data: STANDARD.encode(&payload.bytes),
    };
    let opts = SaveOptions::with_schema(blob_schema()).for_user(user_id);
    service.save_as(&blob_key(&hash), &record, &opts)?;
    debug!(hash = %hash, bytes = payload.bytes.len(), "blob stored");
    Ok(hash)
}

pub fn get(service: &PersistenceService, hash: &str, user_id: &str) -> Result<Option<BlobPayload>> {
    let Some(record) = service.load_as::<BlobRecord>(&blob_key(hash), user_id)? else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(record.data.as_bytes())
        .map_err(|e| SiteError::Storage(format!("blob {} is corrupt: {}", hash, e)))?;
    Ok(Some(BlobPayload {
        media_type: record.media_type,
        bytes,
    }))
}

pub fn remove(service: &PersistenceService, hash: &str, user_id: &str) -> Result<()> {
    service.remove(&blob_key(hash), user_id)?;
    debug!(hash, "blob removed");
    Ok(())
}
