// ABOUTME: Conversions between SQLite column values and their document forms
// ABOUTME: Handles base64 coding of BLOB payloads and 16-byte identity blobs

use crate::error::{Result, StoreError};
use base64::Engine;
use rusqlite::types::ValueRef;
use rusqlite::Row;

pub const UUID_BLOB_LEN: usize = 16;

/// Encode a BLOB payload for storage in a JSON document
///
/// Uses the standard alphabet with padding.
pub fn encode_blob(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 BLOB payload read back from a JSON document
pub fn decode_blob(encoded: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| StoreError::Integrity(format!("Invalid base64 image payload: {}", e)))
}

/// Convert an identity BLOB into its 16 raw bytes
///
/// An empty blob is the "no identity" value and yields `None`. Any other
/// length than 16 bytes cannot be an identity and is an integrity error.
pub fn uuid_from_blob(blob: &[u8]) -> Result<Option<[u8; UUID_BLOB_LEN]>> {
    if blob.is_empty() {
        return Ok(None);
    }

    let bytes: [u8; UUID_BLOB_LEN] = blob.try_into().map_err(|_| {
        StoreError::Integrity(format!(
            "Invalid BLOB length {} for identity conversion (expected {})",
            blob.len(),
            UUID_BLOB_LEN
        ))
    })?;

    Ok(Some(bytes))
}

/// Read an identity column from a result row
///
/// NULL is treated like an empty blob. Non-BLOB values are rejected.
pub fn column_uuid(row: &Row<'_>, idx: usize) -> Result<Option<[u8; UUID_BLOB_LEN]>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(blob) => uuid_from_blob(blob),
        other => Err(StoreError::Integrity(format!(
            "Column {} holds {} where an identity BLOB was expected",
            idx,
            other.data_type()
        ))),
    }
}
