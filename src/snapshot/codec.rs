//! Entry codec
//!
//! Frames one [`Entry`] as a self-describing byte sequence.
//!
//! ## Format
//! ```text
//! ┌────────────────┬──────────────────────┬─────────────────────┐
//! │ CT Len u16 LE  │ Content Type (CT Len)│ Payload (remaining) │
//! └────────────────┴──────────────────────┴─────────────────────┘
//! ```

use bytes::Bytes;

use crate::error::{Result, StashError};
use crate::store::Entry;

/// Size of the content-type length prefix
pub const LEN_PREFIX_SIZE: usize = 2;

/// Longest content type that fits the length prefix
pub const MAX_CONTENT_TYPE_LEN: usize = u16::MAX as usize;

/// Exact encoded size of `entry`
pub fn encoded_len(entry: &Entry) -> usize {
    LEN_PREFIX_SIZE + entry.content_type.len() + entry.payload.len()
}

/// Encode an entry
///
/// Fails only if the content type does not fit the 16-bit length prefix.
pub fn encode_entry(entry: &Entry) -> Result<Vec<u8>> {
    let content_type = entry.content_type.as_bytes();
    if content_type.len() > MAX_CONTENT_TYPE_LEN {
        return Err(StashError::ContentTypeTooLong {
            len: content_type.len(),
        });
    }

    let mut buf = Vec::with_capacity(encoded_len(entry));
    buf.extend_from_slice(&(content_type.len() as u16).to_le_bytes());
    buf.extend_from_slice(content_type);
    buf.extend_from_slice(&entry.payload);
    Ok(buf)
}

/// Decode an entry produced by [`encode_entry`]
///
/// Any input that is too short for its declared content-type length, or
/// whose content type is not UTF-8, yields `Corrupt`.
pub fn decode_entry(bytes: &[u8]) -> Result<Entry> {
    if bytes.len() < LEN_PREFIX_SIZE {
        return Err(StashError::Corrupt(format!(
            "entry too short: expected at least {} bytes, got {}",
            LEN_PREFIX_SIZE,
            bytes.len()
        )));
    }

    let ct_len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
    let body = &bytes[LEN_PREFIX_SIZE..];
    if body.len() < ct_len {
        return Err(StashError::Corrupt(format!(
            "entry truncated: content type needs {} bytes, {} present",
            ct_len,
            body.len()
        )));
    }

    let (content_type, payload) = body.split_at(ct_len);
    let content_type = std::str::from_utf8(content_type)
        .map_err(|e| StashError::Corrupt(format!("content type is not UTF-8: {}", e)))?;

    Ok(Entry {
        payload: Bytes::copy_from_slice(payload),
        content_type: content_type.to_string(),
    })
}
