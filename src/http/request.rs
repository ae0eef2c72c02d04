//! Request decoding.
//!
//! # Responsibilities
//! - Read the request ID assigned by the request-id layer
//! - Read the body up to the configured limit
//! - Decode the JSON envelope
//!
//! # Design Decisions
//! - Any decoding problem is a plain 400; the caller gets no parser detail
//! - The prompt itself is not validated (an empty prompt is forwarded)

use axum::body::{Body, Bytes};
use axum::http::HeaderMap;
use serde::Deserialize;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Body of `POST /v1/cache/check`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckCacheApiRequest {
    pub prompt: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read body: {0}")]
    Body(#[from] axum::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// The request ID, or "unknown" when the layer did not run.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Read at most `limit` bytes of body.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, DecodeError> {
    Ok(axum::body::to_bytes(body, limit).await?)
}

/// Decode the request envelope.
pub fn decode(bytes: &[u8]) -> Result<CheckCacheApiRequest, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}
