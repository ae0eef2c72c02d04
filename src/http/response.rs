//! Response construction.
//!
//! # Responsibilities
//! - Map the backend reply onto the external JSON envelope
//! - Build the plain-text error responses
//!
//! # Design Decisions
//! - Fields map one-to-one; the only change is widening the score to f64
//! - Error bodies are fixed strings; internal causes stay in the logs

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::backend::BackendReply;

/// Body of a successful cache check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckCacheApiResponse {
    pub is_hit: bool,
    pub cache_payload: String,
    pub similarity_score: f64,
}

impl From<BackendReply> for CheckCacheApiResponse {
    fn from(reply: BackendReply) -> Self {
        Self {
            is_hit: reply.is_hit,
            cache_payload: reply.cached_payload,
            similarity_score: f64::from(reply.similarity_score),
        }
    }
}

/// 200 with a pre-encoded JSON body.
pub fn json(payload: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    )
        .into_response()
}

pub fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Bad Request").into_response()
}

pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
