//! Backend client binding.
//!
//! # Data Flow
//! ```text
//! request handler / warmup
//!     → invoke() (deadline check, timeout_at)
//!     → CacheBackend::check_cache
//!     → client.rs (tonic Channel over UDS or TCP)
//!     → engine process
//! ```
//!
//! # Design Decisions
//! - One channel per process; every handler shares it
//! - Deadlines are absolute instants supplied by the caller
//! - No retries: a failed call is reported and forgotten

pub mod address;
pub mod client;
pub mod proto;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

pub use address::{AddressError, BackendAddress};
pub use client::{ConnectError, GrpcBackend};

/// Outbound cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub prompt_text: String,
}

/// Engine verdict for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub is_hit: bool,
    pub cached_payload: String,
    pub similarity_score: f32,
}

impl From<proto::CheckCacheResponse> for BackendReply {
    fn from(res: proto::CheckCacheResponse) -> Self {
        Self {
            is_hit: res.is_hit,
            cached_payload: res.cached_payload,
            similarity_score: res.similarity_score,
        }
    }
}

/// Why a backend call produced no result.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend deadline exceeded")]
    DeadlineExceeded,

    #[error("backend rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("backend connection is closed")]
    Closed,
}

impl BackendError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::DeadlineExceeded => "deadline",
            BackendError::Rpc(_) => "rpc",
            BackendError::Closed => "closed",
        }
    }
}

/// The cache-check operation of the engine.
///
/// Implementations are shared by every in-flight request and must be safe to
/// call concurrently.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Ask the engine whether `request` hits its cache.
    ///
    /// `deadline` is the absolute instant after which the answer is useless.
    async fn check_cache(
        &self,
        request: BackendRequest,
        deadline: Instant,
    ) -> Result<BackendReply, BackendError>;

    /// Release the underlying connection. Must be idempotent.
    fn close(&self) {}
}

/// Call the backend, failing with `DeadlineExceeded` once `deadline` passes.
///
/// The deadline is enforced here regardless of whether the implementation
/// honors it, so a stalled engine can never hold a request past its budget.
pub async fn invoke(
    backend: &dyn CacheBackend,
    request: BackendRequest,
    deadline: Instant,
) -> Result<BackendReply, BackendError> {
    if deadline <= Instant::now() {
        return Err(BackendError::DeadlineExceeded);
    }
    match tokio::time::timeout_at(deadline, backend.check_cache(request, deadline)).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::DeadlineExceeded),
    }
}

/// Issue one throwaway call to force lazy connection setup.
pub async fn warmup(
    backend: &dyn CacheBackend,
    prompt: &str,
    timeout: Duration,
) -> Result<BackendReply, BackendError> {
    let request = BackendRequest {
        prompt_text: prompt.to_string(),
    };
    invoke(backend, request, Instant::now() + timeout).await
}
