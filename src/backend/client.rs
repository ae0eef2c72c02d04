//! gRPC implementation of the backend binding.
//!
//! # Responsibilities
//! - Build the single tonic channel to the engine (UDS or TCP)
//! - Translate `BackendRequest` to the protobuf call and back
//! - Propagate the remaining budget as `grpc-timeout`
//! - Release the channel once on shutdown
//!
//! # Design Decisions
//! - The channel connects lazily, like the engine's own clients; warmup is what
//!   forces the first connection
//! - A `Channel` multiplexes requests over one HTTP/2 connection, so handler
//!   tasks clone the client instead of locking it

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::time::Instant;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

use super::address::{AddressError, BackendAddress};
use super::proto::semantic_service_client::SemanticServiceClient;
use super::proto::CheckCacheRequest;
use super::{BackendError, BackendReply, BackendRequest, CacheBackend};

/// Error building the backend channel.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("invalid backend endpoint: {0}")]
    Endpoint(#[from] tonic::transport::Error),

    #[error("unix domain sockets are not supported on this platform")]
    UnixUnsupported,
}

/// The process-wide handle to the engine.
pub struct GrpcBackend {
    address: BackendAddress,
    client: RwLock<Option<SemanticServiceClient<Channel>>>,
}

impl GrpcBackend {
    /// Create the channel without performing any I/O.
    pub fn connect(address: &str) -> Result<Self, ConnectError> {
        let address = BackendAddress::parse(address)?;
        let channel = match &address {
            BackendAddress::Unix(path) => unix_channel(path.clone())?,
            BackendAddress::Tcp(uri) => Endpoint::from_shared(uri.clone())?.connect_lazy(),
        };

        tracing::info!(backend = %address, "Backend channel created");

        Ok(Self {
            address,
            client: RwLock::new(Some(SemanticServiceClient::new(channel))),
        })
    }

    fn client(&self) -> Option<SemanticServiceClient<Channel>> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(unix)]
fn unix_channel(path: std::path::PathBuf) -> Result<Channel, ConnectError> {
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;
    use tonic::transport::Uri;
    use tower::service_fn;

    // The authority is ignored; the connector always dials the socket path.
    let endpoint = Endpoint::from_static("http://[::]:50051");
    Ok(endpoint.connect_with_connector_lazy(service_fn(move |_: Uri| {
        let path = path.clone();
        async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
    })))
}

#[cfg(not(unix))]
fn unix_channel(_path: std::path::PathBuf) -> Result<Channel, ConnectError> {
    Err(ConnectError::UnixUnsupported)
}

#[async_trait]
impl CacheBackend for GrpcBackend {
    async fn check_cache(
        &self,
        request: BackendRequest,
        deadline: Instant,
    ) -> Result<BackendReply, BackendError> {
        let mut client = self.client().ok_or(BackendError::Closed)?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(BackendError::DeadlineExceeded);
        }

        let mut rpc = tonic::Request::new(CheckCacheRequest {
            prompt_text: request.prompt_text,
        });
        rpc.set_timeout(remaining);

        match tokio::time::timeout_at(deadline, client.check_cache(rpc)).await {
            Err(_) => Err(BackendError::DeadlineExceeded),
            Ok(Err(status)) if status.code() == Code::DeadlineExceeded => {
                Err(BackendError::DeadlineExceeded)
            }
            Ok(Err(status)) => Err(BackendError::Rpc(status)),
            Ok(Ok(response)) => Ok(response.into_inner().into()),
        }
    }

    fn close(&self) {
        let previous = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(_) => tracing::info!(backend = %self.address, "Closed backend connection"),
            None => tracing::debug!(backend = %self.address, "Backend connection already closed"),
        }
    }
}
