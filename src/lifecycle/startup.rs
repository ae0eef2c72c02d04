//! Startup orchestration.
//!
//! # Responsibilities
//! - Create the backend binding
//! - Warm it up before any traffic arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use crate::backend::{self, CacheBackend, ConnectError};
use crate::config::BackendConfig;

use super::GatewayError;

/// Build the backend binding with the given connector.
pub fn connect_backend<B, C>(
    config: &BackendConfig,
    connect: C,
) -> Result<Arc<dyn CacheBackend>, GatewayError>
where
    B: CacheBackend,
    C: FnOnce(&BackendConfig) -> Result<B, ConnectError>,
{
    match connect(config) {
        Ok(backend) => {
            let backend: Arc<dyn CacheBackend> = Arc::new(backend);
            Ok(backend)
        }
        Err(e) => {
            tracing::error!(backend = %config.address, error = %e, "Backend connection failed");
            Err(GatewayError::Connect(e))
        }
    }
}

/// Issue the warmup call; the binding is closed again if it fails.
pub async fn warm_up(
    backend: &dyn CacheBackend,
    config: &BackendConfig,
) -> Result<(), GatewayError> {
    tracing::info!(
        backend = %config.address,
        timeout_ms = config.warmup_timeout_ms,
        "Warming up backend connection"
    );

    match backend::warmup(backend, &config.warmup_prompt, config.warmup_timeout()).await {
        Ok(_) => {
            tracing::info!("Warmup completed");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Warmup failed");
            backend.close();
            Err(GatewayError::Warmup(e))
        }
    }
}
