//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, warmup budget above request budget)
//! - Check addresses and the endpoint path are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::backend::BackendAddress;
use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("timeouts.service_timeout_ms is required")]
    MissingServiceTimeout,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error(
        "backend.warmup_timeout_ms ({warmup_ms}) must exceed \
         timeouts.service_timeout_ms ({service_ms})"
    )]
    WarmupNotAboveService { warmup_ms: u64, service_ms: u64 },

    #[error("{field} is not a socket address: {value}")]
    BadSocketAddress { field: &'static str, value: String },

    #[error("backend.address is invalid: {0}")]
    BadBackendAddress(String),

    #[error("listener.endpoint_path must be a literal path starting with '/': {0}")]
    BadEndpointPath(String),

    #[error("observability.log_format must be \"pretty\" or \"json\": {0}")]
    BadLogFormat(String),
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.timeouts.service_timeout_ms {
        None => errors.push(ValidationError::MissingServiceTimeout),
        Some(0) => errors.push(ValidationError::Zero {
            field: "timeouts.service_timeout_ms",
        }),
        Some(service_ms) if config.backend.warmup_timeout_ms <= service_ms => {
            errors.push(ValidationError::WarmupNotAboveService {
                warmup_ms: config.backend.warmup_timeout_ms,
                service_ms,
            });
        }
        Some(_) => {}
    }

    if config.backend.warmup_timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "backend.warmup_timeout_ms",
        });
    }
    if config.timeouts.shutdown_grace_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.shutdown_grace_secs",
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_connections",
        });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_body_bytes",
        });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadSocketAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadSocketAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if let Err(e) = BackendAddress::parse(&config.backend.address) {
        errors.push(ValidationError::BadBackendAddress(e.to_string()));
    }

    if !is_literal_route(&config.listener.endpoint_path) {
        errors.push(ValidationError::BadEndpointPath(
            config.listener.endpoint_path.clone(),
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::BadLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A path the router mounts verbatim: no captures (`{id}`, legacy `:id`) and
/// no wildcards, which the router would either interpret or reject at startup.
fn is_literal_route(path: &str) -> bool {
    path.starts_with('/') && !path.contains(&[':', '*', '{', '}'][..])
}
