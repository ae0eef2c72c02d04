//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, endpoint, limits).
    pub listener: ListenerConfig,

    /// Backend RPC service settings.
    pub backend: BackendConfig,

    /// Latency budget and shutdown grace period.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path the cache-check endpoint is mounted on.
    pub endpoint_path: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            endpoint_path: "/v1/cache/check".to_string(),
            max_connections: 10_000,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ListenerConfig {
    /// Replace the port of `bind_address`, keeping the host part.
    pub fn set_port(&mut self, port: u16) {
        let host = match self.bind_address.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.bind_address.clone(),
        };
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Backend service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend address: `unix:///path/to.sock` or `http://host:port`.
    pub address: String,

    /// Deadline for the one-off warmup call, in milliseconds.
    pub warmup_timeout_ms: u64,

    /// Prompt sent by the warmup call.
    pub warmup_prompt: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "unix:///tmp/sentinel.sock".to_string(),
            warmup_timeout_ms: 50,
            warmup_prompt: "warmup_signal".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_millis(self.warmup_timeout_ms)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Gateway's slice of the end-to-end budget for one backend call.
    /// Has no default; validation rejects a config without it.
    pub service_timeout_ms: Option<u64>,

    /// How long in-flight requests may run after shutdown starts, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            service_timeout_ms: None,
            shutdown_grace_secs: 5,
        }
    }
}

impl TimeoutConfig {
    /// The per-request service timeout.
    ///
    /// Only meaningful on a validated config; an unset value reads as zero,
    /// which makes every backend call fail its deadline.
    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.service_timeout_ms.unwrap_or(0))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_deployment() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.listener.endpoint_path, "/v1/cache/check");
        assert_eq!(config.backend.address, "unix:///tmp/sentinel.sock");
        assert_eq!(config.backend.warmup_timeout(), Duration::from_millis(50));
        assert_eq!(config.timeouts.shutdown_grace(), Duration::from_secs(5));
        assert!(config.timeouts.service_timeout_ms.is_none());
    }

    #[test]
    fn set_port_keeps_host() {
        let mut listener = ListenerConfig::default();
        listener.set_port(9000);
        assert_eq!(listener.bind_address, "0.0.0.0:9000");

        listener.bind_address = "[::1]:8080".to_string();
        listener.set_port(81);
        assert_eq!(listener.bind_address, "[::1]:81");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [timeouts]
            service_timeout_ms = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.timeouts.service_timeout(), Duration::from_millis(15));
        assert_eq!(config.timeouts.shutdown_grace_secs, 5);
        assert_eq!(config.listener.max_connections, 10_000);
    }
}
