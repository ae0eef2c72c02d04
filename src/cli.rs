//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{read_config, validate_config, ConfigError, GatewayConfig};

#[derive(Debug, Parser)]
#[command(name = "sentinel-gateway")]
#[command(about = "HTTP gateway in front of the semantic cache engine", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen port (keeps the host of listener.bind_address)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Backend address, e.g. unix:///tmp/sentinel.sock
    #[arg(long)]
    pub backend_address: Option<String>,

    /// Per-request backend budget in milliseconds
    #[arg(long)]
    pub service_timeout_ms: Option<u64>,

    /// Path of the cache-check endpoint
    #[arg(long)]
    pub endpoint_path: Option<String>,
}

impl Cli {
    /// Read the config file (or defaults), apply flags, then validate.
    pub fn load_config(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.set_port(port);
        }
        if let Some(address) = &self.backend_address {
            config.backend.address = address.clone();
        }
        if let Some(ms) = self.service_timeout_ms {
            config.timeouts.service_timeout_ms = Some(ms);
        }
        if let Some(path) = &self.endpoint_path {
            config.listener.endpoint_path = path.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
