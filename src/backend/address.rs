//! Backend address parsing.

use std::fmt;
use std::path::PathBuf;

/// Where the backend engine listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendAddress {
    /// Unix domain socket path (`unix:///tmp/sentinel.sock` or `unix:relative.sock`).
    Unix(PathBuf),
    /// Plaintext HTTP/2 endpoint (`http://host:port`).
    Tcp(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("unix address has an empty socket path")]
    EmptyPath,
    #[error("unsupported scheme in {0:?} (expected unix:// or http://)")]
    UnsupportedScheme(String),
}

impl BackendAddress {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("unix://").or_else(|| raw.strip_prefix("unix:")) {
            if rest.is_empty() {
                return Err(AddressError::EmptyPath);
            }
            return Ok(BackendAddress::Unix(PathBuf::from(rest)));
        }
        if raw.starts_with("http://") && raw.len() > "http://".len() {
            return Ok(BackendAddress::Tcp(raw.to_string()));
        }
        Err(AddressError::UnsupportedScheme(raw.to_string()))
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendAddress::Unix(path) => write!(f, "unix://{}", path.display()),
            BackendAddress::Tcp(uri) => f.write_str(uri),
        }
    }
}
