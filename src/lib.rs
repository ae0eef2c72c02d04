//! Sentinel Gateway Library
//!
//! HTTP front door for the semantic cache engine: each `POST` is translated
//! into one deadline-bounded gRPC call over a local socket.

pub mod backend;
pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use backend::{CacheBackend, GrpcBackend};
pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{GatewayError, Lifecycle, Phase, Shutdown};
