//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper-util connection, Axum router, middleware)
//!     → handler.rs (method check → decode → deadline → backend → encode)
//!         → request.rs (body limit, JSON envelope, request ID)
//!         → response.rs (JSON envelope, plain-text errors)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::AppState;
pub use request::X_REQUEST_ID;
pub use server::{Halted, HttpServer};
