//! Network subsystem.
//!
//! # Data Flow
//! ```text
//! listener.rs (bind, accept, connection permits)
//!     → connection.rs (one task per connection, owned by a ConnectionSet)
//!     → http::server (HTTP/1.1 + HTTP/2 on the accepted stream)
//! ```
//!
//! # Design Decisions
//! - Backpressure at accept time: no permit, no accept
//! - Connection tasks are owned, never detached, so shutdown can abort them

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionSet, DrainOutcome};
pub use listener::{AcceptRecovery, Accepted, ConnectionPermit, Listener, ListenerError};
