//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (caller budget ∩ service timeout = effective deadline)
//!     → backend::invoke (fails the call once the deadline passes)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries and no circuit breaker: retry policy belongs to the caller

pub mod timeouts;
