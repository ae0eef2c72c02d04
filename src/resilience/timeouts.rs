//! Deadline derivation for backend calls.
//!
//! # Responsibilities
//! - Read the caller's remaining budget from the request
//! - Intersect it with the configured service timeout
//!
//! # Design Decisions
//! - Deadlines are absolute `tokio::time::Instant`s, computed once per request
//!   and passed down explicitly
//! - A missing or unreadable caller budget means "no caller deadline"
//! - Timed-out requests return 500, not 504: the caller never learns which
//!   internal step failed

use std::time::Duration;

use axum::http::HeaderMap;
use tokio::time::Instant;

/// Header carrying the caller's remaining budget in milliseconds.
pub const X_REQUEST_TIMEOUT_MS: &str = "x-request-timeout-ms";

/// The caller's own deadline, if the request carries one.
pub fn caller_deadline(headers: &HeaderMap, now: Instant) -> Option<Instant> {
    let raw = headers.get(X_REQUEST_TIMEOUT_MS)?;
    match raw.to_str().ok().and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(ms) => Some(now + Duration::from_millis(ms)),
        None => {
            tracing::debug!(value = ?raw, "Ignoring unparsable caller timeout");
            None
        }
    }
}

/// The earlier of the caller's deadline and `now + service_timeout`.
pub fn effective_deadline(
    now: Instant,
    service_timeout: Duration,
    caller: Option<Instant>,
) -> Instant {
    let own = now + service_timeout;
    match caller {
        Some(caller) => caller.min(own),
        None => own,
    }
}
