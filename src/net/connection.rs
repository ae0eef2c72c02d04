//! Connection identity and lifetime tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own every connection task so shutdown can wait for or abort them
//! - Report how a drain ended

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How the drain phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection finished within the grace period.
    Clean { drained: usize },
    /// The grace period ran out; `aborted` connections were closed forcibly.
    Forced { aborted: usize },
}

/// The set of live connection tasks.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    tasks: JoinSet<()>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a connection task under this set.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
        metrics::set_active_connections(self.tasks.len());
    }

    /// Collect tasks that already finished.
    pub fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
        metrics::set_active_connections(self.tasks.len());
    }

    /// Number of connections not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait up to `grace` for every connection to finish, then abort the rest.
    pub async fn drain(&mut self, grace: Duration) -> DrainOutcome {
        self.reap();
        if self.is_empty() {
            tracing::info!("No connections to drain");
            return DrainOutcome::Clean { drained: 0 };
        }
        let pending = self.tasks.len();
        tracing::info!(connections = pending, grace = ?grace, "Draining connections");

        let tasks = &mut self.tasks;
        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_join(result);
            }
        })
        .await;

        let outcome = match finished {
            Ok(()) => DrainOutcome::Clean { drained: pending },
            Err(_) => {
                let aborted = self.tasks.len();
                tracing::warn!(connections = aborted, "Grace period elapsed, closing connections");
                self.tasks.shutdown().await;
                DrainOutcome::Forced { aborted }
            }
        };
        metrics::set_active_connections(0);
        outcome
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        }
    }
}
