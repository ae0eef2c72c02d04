//! Shutdown coordination for the gateway.

use std::fmt;

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// The accept loop and every connection task hold a [`ShutdownSignal`]. A
/// watch channel is used so that a signal subscribed after the trigger still
/// observes it.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered or the coordinator is dropped.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Why the gateway left the serving state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The OS asked the process to terminate.
    Signal(&'static str),
    /// The accept loop died.
    ListenerFailed(String),
    /// Signal handlers could not be installed.
    SignalHandler(String),
}

impl StopReason {
    /// Only a termination signal is a normal shutdown request.
    pub fn is_requested(&self) -> bool {
        matches!(self, StopReason::Signal(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal(name) => write!(f, "received {}", name),
            StopReason::ListenerFailed(e) => write!(f, "HTTP server crashed: {}", e),
            StopReason::SignalHandler(e) => write!(f, "cannot listen for signals: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut signal = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("signal should already be set");
    }

    #[tokio::test]
    async fn dropping_coordinator_releases_waiters() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .unwrap();
    }

    #[test]
    fn only_signals_are_requested_stops() {
        assert!(StopReason::Signal("SIGTERM").is_requested());
        assert!(!StopReason::ListenerFailed("boom".into()).is_requested());
        assert_eq!(
            StopReason::ListenerFailed("boom".into()).to_string(),
            "HTTP server crashed: boom"
        );
    }
}
