//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Starting: create backend binding
//!     Warming:  one warmup call under the warmup deadline
//!     Serving:  bind listener → accept loop task + signal task
//!
//! Shutdown (shutdown.rs):
//!     first StopReason (signal or listener failure)
//!     → Draining: stop accepting, drain connections within grace period
//!     → Stopped:  close backend binding
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → StopReason::Signal
//! ```
//!
//! # Design Decisions
//! - Ordered startup: backend first, listener last
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: remaining connections are aborted after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::backend::{BackendError, CacheBackend, ConnectError};
use crate::config::{BackendConfig, GatewayConfig};
use crate::http::{AppState, HttpServer};
use crate::net::{DrainOutcome, Listener, ListenerError};

pub use shutdown::{Shutdown, ShutdownSignal, StopReason};

/// Lifecycle states, in the order the gateway passes through them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Warming,
    Serving { local_addr: SocketAddr },
    Draining,
    Stopped,
}

/// Fatal conditions; any of them makes the process exit non-zero.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("backend connection failed: {0}")]
    Connect(#[source] ConnectError),

    #[error("backend warmup failed: {0}")]
    Warmup(#[source] BackendError),

    #[error("listener failed to start: {0}")]
    Bind(#[source] ListenerError),

    #[error("{0}")]
    Stopped(StopReason),

    #[error("shutdown grace period elapsed with {aborted} connection(s) still open")]
    ShutdownIncomplete { aborted: usize },
}

/// Drives the gateway from startup to exit.
pub struct Lifecycle {
    config: Arc<GatewayConfig>,
    phase: watch::Sender<Phase>,
}

impl Lifecycle {
    pub fn new(config: GatewayConfig) -> Self {
        let (phase, _) = watch::channel(Phase::Starting);
        Self {
            config: Arc::new(config),
            phase,
        }
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: Phase) {
        tracing::info!(phase = ?phase, "Lifecycle transition");
        self.phase.send_replace(phase);
    }

    /// Run the gateway until `stop` resolves or the listener fails.
    ///
    /// `connect` creates the backend binding; `stop` is normally
    /// [`signals::wait_for_termination`]. Returns `Ok` only for a clean,
    /// requested shutdown.
    pub async fn run<B, C, S>(self, connect: C, stop: S) -> Result<(), GatewayError>
    where
        B: CacheBackend,
        C: FnOnce(&BackendConfig) -> Result<B, ConnectError>,
        S: Future<Output = StopReason> + Send + 'static,
    {
        let result = self.run_phases(connect, stop).await;
        self.enter(Phase::Stopped);
        result
    }

    async fn run_phases<B, C, S>(&self, connect: C, stop: S) -> Result<(), GatewayError>
    where
        B: CacheBackend,
        C: FnOnce(&BackendConfig) -> Result<B, ConnectError>,
        S: Future<Output = StopReason> + Send + 'static,
    {
        let config = Arc::clone(&self.config);

        self.enter(Phase::Starting);
        let backend = startup::connect_backend(&config.backend, connect)?;

        self.enter(Phase::Warming);
        startup::warm_up(backend.as_ref(), &config.backend).await?;

        let listener = match Listener::bind(&config.listener).await {
            Ok(listener) => listener,
            Err(e) => {
                backend.close();
                return Err(GatewayError::Bind(e));
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                backend.close();
                return Err(GatewayError::Bind(ListenerError::Bind(e)));
            }
        };

        let state = AppState::new(Arc::clone(&backend), &config);
        let server = HttpServer::new(listener, state, &config.listener.endpoint_path);

        // Both the signal task and the accept loop report here; the first wins.
        let (stop_tx, mut stop_rx) = mpsc::channel::<StopReason>(2);
        let shutdown = Shutdown::new();

        let signal_tx = stop_tx.clone();
        let signal_task = tokio::spawn(async move {
            let reason = stop.await;
            let _ = signal_tx.send(reason).await;
        });

        let accept_signal = shutdown.subscribe();
        let serving = tokio::spawn(async move {
            let halted = server.accept_loop(accept_signal).await;
            if let Some(e) = &halted.failure {
                tracing::error!(error = %e, "Accept loop failed");
                let _ = stop_tx.send(StopReason::ListenerFailed(e.to_string())).await;
            }
            halted.connections
        });

        self.enter(Phase::Serving { local_addr });
        tracing::info!(
            address = %local_addr,
            endpoint = %config.listener.endpoint_path,
            "Gateway listening"
        );

        let reason = stop_rx
            .recv()
            .await
            .unwrap_or_else(|| StopReason::ListenerFailed("stop channel closed".into()));
        signal_task.abort();

        self.enter(Phase::Draining);
        shutdown.trigger();

        // The serving task returns only after the listening socket is closed.
        let drained = match serving.await {
            Ok(mut connections) => connections.drain(config.timeouts.shutdown_grace()).await,
            Err(e) => {
                tracing::error!(error = %e, "Accept loop task failed");
                DrainOutcome::Forced { aborted: 0 }
            }
        };

        backend.close();

        match (reason.is_requested(), drained) {
            (true, DrainOutcome::Clean { drained }) => {
                tracing::info!(connections = drained, "HTTP server stopped");
                Ok(())
            }
            (true, DrainOutcome::Forced { aborted }) => {
                tracing::error!(connections = aborted, "Shutdown incomplete");
                Err(GatewayError::ShutdownIncomplete { aborted })
            }
            (false, outcome) => {
                tracing::error!(reason = %reason, drain = ?outcome, "Gateway stopped abnormally");
                Err(GatewayError::Stopped(reason))
            }
        }
    }
}
