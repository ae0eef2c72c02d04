//! HTTP server setup and connection serving.
//!
//! # Responsibilities
//! - Create Axum Router with the cache-check handler
//! - Wire up middleware (tracing, request ID)
//! - Accept connections and serve HTTP/1.1 and HTTP/2 on each
//! - Ask every connection to finish gracefully on shutdown
//!
//! # Design Decisions
//! - Connections are served with hyper-util directly instead of `axum::serve`
//!   so that each connection task is owned and can be aborted after the grace
//!   period
//! - The accept loop owns the listening socket and drops it the moment
//!   shutdown fires; clients arriving during the drain are refused by the
//!   kernel rather than queued behind a socket nobody accepts on
//! - Accept errors are recovered as [`Listener`] classifies them; only a dead
//!   listener ends the loop early

use std::net::SocketAddr;

use axum::{routing::any, Router};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use tokio::net::TcpStream;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::handler::{check_cache, AppState};
use crate::lifecycle::ShutdownSignal;
use crate::net::{
    AcceptRecovery, Accepted, ConnectionId, ConnectionPermit, ConnectionSet, Listener,
    ListenerError,
};

/// Build the Axum router with all middleware layers.
pub fn router(endpoint_path: &str, state: AppState) -> Router {
    Router::new()
        .route(endpoint_path, any(check_cache))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// HTTP server for the gateway.
pub struct HttpServer {
    listener: Listener,
    router: Router,
    connections: ConnectionSet,
}

/// What is left once the accept loop returns. The listening socket is
/// already closed at that point.
#[derive(Debug)]
pub struct Halted {
    /// Connections still finishing their requests.
    pub connections: ConnectionSet,
    /// Set when the listener died instead of being asked to stop.
    pub failure: Option<ListenerError>,
}

impl HttpServer {
    /// Create a server over an already bound listener.
    pub fn new(listener: Listener, state: AppState, endpoint_path: &str) -> Self {
        Self {
            listener,
            router: router(endpoint_path, state),
            connections: ConnectionSet::new(),
        }
    }

    /// Accept connections until `shutdown` fires or the listener dies.
    ///
    /// Connection tasks receive their own copy of `shutdown` and begin a
    /// graceful close when it fires.
    pub async fn accept_loop(self, mut shutdown: ShutdownSignal) -> Halted {
        let HttpServer {
            listener,
            router,
            mut connections,
        } = self;

        let failure = loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.recv() => break None,
                accepted = listener.accept() => accepted,
            };

            let Accepted {
                stream,
                peer,
                permit,
            } = match accepted {
                Ok(accepted) => accepted,
                Err(e) => match e.recovery() {
                    AcceptRecovery::Retry => {
                        tracing::debug!(error = %e, "Connection failed during accept");
                        continue;
                    }
                    AcceptRecovery::Backoff(pause) => {
                        tracing::error!(error = %e, pause = ?pause, "Accept error, backing off");
                        tokio::select! {
                            biased;
                            _ = shutdown.recv() => break None,
                            _ = tokio::time::sleep(pause) => continue,
                        }
                    }
                    AcceptRecovery::Stop => break Some(e),
                },
            };

            connections.reap();
            let service = TowerToHyperService::new(router.clone());
            connections.spawn(serve_connection(
                stream,
                peer,
                permit,
                service,
                shutdown.clone(),
            ));
        };

        drop(listener);
        tracing::info!(
            connections = connections.len(),
            "Listener closed, no longer accepting connections"
        );

        Halted {
            connections,
            failure,
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    _permit: ConnectionPermit,
    service: TowerToHyperService<Router>,
    mut shutdown: ShutdownSignal,
) {
    let id = ConnectionId::new();
    tracing::trace!(connection_id = %id, peer_addr = %peer, "Serving connection");

    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(
                        connection_id = %id,
                        peer_addr = %peer,
                        error = %e,
                        "Connection error"
                    );
                }
                break;
            }
            _ = shutdown.recv(), if !draining => {
                tracing::debug!(connection_id = %id, "Closing connection after in-flight requests");
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }

    tracing::trace!(connection_id = %id, "Connection closed");
}
