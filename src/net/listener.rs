//! Bounded TCP listener.
//!
//! # Responsibilities
//! - Bind the gateway's public socket
//! - Hand out one connection slot per accepted stream (`max_connections`)
//! - Say how to recover from each accept error
//!
//! # Design Decisions
//! - A slot is taken before `accept`, so a full gateway leaves new clients in
//!   the kernel backlog instead of accepting and stalling them
//! - Accept errors never end the listener on their own: per-connection errors
//!   are retried at once, resource exhaustion (EMFILE, ENFILE, ENOBUFS) after
//!   a pause. Only a closed slot limiter is terminal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

/// Pause after an accept error that is not tied to one connection.
pub const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The socket could not be bound.
    Bind(std::io::Error),
    /// `accept(2)` failed.
    Accept(std::io::Error),
    /// The slot limiter was closed; nothing more can be accepted.
    Closed,
}

/// How the accept loop should continue after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptRecovery {
    /// The failure concerned only the peer being accepted.
    Retry,
    /// The process is short on resources; wait before accepting again.
    Backoff(Duration),
    /// The listener cannot accept anymore.
    Stop,
}

impl ListenerError {
    pub fn recovery(&self) -> AcceptRecovery {
        match self {
            ListenerError::Accept(e) if is_connection_error(e) => AcceptRecovery::Retry,
            ListenerError::Accept(_) => AcceptRecovery::Backoff(ACCEPT_BACKOFF),
            ListenerError::Bind(_) | ListenerError::Closed => AcceptRecovery::Stop,
        }
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
    )
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
            ListenerError::Closed => write!(f, "Connection limiter closed"),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A stream accepted under a connection slot.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub permit: ConnectionPermit,
}

/// The gateway's listening socket plus its connection slots.
///
/// Dropping it closes the socket; later connection attempts are refused by
/// the kernel.
pub struct Listener {
    socket: TcpListener,
    slots: Arc<Semaphore>,
}

impl Listener {
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let socket = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = socket.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            socket,
            slots: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Wait for a free slot, then for a peer.
    pub async fn accept(&self) -> Result<Accepted, ListenerError> {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, peer) = self.socket.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(
            peer_addr = %peer,
            free_slots = self.free_slots(),
            "Connection accepted"
        );

        Ok(Accepted {
            stream,
            peer,
            permit: ConnectionPermit { _slot: slot },
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    pub fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// A connection slot, returned to the listener on drop (abort included).
#[derive(Debug)]
pub struct ConnectionPermit {
    _slot: OwnedSemaphorePermit,
}
