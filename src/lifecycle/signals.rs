//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate the first signal into a [`StopReason`]
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Failure to install handlers is reported, not panicked on

use super::shutdown::StopReason;

/// Wait for SIGINT or SIGTERM.
pub async fn termination() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = interrupt.recv() => Ok("SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("ctrl-c")
    }
}

/// Resolve with the stop reason produced by the OS.
pub async fn wait_for_termination() -> StopReason {
    match termination().await {
        Ok(name) => {
            tracing::info!(signal = name, "Received signal, initiating graceful shutdown");
            StopReason::Signal(name)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            StopReason::SignalHandler(e.to_string())
        }
    }
}
