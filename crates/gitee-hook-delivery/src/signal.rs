use std::fmt;

use tracing::{info, warn};

/// Which signal ended the intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

/// Resolves on SIGINT or SIGTERM. A handler that cannot be installed never
/// fires, so the other one still can.
pub async fn shutdown_signal() -> ShutdownReason {
    let reason = tokio::select! {
        reason = interrupt() => reason,
        reason = terminate() => reason,
    };
    info!(signal = %reason, "Shutdown requested, no longer accepting webhooks");
    reason
}

async fn interrupt() -> ShutdownReason {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "Failed to install SIGINT handler");
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}

#[cfg(unix)]
async fn terminate() -> ShutdownReason {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(error) => {
            warn!(error = %error, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
    ShutdownReason::Terminate
}

#[cfg(not(unix))]
async fn terminate() -> ShutdownReason {
    std::future::pending().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_names_the_signal() {
        assert_eq!(ShutdownReason::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownReason::Terminate.to_string(), "SIGTERM");
    }
}
