//! Signal handling for graceful shutdown
//!
//! Ctrl-C and SIGTERM cancel the active run through its [`RunControl`]:
//! queued tasks are dropped and in-flight transfers finish or time out.

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::worker::RunControl;

/// Cancels a run when the process is asked to stop
pub struct SignalHandler {
    control: RunControl,
}

impl SignalHandler {
    pub fn new(control: RunControl) -> Self {
        Self { control }
    }

    /// Spawn the background task that waits for CTRL-C or SIGTERM
    pub fn setup(&self) -> JoinHandle<()> {
        let control = self.control.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling run");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling run");
                },
            }

            control.cancel();
        })
    }
}
