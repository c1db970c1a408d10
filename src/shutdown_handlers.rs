use tracing::info;

use crate::shutdown::Shutdown;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Cancels `shutdown` on Ctrl+C or SIGTERM. The task exits once the run is
/// cancelled from anywhere.
pub fn setup_signal_shutdown_handler(shutdown: &Shutdown) -> tokio::task::JoinHandle<()> {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                eprintln!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = shutdown.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, stopping run.");
                    shutdown.cancel();
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    info!("SIGTERM received, stopping run.");
                    shutdown.cancel();
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = shutdown.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, stopping run.");
                    shutdown.cancel();
                }
            }
        }
    })
}
