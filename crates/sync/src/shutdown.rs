use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Exit code used when a second interrupt forces the process to quit.
pub const FORCE_EXIT_CODE: i32 = 130;

/// Cooperative shutdown signal shared between an orchestrator and whoever
/// wants it to stop.
///
/// Requesting shutdown never aborts work in flight: the orchestrator finishes
/// the current batch, then stops before starting the next one. Clones share
/// the same underlying signal.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}
impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next batch boundary. Idempotent.
    pub fn request(&self) {
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Listen for Ctrl+C in the background.
    ///
    /// The first interrupt requests a graceful shutdown. A second one exits
    /// the process immediately with [`FORCE_EXIT_CODE`].
    pub fn install_signal_handler(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for interrupts");
                return;
            }
            tracing::warn!("shutdown requested, finishing the current batch (interrupt again to force quit)");
            shutdown.request();

            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::error!(code = FORCE_EXIT_CODE, "force quit");
                std::process::exit(FORCE_EXIT_CODE);
            }
        })
    }
}
