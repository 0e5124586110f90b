//! Rate-limit pacing and cooperative cancellation for batch loops.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spaces consecutive remote calls by a fixed delay.
///
/// The first call goes out immediately. Every later call waits `delay` first,
/// so there is one wait between each pair of calls and none after the last.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    calls: u64,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, calls: 0 }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of calls admitted so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Waits until the next call may start.
    ///
    /// Returns `false` if `cancel` fired during the wait; the call must then
    /// not be made.
    pub async fn ready(&mut self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let first = self.calls == 0;
        self.calls += 1;

        if first || self.delay.is_zero() {
            return true;
        }

        debug!(delay_ms = self.delay.as_millis() as u64, "Pacing before next call");
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

/// Cancels `token` on Ctrl-C. The returned handle can be aborted once the
/// run is over.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, abandoning the in-flight call");
            token.cancel();
        }
    })
}
