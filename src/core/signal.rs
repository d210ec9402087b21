//! External stop signal for a continuous run.

use tokio_util::sync::CancellationToken;

/// Cloneable handle; stopping any clone stops them all.
///
/// The orchestrator checks it between phases and while waiting out the
/// inter-cycle interval. In-flight external calls are never torn down.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `stop` has been called on any clone
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }
}
