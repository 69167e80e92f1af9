use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Shutdown is the root token; every session gets a fresh child for
/// force-stop, so shutting down also interrupts the running session.
#[derive(Debug, Clone)]
pub struct SessionSignals {
    shutdown: CancellationToken,
    session: Arc<Mutex<CancellationToken>>,
}

impl SessionSignals {
    pub fn new() -> Self {
        let shutdown = CancellationToken::new();
        let session = Arc::new(Mutex::new(shutdown.child_token()));
        Self { shutdown, session }
    }

    /// Replaces the force-stop token and returns the new one.
    pub fn begin_session(&self) -> CancellationToken {
        let token = self.shutdown.child_token();
        let mut slot = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *slot = token.clone();
        token
    }

    pub fn current(&self) -> CancellationToken {
        self.session.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn force_stop(&self) {
        self.current().cancel();
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl Default for SessionSignals {
    fn default() -> Self {
        Self::new()
    }
}
