//! Cooperative stop signal shared by the monitor, the listener, and the
//! Ctrl-C handler.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle over a single watch channel. Triggering is sticky and
/// idempotent; a subscriber created after the trigger still observes it
/// through [`StopSignal::is_stopped`].
#[derive(Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        // send() would drop the value when no receiver is alive yet
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver whose `changed()` resolves once the signal fires.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
