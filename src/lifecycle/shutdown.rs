//! Shutdown coordination for listener tasks and the event bridge.

use tokio::sync::broadcast;

/// Coordinator for stopping a set of long-running tasks.
///
/// Each listener task subscribes once; `trigger` tells all of them to
/// finish. The channel capacity is one because the signal carries no
/// payload and is only ever sent once.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    ///
    /// A send error only means every subscriber already went away, which
    /// is not a failure for a shutdown notification.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
