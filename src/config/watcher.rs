//! Property file watcher for external edits.

use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::store::PropertyStore;

/// Watches the backing property file and folds external edits back into
/// the store, which replays them as ordinary change events.
pub struct PropertyWatcher {
    store: Arc<PropertyStore>,
}

impl PropertyWatcher {
    pub fn new(store: Arc<PropertyStore>) -> Self {
        Self { store }
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for the watch to stay
    /// active. Stores without a backing file have nothing to watch.
    pub fn run(self) -> notify::Result<Option<RecommendedWatcher>> {
        let Some(path) = self.store.path().map(|p| p.to_path_buf()) else {
            return Ok(None);
        };
        let store = self.store;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Property file change detected, reloading");
                        if let Err(e) = store.reload_from_disk() {
                            tracing::error!(
                                error = %e,
                                "Failed to reload properties. Keeping current values."
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Property watcher started");
        Ok(Some(watcher))
    }
}
