//! Host lifecycle notifications.
//!
//! The surrounding application tells the core when the negotiated version
//! changes and when the game has finished loading. Components that react to
//! those moments implement [`LifecycleObserver`] and register with a
//! [`Lifecycle`].

use std::sync::{Arc, RwLock};

use crate::version::{ProtocolVersion, VersionCell};

/// Receiver of host lifecycle events.
///
/// Callbacks run on whichever thread raised the event. Implementations that
/// touch host state must post to the main loop themselves.
pub trait LifecycleObserver: Send + Sync {
    /// The negotiated version changed from `old` to `new`.
    fn on_version_changed(&self, _old: ProtocolVersion, _new: ProtocolVersion) {}

    /// The host finished loading.
    fn on_game_loaded(&self) {}
}

/// Owner of the negotiated version and its observers.
///
/// Created once at startup and kept for the lifetime of the process.
pub struct Lifecycle {
    version: Arc<VersionCell>,
    observers: RwLock<Vec<Arc<dyn LifecycleObserver>>>,
}

impl Lifecycle {
    /// Create a lifecycle starting at `initial`.
    #[must_use]
    pub fn new(initial: ProtocolVersion) -> Self {
        Self {
            version: Arc::new(VersionCell::new(initial)),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn register(&self, observer: Arc<dyn LifecycleObserver>) {
        self.observers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(observer);
    }

    /// Current negotiated version.
    #[must_use]
    pub fn version(&self) -> ProtocolVersion { self.version.get() }

    /// Shared handle to the version cell, for readers outside the lifecycle.
    #[must_use]
    pub fn version_cell(&self) -> Arc<VersionCell> { Arc::clone(&self.version) }

    /// Replace the negotiated version.
    ///
    /// Observers are notified only when the value actually changes. Returns
    /// the previous version.
    pub fn change_version(&self, new: ProtocolVersion) -> ProtocolVersion {
        let old = self.version.replace(new);
        if old != new {
            log::info!("target version changed: {old} -> {new}");
            for observer in self.snapshot() {
                observer.on_version_changed(old, new);
            }
        }
        old
    }

    /// Notify observers that the host finished loading.
    pub fn game_loaded(&self) {
        for observer in self.snapshot() {
            observer.on_game_loaded();
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn LifecycleObserver>> {
        self.observers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("version", &self.version.get())
            .finish_non_exhaustive()
    }
}
