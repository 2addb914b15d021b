//! Shared IOB/COB snapshot store.
//!
//! The store publishes whole `PhysiologySnapshot` structs under a single
//! mutex, so a reader can never observe bolus-IOB from one refresh and COB
//! from another. `spawn_feed` runs the background data-refresh side: a
//! thread that consumes snapshot updates from a bounded channel and stamps
//! each with the injected clock.
//!
//! Safety: each `SnapshotFeed` owns exactly one thread that is shut down
//! when the handle is dropped, preventing thread leaks.
use crossbeam_channel as xch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bolus_traits::{Clock, PhysiologyQuery, PhysiologySnapshot};

#[derive(Debug, Clone, Copy)]
struct Stamped {
    as_of_ms: u64,
    view: PhysiologySnapshot,
}

/// Mutex-guarded snapshot store; cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    inner: Arc<Mutex<Stamped>>,
}

impl SnapshotStore {
    pub fn new(initial: PhysiologySnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Stamped {
                as_of_ms: 0,
                view: initial,
            })),
        }
    }

    /// Writer side: swap in a whole snapshot under the lock.
    pub fn publish(&self, as_of_ms: u64, view: PhysiologySnapshot) {
        match self.inner.lock() {
            Ok(mut guard) => *guard = Stamped { as_of_ms, view },
            Err(_) => {
                tracing::warn!(as_of_ms, "snapshot store lock poisoned; update dropped");
            }
        }
    }

    /// Timestamp of the currently published snapshot (ms since the feed
    /// epoch; 0 until the first publish).
    pub fn as_of_ms(&self) -> u64 {
        self.inner.lock().map(|g| g.as_of_ms).unwrap_or(0)
    }

    /// Spawn the background refresh thread, consuming snapshot updates
    /// from `rx` until the producer disconnects or the handle is dropped.
    pub fn spawn_feed<C>(&self, rx: xch::Receiver<PhysiologySnapshot>, clock: C) -> SnapshotFeed
    where
        C: Clock + Send + Sync + 'static,
    {
        let store = self.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                // Immediate shutdown check (lock-free atomic)
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("snapshot feed received shutdown signal");
                    // Deliver anything still queued so the last published
                    // snapshot is the last one sent, not whichever update
                    // happened to arrive before the flag flipped.
                    while let Ok(view) = rx.try_recv() {
                        store.publish(clock.ms_since(epoch), view);
                    }
                    break;
                }

                match rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(view) => {
                        let now = clock.ms_since(epoch);
                        store.publish(now, view);
                    }
                    Err(xch::RecvTimeoutError::Timeout) => {
                        // Wake periodically so the shutdown flag is honored
                        // even when the producer goes quiet.
                    }
                    Err(xch::RecvTimeoutError::Disconnected) => {
                        tracing::debug!("snapshot feed producer disconnected, exiting thread");
                        break;
                    }
                }
            }
            tracing::trace!("snapshot feed thread exiting cleanly");
        });

        SnapshotFeed {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl PhysiologyQuery for SnapshotStore {
    fn snapshot(
        &self,
        _at_ms: u64,
    ) -> Result<PhysiologySnapshot, Box<dyn std::error::Error + Send + Sync>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| "physiology snapshot lock poisoned")?;
        Ok(guard.view)
    }
}

/// Handle for the background refresh thread; signals shutdown and joins on
/// drop.
pub struct SnapshotFeed {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Drop for SnapshotFeed {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("snapshot feed thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "snapshot feed thread panicked during shutdown");
                }
            }
        }
    }
}
