//! Auto-save
//!
//! Marks the state dirty on every session change and, on a fixed interval,
//! saves a fresh snapshot from a blocking task. The thread that mutates
//! sessions never waits on disk I/O.
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped
//! ```
//!
//! At most one save is in flight; a tick that finds one running is skipped and
//! the dirty flag stays set for the next tick. Stopping does not flush and does
//! not cancel a save already dispatched.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use harbor_session::{SessionEvent, SessionManager, Snapshot};

use crate::Result;

/// Something that can persist a snapshot
pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &Snapshot) -> bool;
}

/// Something that can produce snapshots and announce changes
pub trait SnapshotSource: Send + Sync {
    fn create_snapshot(&self) -> Snapshot;

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

impl SnapshotSource for SessionManager {
    fn create_snapshot(&self) -> Snapshot {
        SessionManager::create_snapshot(self)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        SessionManager::subscribe(self)
    }
}

#[derive(Default)]
struct Flags {
    dirty: AtomicBool,
    saving: AtomicBool,
}

/// Clears the in-flight marker even if the store panics
struct SavingGuard(Arc<Flags>);

impl Drop for SavingGuard {
    fn drop(&mut self) {
        self.0.saving.store(false, Ordering::Release);
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    listener: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

pub struct AutoSave {
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn SnapshotStore>,
    interval: Duration,
    runtime: Option<Handle>,
    flags: Arc<Flags>,
    running: Mutex<Option<Running>>,
}

impl AutoSave {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

    pub fn new(source: Arc<dyn SnapshotSource>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            source,
            store,
            interval: Self::DEFAULT_INTERVAL,
            runtime: None,
            flags: Arc::new(Flags::default()),
            running: Mutex::new(None),
        }
    }

    /// How often to check for unsaved changes
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run on `runtime` instead of the runtime current at `start()`
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Whether changes arrived since the last dispatched save
    pub fn is_dirty(&self) -> bool {
        self.flags.dirty.load(Ordering::Acquire)
    }

    /// Subscribe to changes and start the timer. Starting twice is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current()?,
        };

        // Subscribe before returning so no change after start() is missed
        let events = self.source.subscribe();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let listener = runtime.spawn(listen(events, Arc::clone(&self.flags), shutdown_rx.clone()));
        let ticker = runtime.spawn(tick(
            self.interval,
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            Arc::clone(&self.flags),
            runtime.clone(),
            shutdown_rx,
        ));

        *running = Some(Running {
            shutdown,
            listener,
            ticker,
        });

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Auto-save started");
        Ok(())
    }

    /// Unsubscribe and cancel the timer. A save already running completes on its own.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            let _ = running.shutdown.send(true);
            running.listener.abort();
            running.ticker.abort();

            tracing::info!("Auto-save stopped");
        }
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn listen(
    mut events: broadcast::Receiver<SessionEvent>,
    flags: Arc<Flags>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    tracing::trace!(?event, "Session change");
                    flags.dirty.store(true, Ordering::Release);
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "Change listener lagged");
                    flags.dirty.store(true, Ordering::Release);
                }
                Err(RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

async fn tick(
    interval: Duration,
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn SnapshotStore>,
    flags: Arc<Flags>,
    runtime: Handle,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if *shutdown.borrow() {
                    break;
                }
                save_if_dirty(&source, &store, &flags, &runtime);
            }
            _ = shutdown.changed() => break,
        }
    }
}

/// Dispatch one save if there are unsaved changes and no save is running.
/// Returns whether a save was dispatched.
fn save_if_dirty(
    source: &Arc<dyn SnapshotSource>,
    store: &Arc<dyn SnapshotStore>,
    flags: &Arc<Flags>,
    runtime: &Handle,
) -> bool {
    // Only the ticker sets `saving`, so check-then-set cannot race
    if flags.saving.load(Ordering::Acquire) {
        if flags.dirty.load(Ordering::Acquire) {
            tracing::debug!("Previous save still running, skipping tick");
        }
        return false;
    }

    if !flags.dirty.swap(false, Ordering::AcqRel) {
        return false;
    }

    flags.saving.store(true, Ordering::Release);
    let snapshot = source.create_snapshot();
    let store = Arc::clone(store);
    let guard = SavingGuard(Arc::clone(flags));

    runtime.spawn_blocking(move || {
        let _guard = guard;
        let started = Instant::now();

        // Failures are not retried; the next change triggers another attempt
        if store.save(&snapshot) {
            tracing::debug!(
                sessions = snapshot.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Auto-saved sessions"
            );
        } else {
            tracing::warn!(sessions = snapshot.len(), "Auto-save failed");
        }
    });

    true
}
