//! Self-healing periodic GC scheduler.
//!
//! Drives [`run_gc`] on a fixed interval until stopped, or until too many
//! consecutive ticks fail, at which point the scheduler stops itself rather
//! than keep hammering an unhealthy backend. Tick failures never propagate
//! to the caller; they are visible only through diagnostics and the eventual
//! forced stop.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::clock::MonotonicClock;
use crate::gc::run_gc;
use crate::store::MetaStore;

/// Consecutive tick failures tolerated before the scheduler stops itself.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Scheduler timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Milliseconds between GC ticks.
    pub interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
        }
    }
}

struct SchedulerTask {
    shutdown_tx: watch::Sender<bool>,
    running: Arc<AtomicBool>,
}

/// Periodic GC driver with a consecutive-failure circuit breaker.
///
/// `start` and `stop` are idempotent. A sweep in flight when `stop` is
/// called runs to completion; only the wait for the next tick is
/// interruptible. At most one sweep is in flight at any time: the loop
/// awaits each sweep before waiting again, and ticks missed during a long
/// sweep are delayed rather than stacked.
pub struct GcScheduler {
    store: Arc<dyn MetaStore>,
    clock: Arc<MonotonicClock>,
    config: SchedulerConfig,
    task: Mutex<Option<SchedulerTask>>,
}

impl GcScheduler {
    /// Create a scheduler in the Stopped state.
    pub fn new(
        store: Arc<dyn MetaStore>,
        clock: Arc<MonotonicClock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            task: Mutex::new(None),
        }
    }

    /// Begin periodic sweeps. No-op when already running. The first tick
    /// fires one full interval after the call; the consecutive-failure
    /// counter starts at zero on every start.
    pub fn start(&self) {
        let mut slot = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if slot
            .as_ref()
            .is_some_and(|task| task.running.load(Ordering::SeqCst))
        {
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));
        tokio::spawn(tick_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.config.clone(),
            Arc::clone(&running),
            shutdown_rx,
        ));
        *slot = Some(SchedulerTask {
            shutdown_tx,
            running,
        });
    }

    /// Cancel future ticks. No-op when already stopped. A sweep already in
    /// progress is not interrupted.
    pub fn stop(&self) {
        let mut slot = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = slot.take() {
            let _ = task.shutdown_tx.send(true);
            task.running.store(false, Ordering::SeqCst);
        }
    }

    /// Whether the periodic task is active.
    pub fn is_running(&self) -> bool {
        let slot = self.task.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .map(|task| task.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

async fn tick_loop(
    store: Arc<dyn MetaStore>,
    clock: Arc<MonotonicClock>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let period = Duration::from_millis(config.interval_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures: u32 = 0;

    loop {
        // The shutdown branch is only selectable between ticks: once a sweep
        // starts it runs to completion.
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }

        match run_gc(store.as_ref(), clock.as_ref()).await {
            Ok(stats) => {
                consecutive_failures = 0;
                debug!(expired = stats.expired, "scheduled GC tick complete");
            }
            Err(err) => {
                consecutive_failures += 1;
                warn!(
                    consecutive_failures,
                    error = %err,
                    "scheduled GC tick failed"
                );
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    warn!(
                        limit = MAX_CONSECUTIVE_FAILURES,
                        "too many consecutive GC failures, stopping scheduler"
                    );
                    break;
                }
            }
        }
    }

    running.store(false, Ordering::SeqCst);
}
