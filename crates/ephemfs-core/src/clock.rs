//! Tamper-resistant monotonic clock.
//!
//! Wraps a wall-clock source so that readings from one instance never go
//! backwards and cannot jump unboundedly forward. Each instance owns its own
//! `last`/`start` state; instances are never synchronized with each other.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Source of raw wall-clock readings in milliseconds since the Unix epoch.
pub trait WallClock: Send + Sync {
    /// Current wall-clock reading in milliseconds.
    fn wall_ms(&self) -> u64;
}

/// The process wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn wall_ms(&self) -> u64 {
        // A system clock set before the epoch reads as 0.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Tolerances for suspicious wall-clock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Largest backward jump absorbed without freezing the clock (ms).
    pub max_backwards_ms: u64,
    /// Ceiling on forward movement relative to the instance's start time (ms).
    pub max_forward_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            max_backwards_ms: 1_000,
            max_forward_ms: 3_600_000,
        }
    }
}

#[derive(Debug)]
struct ClockState {
    last: u64,
    start: u64,
}

/// Monotonic timestamp source.
///
/// Successive [`now_ms`](MonotonicClock::now_ms) calls on one instance never
/// decrease, and are bounded above by `start + max_forward_ms` until the real
/// wall clock passes that bound.
pub struct MonotonicClock {
    config: ClockConfig,
    source: Box<dyn WallClock>,
    state: Mutex<ClockState>,
}

impl MonotonicClock {
    /// Create a clock over the system wall clock.
    pub fn new(config: ClockConfig) -> Self {
        Self::with_source(config, Box::new(SystemWallClock))
    }

    /// Create a clock over an injected wall-clock source.
    pub fn with_source(config: ClockConfig, source: Box<dyn WallClock>) -> Self {
        let start = source.wall_ms();
        Self {
            config,
            source,
            state: Mutex::new(ClockState { last: start, start }),
        }
    }

    /// Current timestamp in milliseconds.
    pub fn now_ms(&self) -> u64 {
        let current = self.source.wall_ms();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let ceiling = state.start.saturating_add(self.config.max_forward_ms);
        if current > ceiling {
            warn!(current, ceiling, "suspicious forward clock jump, clamping");
            state.last = ceiling;
            return ceiling;
        }

        if current.saturating_add(self.config.max_backwards_ms) < state.last {
            debug!(
                current,
                last = state.last,
                "backward clock jump beyond tolerance, holding last value"
            );
            return state.last;
        }

        if current >= state.last {
            state.last = current;
            return current;
        }

        // Small backward jump within tolerance: hold.
        state.last
    }
}

impl std::fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
