//! Time sources for cooldowns and event timestamps.
//!
//! Cooldowns are measured against a [`Clock`] rather than tick counts, so
//! changing the tick interval does not change how often a colony builds or
//! attacks. The server runs on [`MonotonicClock`]; tests and the headless
//! runner use [`SimulationClock`], which only moves when the engine ticks.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A source of elapsed time in seconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Seconds since the clock's origin.
    fn now(&self) -> f64;

    /// Called by the engine at the start of every tick.
    fn advance(&mut self, _delta_time: f64) {}

    /// Millisecond timestamp stamped on action events.
    fn timestamp_millis(&self) -> u64 {
        (self.now() * 1000.0) as u64
    }
}

/// Wall-clock time from a monotonic [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
    epoch_millis: u64,
}

impl MonotonicClock {
    /// Start a clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        let epoch_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            epoch_millis,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn timestamp_millis(&self) -> u64 {
        self.epoch_millis + self.origin.elapsed().as_millis() as u64
    }
}

/// Simulated time advanced only by ticks.
#[derive(Debug, Clone, Default)]
pub struct SimulationClock {
    elapsed: f64,
}

impl SimulationClock {
    /// A clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock starting at `elapsed` seconds.
    #[must_use]
    pub fn starting_at(elapsed: f64) -> Self {
        Self { elapsed }
    }
}

impl Clock for SimulationClock {
    fn now(&self) -> f64 {
        self.elapsed
    }

    fn advance(&mut self, delta_time: f64) {
        self.elapsed += delta_time.max(0.0);
    }
}
