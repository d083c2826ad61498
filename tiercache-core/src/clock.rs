//! Logical clock abstraction.
//!
//! Every time-sensitive operation reads the current tick from an injected
//! [`Clock`] rather than a global. Hosts driving a step loop use
//! [`ManualClock`] and advance it once per step; hosts without a step
//! counter can derive ticks from wall time with [`WallClock`].

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One discrete execution step of the host.
pub type Tick = u64;

/// Source of the current logical time.
///
/// Implementations must be monotonic: a later call never returns a smaller
/// tick than an earlier one.
pub trait Clock: Send + Sync {
    /// The current tick.
    fn now(&self) -> Tick;
}

/// Clock advanced explicitly by the host (or by a test).
#[derive(Debug, Default)]
pub struct ManualClock {
    tick: AtomicU64,
}

impl ManualClock {
    /// Create a clock positioned at `tick`.
    pub fn new(tick: Tick) -> Self {
        Self {
            tick: AtomicU64::new(tick),
        }
    }

    /// Move the clock forward by `ticks`. Returns the new tick.
    pub fn advance(&self, ticks: Tick) -> Tick {
        self.tick.fetch_add(ticks, Ordering::SeqCst) + ticks
    }

    /// Jump to `tick`. Moving backwards is ignored to keep the clock monotonic.
    pub fn set(&self, tick: Tick) {
        self.tick.fetch_max(tick, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }
}

/// Clock deriving ticks from wall time.
///
/// `tick = (now - epoch) / tick_length`. Wall time can step backwards, so
/// the last observed tick is kept and never undercut.
#[derive(Debug)]
pub struct WallClock {
    epoch: DateTime<Utc>,
    tick_length: Duration,
    last: AtomicU64,
}

impl WallClock {
    /// Create a wall clock starting at the current instant.
    pub fn new(tick_length: Duration) -> Self {
        Self::with_epoch(Utc::now(), tick_length)
    }

    /// Create a wall clock counting from an explicit epoch.
    pub fn with_epoch(epoch: DateTime<Utc>, tick_length: Duration) -> Self {
        Self {
            epoch,
            tick_length,
            last: AtomicU64::new(0),
        }
    }

    /// The configured tick length.
    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    fn ticks_since_epoch(&self) -> Tick {
        let elapsed = (Utc::now() - self.epoch)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let length = self.tick_length.as_millis().max(1);
        Tick::try_from(elapsed.as_millis() / length).unwrap_or(Tick::MAX)
    }
}

impl Clock for WallClock {
    fn now(&self) -> Tick {
        let observed = self.ticks_since_epoch();
        let previous = self.last.fetch_max(observed, Ordering::SeqCst);
        previous.max(observed)
    }
}
