//! Time sources injected into the catalog and cache.
//!
//! Production code runs on [`SystemClock`] and [`RandomLatency`]; tests swap
//! in [`ManualClock`] and [`NoLatency`] so expiry and outage windows can be
//! driven without waiting on real time.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use time::OffsetDateTime;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

/// Simulated network latency applied before each catalog operation.
#[async_trait]
pub trait Latency: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a uniformly random duration in `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct RandomLatency {
    min: Duration,
    max: Duration,
}

impl RandomLatency {
    pub fn new(min: Duration, max: Duration) -> Self {
        // Settings validation guarantees ordering, but swap rather than panic in `gen_range`.
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[async_trait]
impl Latency for RandomLatency {
    async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Completes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLatency;

#[async_trait]
impl Latency for NoLatency {
    async fn pause(&self) {}
}
