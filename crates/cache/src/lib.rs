//! Read-through cache used in front of catalog list queries.
//!
//! The cache is best-effort: writes may be refused and reads may miss, but no
//! operation ever returns an error. While an outage is simulated every read
//! misses and every write is refused; the outage ends on its own once the
//! injected clock passes the recovery instant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bookshelf_kernel::Clock;
use parking_lot::Mutex;
use time::OffsetDateTime;

/// Whether the cache is currently serving reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Online,
    Outage { until: OffsetDateTime },
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: OffsetDateTime,
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    outage_until: Option<OffsetDateTime>,
}

impl<V> Inner<V> {
    /// Clears an elapsed outage and reports whether one is still active.
    fn in_outage(&mut self, now: OffsetDateTime) -> bool {
        match self.outage_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.outage_until = None;
                tracing::info!("cache outage over, back online");
                false
            }
            None => false,
        }
    }
}

/// TTL cache keyed by query name.
pub struct CacheLayer<V> {
    inner: Mutex<Inner<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> CacheLayer<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                outage_until: None,
            }),
            clock,
        }
    }

    /// Return the cached value for `key` if present and not expired.
    ///
    /// Expired entries are evicted on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.in_outage(now) {
            return None;
        }

        match inner.entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        inner.entries.remove(key);
        tracing::debug!(key, "cache entry expired");
        None
    }

    /// Store `value` under `key` for `ttl`. Returns `false` when the write was
    /// refused because the cache is in an outage.
    pub fn set(&self, key: &str, value: V, ttl: Duration) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.in_outage(now) {
            tracing::debug!(key, "cache write refused during outage");
            return false;
        }

        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        true
    }

    /// Expire `key` immediately. Returns whether an entry was dropped.
    ///
    /// Unlike [`set`](Self::set) this is honoured during an outage, so a stale
    /// entry can never outlive the write that invalidated it.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.lock().entries.remove(key).is_some();
        if removed {
            tracing::debug!(key, "cache entry invalidated");
        }
        removed
    }

    /// Take the cache offline for `duration`, measured from now.
    pub fn simulate_outage(&self, duration: Duration) {
        let until = self.clock.now() + duration;
        self.inner.lock().outage_until = Some(until);
        tracing::warn!(duration_ms = duration.as_millis() as u64, "cache outage simulated");
    }

    pub fn state(&self) -> CacheState {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.in_outage(now) {
            // in_outage only returns true while outage_until is set
            CacheState::Outage {
                until: inner.outage_until.unwrap_or(now),
            }
        } else {
            CacheState::Online
        }
    }

    pub fn is_online(&self) -> bool {
        self.state() == CacheState::Online
    }
}
