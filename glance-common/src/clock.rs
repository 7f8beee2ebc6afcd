//! Time sources.
//!
//! Message timestamps double as ordering keys inside a session, so the
//! clock handed to a synchronizer never returns the same millisecond twice.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of unix-millisecond timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        crate::util::now_millis()
    }
}

/// Wraps another clock and guarantees strictly increasing values.
pub struct MonotonicClock {
    inner: Arc<dyn Clock>,
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new(inner: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            last: AtomicI64::new(i64::MIN),
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> i64 {
        let now = self.inner.now_ms();
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let next = if now > prev { now } else { prev + 1 };
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}
