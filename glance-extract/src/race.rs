//! Single-winner settlement between page load and the timeout.

use std::sync::atomic::{AtomicU8, Ordering};

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const TIMED_OUT: u8 = 2;

/// How a race was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceOutcome {
    Pending,
    Completed,
    TimedOut,
}

/// `Pending` moves to exactly one of `Completed` or `TimedOut`; the first
/// writer wins and every later attempt is refused.
#[derive(Debug, Default)]
pub struct RaceState(AtomicU8);

impl RaceState {
    pub fn new() -> Self {
        Self(AtomicU8::new(PENDING))
    }

    /// Claim the race for the load listener.
    pub fn complete(&self) -> bool {
        self.settle(COMPLETED)
    }

    /// Claim the race for the timer.
    pub fn time_out(&self) -> bool {
        self.settle(TIMED_OUT)
    }

    pub fn outcome(&self) -> RaceOutcome {
        match self.0.load(Ordering::Acquire) {
            COMPLETED => RaceOutcome::Completed,
            TIMED_OUT => RaceOutcome::TimedOut,
            _ => RaceOutcome::Pending,
        }
    }

    fn settle(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
