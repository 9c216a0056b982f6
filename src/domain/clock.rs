use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Header carrying an epoch-millisecond timestamp that replaces "now" when
/// the service runs in test mode.
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Resolves the request's notion of "now".
///
/// The override is honored only when `test_mode` is on and the raw value
/// parses as an integer; anything else falls back to `clock`.
pub fn resolve_now(clock: &dyn Clock, test_mode: bool, override_ms: Option<&str>) -> i64 {
    if test_mode
        && let Some(parsed) = override_ms.and_then(|raw| raw.trim().parse::<i64>().ok())
    {
        return parsed;
    }

    clock.now_ms()
}
