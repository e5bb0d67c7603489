use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Source of "now" in the single fixed reference timezone. All date
/// comparisons, week projection and lead-time arithmetic go through this
/// seam so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock rendered in a fixed UTC offset.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> SystemClock {
        SystemClock { offset }
    }

    pub fn utc() -> SystemClock {
        SystemClock {
            offset: FixedOffset::east_opt(0).expect("zero offset is always valid"),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Manually driven clock for tests.
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> FixedClock {
        FixedClock { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock lock poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().expect("clock lock poisoned")
    }
}
