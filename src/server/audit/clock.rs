use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local};

/// Time source of the audit logger. Rotation decisions are made against it,
/// never against the wall clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        let mut cur = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *cur = now;
    }

    pub fn advance(&self, delta: Duration) {
        let mut cur = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *cur += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
