use crate::domain::clock::clock::{SharedClock, SystemClock};

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// Fixed point in time.
#[derive(Debug, Clone)]
pub struct MockClock {
    pub time: DateTime<Utc>,
}

impl MockClock {
    pub fn new(time: DateTime<Utc>) -> MockClock {
        MockClock { time }
    }
}

impl SystemClock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }

    fn clone_box(&self) -> SharedClock {
        SharedClock(Arc::new(self.clone()))
    }
}

/// Clock that can be advanced from a test while the code under test holds a clone.
#[derive(Debug, Clone)]
pub struct SharedMockClock {
    pub time: Arc<RwLock<DateTime<Utc>>>,
}

impl SharedMockClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        SharedMockClock { time: Arc::new(RwLock::new(time)) }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.time.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

impl SystemClock for SharedMockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clone_box(&self) -> SharedClock {
        SharedClock(Arc::new(self.clone()))
    }
}
