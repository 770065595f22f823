use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of "now" for the manager and migrator. Injected so that cooldowns and
/// expiries can be driven by tests instead of the wall clock.
pub trait SystemClock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn clone_box(&self) -> SharedClock;
}

#[derive(Debug)]
pub struct SharedClock(pub Arc<dyn SystemClock>);

impl Clone for SharedClock {
    fn clone(&self) -> Self {
        self.0.clone_box()
    }
}

impl std::ops::Deref for SharedClock {
    type Target = dyn SystemClock;
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl From<SharedClock> for Arc<dyn SystemClock> {
    fn from(wrapper: SharedClock) -> Self {
        wrapper.0
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Default)]
pub struct UtcClock;

impl SystemClock for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn clone_box(&self) -> SharedClock {
        SharedClock(Arc::new(self.clone()))
    }
}
