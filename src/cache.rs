use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// How long a memoized dashboard report stays valid.
pub const DASHBOARD_TTL_SECS: i64 = 30;

/// Time source for cache expiry. Injected so tests can move time instead of
/// sleeping through the TTL.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock(Mutex::new(start))
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

struct Slot {
    computed_at: DateTime<Utc>,
    value: Value,
}

/// Per-session memo of the assembled dashboard report. Entries live for
/// `DASHBOARD_TTL_SECS` and die with their session; nothing is shared across
/// sessions and nothing reacts to data changes inside the window.
#[derive(Default)]
pub struct DashboardCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl DashboardCache {
    pub fn new() -> Self {
        DashboardCache::default()
    }

    /// Returns the memoized report if one exists and is younger than the TTL.
    pub fn get(&self, session: &str, now: DateTime<Utc>) -> Option<Value> {
        let slots = self.slots.lock().unwrap();
        let slot = slots.get(session)?;
        if now.signed_duration_since(slot.computed_at) < Duration::seconds(DASHBOARD_TTL_SECS) {
            Some(slot.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, session: &str, now: DateTime<Utc>, value: Value) {
        let mut slots = self.slots.lock().unwrap();
        slots.insert(
            session.to_string(),
            Slot {
                computed_at: now,
                value,
            },
        );
    }

    /// Drops a session's entry; called when the session itself is destroyed.
    pub fn invalidate(&self, session: &str) {
        let mut slots = self.slots.lock().unwrap();
        slots.remove(session);
    }
}
