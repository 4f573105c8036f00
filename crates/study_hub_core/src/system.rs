//! crates/study_hub_core/src/system.rs
//!
//! Production implementations of the `Clock` and `IdGenerator` capabilities.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::ports::{Clock, IdGenerator};

/// Wall-clock time that never goes backwards, even if the system clock does.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_nanos: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let previous = self.last_nanos.fetch_max(wall, Ordering::SeqCst);
        Utc.timestamp_nanos(previous.max(wall))
    }
}

/// Random v4 UUIDs rendered as hyphenated strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
