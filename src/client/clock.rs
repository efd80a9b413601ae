use std::sync::Mutex;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

/// Monotonic microsecond clock: every reading is strictly after the last.
#[derive(Debug, Default)]
pub(crate) struct Clock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl Clock {
    pub(crate) fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().trunc_subsecs(6);
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = match *last {
            Some(previous) if wall <= previous => previous + TimeDelta::microseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}
