//! Rate limiting for repeated diagnostics

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Lets a diagnostic through at most once per period
///
/// Meant to live in a `static` next to the log call it guards.
#[derive(Debug)]
pub struct LogThrottle {
    period: Duration,
    last: Mutex<Option<Instant>>,
}

impl LogThrottle {
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            last: Mutex::new(None),
        }
    }

    /// True if the period has elapsed since the last accepted call
    pub fn ready(&self) -> bool {
        let now = Instant::now();
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *last {
            Some(prev) if now.duration_since(prev) < self.period => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
