use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;

/// Source of "now" in the platform's civil time zone
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// Wall clock rendered in a fixed zone
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Settable clock; every read advances it by `step` so consecutive calls are strictly ordered
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
    tz: Tz,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            current: Mutex::new(start),
            step: Duration::seconds(1),
            tz,
        }
    }

    pub fn starting_at(year: i32, month: u32, day: u32) -> Self {
        let start = Utc
            .with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::new(start, chrono_tz::Asia::Jakarta)
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Tz> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let now = *current;
        *current += self.step;
        now.with_timezone(&self.tz)
    }
}
