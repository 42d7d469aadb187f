use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Source of "now" for every time-dependent rule
///
/// Handlers never call `Utc::now()` directly; they ask the clock held in
/// `AppState`, which tests pin to a known instant.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(instant) => *instant,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    /// Current wall-clock time in the platform's time zone
    pub fn local_now(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.now().with_timezone(&offset)
    }
}

/// Local calendar day a Unix timestamp falls on
pub fn local_day(timestamp: i64, offset: FixedOffset) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .with_timezone(&offset)
        .date_naive()
}
