// Trigger time calculation
//
// All comparisons happen in the conference timezone. A talk produces two
// trigger times: the talk start, and a warning exactly five minutes before.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::TimestampError;

/// The warning fires this long before the talk starts
pub fn warning_offset() -> Duration {
    Duration::minutes(5)
}

/// Normalizes timestamps to the conference timezone and decides when
/// triggers are due.
#[derive(Debug, Clone, Copy)]
pub struct TimeGate {
    tz: Tz,
}

impl TimeGate {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Convert an offset-carrying timestamp to the conference timezone.
    ///
    /// Idempotent: converting an already-converted timestamp is a no-op.
    pub fn to_conference_time<T: TimeZone>(&self, ts: DateTime<T>) -> DateTime<Tz> {
        ts.with_timezone(&self.tz)
    }

    /// Interpret a naive wall-clock timestamp as conference-local time.
    pub fn from_local(&self, naive: NaiveDateTime) -> Result<DateTime<Tz>, TimestampError> {
        // DST gaps have no mapping; folds resolve to the earlier instant.
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| TimestampError {
                value: naive.to_string(),
            })
    }

    /// Parse a timestamp string from front matter.
    ///
    /// Accepts RFC 3339, `%Y-%m-%d %H:%M:%S %z`, and naive
    /// `%Y-%m-%d[T ]%H:%M:%S` forms; naive values are assumed to be
    /// conference-local wall-clock time.
    pub fn parse_timestamp(&self, raw: &str) -> Result<DateTime<Tz>, TimestampError> {
        let raw = raw.trim();

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(self.to_conference_time(ts));
        }
        if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
            return Ok(self.to_conference_time(ts));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return self.from_local(naive);
            }
        }

        Err(TimestampError {
            value: raw.to_string(),
        })
    }

    /// A trigger is due once "now" has reached it.
    pub fn is_due(&self, trigger: DateTime<Tz>, now: DateTime<Utc>) -> bool {
        trigger <= self.to_conference_time(now)
    }

    /// The instant the immediate announcement should go out.
    ///
    /// With `post_now` set the real start time is replaced by
    /// `now + 5min + 5s`, so the warning lands right away and the immediate
    /// message follows five seconds after it.
    pub fn effective_post_time(
        &self,
        start: DateTime<Tz>,
        now: DateTime<Utc>,
        post_now: bool,
    ) -> DateTime<Tz> {
        if post_now {
            self.to_conference_time(now + warning_offset() + Duration::seconds(5))
        } else {
            start
        }
    }

    /// The warning trigger for a given immediate trigger.
    pub fn warning_time(&self, post_time: DateTime<Tz>) -> DateTime<Tz> {
        post_time - warning_offset()
    }
}
