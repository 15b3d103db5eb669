//! Conversion between calendar dates and the tick counts used across the
//! storage boundary.
//!
//! A tick is 100 nanoseconds; tick zero is 0001-01-01T00:00:00Z. The
//! representation matches the legacy exports this data interchanges with,
//! so the conversion must round-trip exactly.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

pub const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

/// Ticks from 0001-01-01T00:00:00Z to the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

pub fn from_datetime(dt: DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS
        + dt.timestamp() * TICKS_PER_SECOND
        + i64::from(dt.timestamp_subsec_nanos()) / NANOS_PER_TICK
}

pub fn to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    let rel = ticks - UNIX_EPOCH_TICKS;
    let secs = rel.div_euclid(TICKS_PER_SECOND);
    let nanos = rel.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    DateTime::from_timestamp(secs, nanos as u32)
}

/// Release dates persist as midnight UTC.
pub fn from_date(date: NaiveDate) -> i64 {
    from_datetime(date.and_time(NaiveTime::MIN).and_utc())
}

pub fn to_date(ticks: i64) -> Option<NaiveDate> {
    to_datetime(ticks).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch_constant() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(from_datetime(epoch), UNIX_EPOCH_TICKS);
    }

    #[test]
    fn test_datetime_round_trip_millisecond_precision() {
        let dt = "2024-01-02T15:30:45.123Z".parse::<DateTime<Utc>>().unwrap();
        let back = to_datetime(from_datetime(dt)).unwrap();
        assert_eq!(back.timestamp_millis(), dt.timestamp_millis());
    }

    #[test]
    fn test_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(to_date(from_date(date)), Some(date));
    }

    #[test]
    fn test_later_dates_have_larger_ticks() {
        let earlier = from_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        let later = from_date(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert!(later > earlier);
        assert_eq!(later - earlier, 7 * 24 * 3600 * TICKS_PER_SECOND);
    }
}
