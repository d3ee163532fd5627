use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::IsoDuration;

static DATE_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

static DURATION_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?",
        r"(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    ))
    .expect("valid duration regex")
});

// Wall-clock layouts tried after RFC 3339. `%.f` also matches no fraction.
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// ISO-8601 date-time. Offsets are accepted but dropped: the components
/// returned are the ones written in the input.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    // bare date → midnight
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Strictly `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if !DATE_RX.is_match(s) { return None; }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn parse_duration(s: &str) -> Option<IsoDuration> {
    // "P" and "P1DT" match the regex but carry no component
    if s.len() < 3 || s.ends_with('T') { return None; }
    let caps = DURATION_RX.captures(s)?;

    let part = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    Some(IsoDuration {
        years: part(1)?,
        months: part(2)?,
        weeks: part(3)?,
        days: part(4)?,
        hours: part(5)?,
        minutes: part(6)?,
        seconds: match caps.get(7) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0.0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn datetime_layouts() {
        let dt = parse_datetime("2024-01-15T10:30:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (10, 30, 0));

        let frac = parse_datetime("2024-01-15T10:30:00.250").unwrap();
        assert_eq!(frac.nanosecond(), 250_000_000);

        let zoned = parse_datetime("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(zoned.hour(), 10);

        assert!(parse_datetime("2024-01-15 08:00").is_some());
        assert_eq!(parse_datetime("2024-01-15").unwrap().hour(), 0);
    }

    #[test]
    fn datetime_rejects_garbage() {
        assert!(parse_datetime("2024-13-01T00:00:00").is_none());
        assert!(parse_datetime("2024-02-30").is_none());
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn dates_need_zero_padding() {
        assert!(parse_date("2024-01-05").is_some());
        assert!(parse_date("2024-1-5").is_none());
    }

    #[test]
    fn durations() {
        let d = parse_duration("P1Y2M3DT4H5M6.5S").unwrap();
        assert_eq!((d.years, d.months, d.days), (1, 2, 3));
        assert_eq!((d.hours, d.minutes, d.seconds), (4, 5, 6.5));
        assert_eq!(parse_duration("P2W").unwrap().weeks, 2);
        assert_eq!(parse_duration("PT30M").unwrap().minutes, 30);
        assert!(parse_duration("P").is_none());
        assert!(parse_duration("PT").is_none());
        assert!(parse_duration("P1DT").is_none());
        assert!(parse_duration("1D").is_none());
    }
}
