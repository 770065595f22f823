use chrono::{DateTime, NaiveDate, Utc};

use crate::constants::{TIME_FORMAT, TIME_FORMAT_DAYS};
use crate::error::Result;

pub fn format_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_str(value, TIME_FORMAT)?.with_timezone(&Utc))
}

pub fn parse_day(value: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(value, TIME_FORMAT_DAYS)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_round_trip_keeps_sub_second_precision() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap() + chrono::Duration::microseconds(250_123);
        let formatted = format_time(time);

        assert!(formatted.starts_with("2024-03-01 12:30:05,"));
        assert!(formatted.ends_with("+0000"));
        assert_eq!(parse_time(&formatted).unwrap(), time);
    }

    #[test]
    fn test_day_keys() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(parse_day("2024-03-01").unwrap(), time.date_naive());
        assert!(parse_day("01.03.2024").is_err());
    }
}
