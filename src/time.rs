use anyhow::{bail, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Parses a time string into a local date time.
///
/// # Arguments
/// * `s` - Time string in one of the following formats:
///   - Unix timestamp (e.g. "1234567890")
///   - Date (e.g. "2024-03-20"), meaning the start of that day
///   - DateTime (e.g. "2024-03-20 15:30:00")
///
/// # Errors
/// Returns error if the input string cannot be parsed in any of the supported formats
pub fn parse_time(s: &str) -> Result<DateTime<Local>> {
    if let Ok(timestamp) = s.parse::<i64>() {
        return match Local.timestamp_opt(timestamp, 0).single() {
            Some(time) => Ok(time),
            None => bail!("invalid unix timestamp '{s}'"),
        };
    }

    let datetime = if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        date.and_time(NaiveTime::MIN)
    } else if let Ok(datetime) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        datetime
    } else {
        bail!("invalid time '{s}', expected formats: unix timestamp, YYYY-MM-DD, or YYYY-MM-DD HH:MM:SS");
    };

    match Local.from_local_datetime(&datetime).earliest() {
        Some(local) => Ok(local),
        None => bail!("invalid local time '{s}'"),
    }
}
