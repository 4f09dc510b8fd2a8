// Unit conversion for raw SNMP counter semantics (centiseconds, bytes).
// Display tokens here are consumed verbatim by the dashboard UI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shown whenever a value could not be read or parsed.
pub const UNKNOWN: &str = "Unknown";
/// Shown for a route table that was walked cleanly but had no rows.
pub const NONE: &str = "none";

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;
const TICKS_PER_SECOND: u64 = 100;
const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("empty counter value")]
    Empty,
    #[error("not a non-negative integer: {0:?}")]
    NotAnInteger(String),
}

/// Days/hours/minutes/seconds breakdown of a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationParts {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DurationParts {
    pub fn total_seconds(&self) -> u64 {
        self.days * SECS_PER_DAY
            + self.hours * SECS_PER_HOUR
            + self.minutes * SECS_PER_MINUTE
            + self.seconds
    }
}

impl fmt::Display for DurationParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

pub fn decompose_duration(seconds: u64) -> DurationParts {
    DurationParts {
        days: seconds / SECS_PER_DAY,
        hours: (seconds % SECS_PER_DAY) / SECS_PER_HOUR,
        minutes: (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE,
        seconds: seconds % SECS_PER_MINUTE,
    }
}

/// sysUpTime and friends count in hundredths of a second.
pub fn ticks_to_seconds(ticks: u64) -> u64 {
    ticks / TICKS_PER_SECOND
}

pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MEGABYTE
}

/// Parse the first whitespace-separated token as a non-negative integer.
fn parse_leading_u64(raw: &str) -> Result<u64, UnitError> {
    let token = raw.split_whitespace().next().ok_or(UnitError::Empty)?;
    token
        .parse::<u64>()
        .map_err(|_| UnitError::NotAnInteger(token.to_string()))
}

/// Uptime counter text (timeticks) to whole seconds.
pub fn parse_uptime_seconds(raw: &str) -> Result<u64, UnitError> {
    parse_leading_u64(raw).map(ticks_to_seconds)
}

pub fn parse_bytes(raw: &str) -> Result<u64, UnitError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UnitError::Empty);
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| UnitError::NotAnInteger(trimmed.to_string()))
}

pub fn format_duration(seconds: u64) -> String {
    decompose_duration(seconds).to_string()
}

/// `"{mb:.2} MB"`, or [`UNKNOWN`] when the counter is missing or not numeric.
pub fn format_memory(raw: Option<&str>) -> String {
    match raw.map(parse_bytes) {
        Some(Ok(bytes)) => format!("{:.2} MB", bytes_to_megabytes(bytes)),
        _ => UNKNOWN.to_string(),
    }
}

/// Formatted uptime from raw timeticks text, or [`UNKNOWN`].
pub fn format_uptime_ticks(raw: Option<&str>) -> String {
    match raw.map(parse_uptime_seconds) {
        Some(Ok(seconds)) => format_duration(seconds),
        _ => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_zero() {
        assert_eq!(decompose_duration(0).to_string(), "0d 0h 0m 0s");
    }

    #[test]
    fn decompose_recomposes_and_stays_in_range() {
        for s in [1, 59, 60, 3_599, 3_600, 86_399, 86_400, 123_456, 9_876_543_210] {
            let parts = decompose_duration(s);
            assert_eq!(parts.total_seconds(), s);
            assert!(parts.hours < 24);
            assert!(parts.minutes < 60);
            assert!(parts.seconds < 60);
        }
    }

    #[test]
    fn ticks_floor_divide() {
        assert_eq!(ticks_to_seconds(250), 2);
        assert_eq!(ticks_to_seconds(99), 0);
        assert_eq!(ticks_to_seconds(100), 1);
    }

    #[test]
    fn uptime_scenario_from_raw_ticks() {
        let secs = parse_uptime_seconds("12345600").unwrap();
        assert_eq!(secs, 123_456);
        assert_eq!(
            decompose_duration(secs),
            DurationParts {
                days: 1,
                hours: 10,
                minutes: 17,
                seconds: 36
            }
        );
        assert_eq!(format_uptime_ticks(Some("12345600")), "1d 10h 17m 36s");
    }

    #[test]
    fn uptime_takes_first_token() {
        assert_eq!(parse_uptime_seconds("4200 (0:00:42.00)").unwrap(), 42);
    }

    #[test]
    fn malformed_values_are_errors_not_zero() {
        assert_eq!(parse_uptime_seconds(""), Err(UnitError::Empty));
        assert!(matches!(
            parse_uptime_seconds("-100"),
            Err(UnitError::NotAnInteger(_))
        ));
        assert!(parse_bytes("12.5").is_err());
        assert_eq!(format_uptime_ticks(Some("garbage")), UNKNOWN);
        assert_eq!(format_uptime_ticks(None), UNKNOWN);
    }

    #[test]
    fn memory_formats_two_decimals() {
        assert_eq!(format_memory(Some("1048576")), "1.00 MB");
        assert_eq!(format_memory(Some("157286400")), "150.00 MB");
        assert_eq!(format_memory(Some("1572864")), "1.50 MB");
        assert_eq!(format_memory(Some("n/a")), UNKNOWN);
        assert_eq!(format_memory(None), UNKNOWN);
    }
}
