// Uptime history rows and aggregated timeline points

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Persisted timestamp layout (local wall clock, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// serde helpers for `NaiveDateTime` in [`TIMESTAMP_FORMAT`].
pub mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::TIMESTAMP_FORMAT;
        use chrono::NaiveDateTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            ts: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.collect_str(&ts.format(TIMESTAMP_FORMAT)),
                None => s.serialize_none(),
            }
        }
    }
}

/// One recorded uptime observation. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeSample {
    pub device_name: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub uptime_seconds: u64,
}

impl UptimeSample {
    pub fn new(
        device_name: impl Into<String>,
        timestamp: NaiveDateTime,
        uptime_seconds: u64,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            timestamp,
            uptime_seconds,
        }
    }
}

/// Representative sample of one 20-minute bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub uptime_seconds: u64,
}

impl TimelinePoint {
    /// An unreachable device reports zero, so zero means down.
    pub fn is_up(&self) -> bool {
        self.uptime_seconds > 0
    }
}

impl From<&UptimeSample> for TimelinePoint {
    fn from(s: &UptimeSample) -> Self {
        Self {
            timestamp: s.timestamp,
            uptime_seconds: s.uptime_seconds,
        }
    }
}
