// Latest scan outcome per device (live status view + WS push)

use chrono::NaiveDateTime;
use serde::Serialize;

use super::{CounterReading, Device, uptime::timestamp_format};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceScan {
    pub device: Device,
    pub reading: CounterReading,
    /// None until the first scan cycle has reached this device.
    #[serde(serialize_with = "timestamp_format::option::serialize")]
    pub polled_at: Option<NaiveDateTime>,
    /// Parsed uptime; None when the counter was unknown or not numeric.
    pub uptime_seconds: Option<u64>,
    /// Set when the uptime sample could not be persisted.
    pub storage_error: Option<String>,
}

impl DeviceScan {
    /// Placeholder shown before the first scan: every field `Unknown`.
    pub fn pending(device: Device) -> Self {
        Self {
            device,
            reading: CounterReading::unknown(),
            polled_at: None,
            uptime_seconds: None,
            storage_error: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.uptime_seconds.is_some_and(|s| s > 0)
    }
}
