// Renderer input contract: status points, axis label format, and the
// display strings shown on the dashboard and device pages.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{
    Counter, CounterReading, Device, DeviceScan, TimelinePoint, uptime::timestamp_format,
};
use crate::units;

/// Axis label layout for the status graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelFormat {
    /// Whole series is today: `HH:MM`.
    TimeOnly,
    /// Series touches another date: `YYYY-MM-DD HH:MM`.
    DateTime,
}

impl LabelFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            LabelFormat::TimeOnly => "%H:%M",
            LabelFormat::DateTime => "%Y-%m-%d %H:%M",
        }
    }

    pub fn label(self, ts: NaiveDateTime) -> String {
        ts.format(self.pattern()).to_string()
    }
}

/// Time-only labels iff every point falls on `today`.
pub fn choose_label_format(points: &[TimelinePoint], today: NaiveDate) -> LabelFormat {
    if points.iter().all(|p| p.timestamp.date() == today) {
        LabelFormat::TimeOnly
    } else {
        LabelFormat::DateTime
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPoint {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub up: bool,
    pub label: String,
}

/// What the graph collaborator draws. No history is its own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TimelineView {
    NoData,
    #[serde(rename_all = "camelCase")]
    Series {
        label_format: LabelFormat,
        points: Vec<StatusPoint>,
    },
}

/// Points keep the aggregator order (newest first).
pub fn timeline_view(points: &[TimelinePoint], today: NaiveDate) -> TimelineView {
    if points.is_empty() {
        return TimelineView::NoData;
    }
    let label_format = choose_label_format(points, today);
    TimelineView::Series {
        label_format,
        points: points
            .iter()
            .map(|p| StatusPoint {
                timestamp: p.timestamp,
                up: p.is_up(),
                label: label_format.label(p.timestamp),
            })
            .collect(),
    }
}

/// One dashboard line per configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRow {
    pub name: String,
    pub model: String,
    pub address: String,
    pub uptime: String,
    pub location: String,
    pub up: bool,
}

pub fn dashboard_row(scan: &DeviceScan) -> DashboardRow {
    DashboardRow {
        name: scan.device.name.clone(),
        model: scan.device.model.clone(),
        address: scan.device.address.to_string(),
        uptime: scan
            .uptime_seconds
            .map(units::format_duration)
            .unwrap_or_else(|| units::UNKNOWN.to_string()),
        location: scan.reading.get(Counter::Location).to_string(),
        up: scan.is_up(),
    }
}

/// Device page: live counters plus history-derived uptime and timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetail {
    pub name: String,
    pub model: String,
    pub address: String,
    pub uptime: String,
    pub interfaces: String,
    pub route_table: String,
    pub location: String,
    pub memory: String,
    pub restart_cause: String,
    pub temperature: String,
    pub timeline: TimelineView,
}

/// `points` is the aggregated timeline, newest first; its head supplies the uptime.
pub fn device_detail(
    device: &Device,
    reading: &CounterReading,
    points: &[TimelinePoint],
    today: NaiveDate,
) -> DeviceDetail {
    DeviceDetail {
        name: device.name.clone(),
        model: device.model.clone(),
        address: device.address.to_string(),
        uptime: points
            .first()
            .map(|p| units::format_duration(p.uptime_seconds))
            .unwrap_or_else(|| units::UNKNOWN.to_string()),
        interfaces: reading.get(Counter::InterfaceCount).to_string(),
        route_table: reading.route_table.to_string(),
        location: reading.get(Counter::Location).to_string(),
        memory: units::format_memory(reading.get(Counter::Memory).as_known()),
        restart_cause: reading.get(Counter::RestartCause).to_string(),
        temperature: reading.get(Counter::Temperature).to_string(),
        timeline: timeline_view(points, today),
    }
}
