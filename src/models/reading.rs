// Per-poll counter values and the walked route table

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use crate::units::{self, UnitError};

/// The fixed set of scalar counters queried on every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Counter {
    Uptime,
    InterfaceCount,
    Location,
    Memory,
    RestartCause,
    Temperature,
}

impl Counter {
    pub const ALL: [Counter; 6] = [
        Counter::Uptime,
        Counter::InterfaceCount,
        Counter::Location,
        Counter::Memory,
        Counter::RestartCause,
        Counter::Temperature,
    ];

    /// Object identifier queried for this counter.
    pub fn oid(self) -> &'static str {
        match self {
            Counter::Uptime => "1.3.6.1.2.1.1.3.0",
            Counter::InterfaceCount => "1.3.6.1.2.1.2.1.0",
            Counter::Location => "1.3.6.1.2.1.1.6.0",
            Counter::Memory => "1.3.6.1.4.1.9.2.1.8.0",
            Counter::RestartCause => "1.3.6.1.4.1.9.2.1.2.0",
            Counter::Temperature => "1.3.6.1.4.1.9.9.13.1.3.1.3.1",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Counter::Uptime => "uptime",
            Counter::InterfaceCount => "interfaceCount",
            Counter::Location => "location",
            Counter::Memory => "memory",
            Counter::RestartCause => "restartCause",
            Counter::Temperature => "temperature",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A counter value as text, or the `Unknown` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterValue {
    Known(String),
    Unknown,
}

impl CounterValue {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            CounterValue::Known(v) => Some(v.as_str()),
            CounterValue::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CounterValue::Unknown)
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterValue::Known(v) => f.write_str(v),
            CounterValue::Unknown => f.write_str(units::UNKNOWN),
        }
    }
}

impl Serialize for CounterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of walking the route table. An empty walk is not a failed walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "routes", rename_all = "camelCase")]
pub enum RouteTable {
    /// Walk finished cleanly with at least one destination.
    Routes(Vec<Ipv4Addr>),
    /// Walk finished cleanly without rows.
    Empty,
    /// Walk aborted on a transport or protocol error.
    Unknown,
}

impl RouteTable {
    pub fn from_routes(routes: Vec<Ipv4Addr>) -> Self {
        if routes.is_empty() {
            RouteTable::Empty
        } else {
            RouteTable::Routes(routes)
        }
    }

    pub fn routes(&self) -> &[Ipv4Addr] {
        match self {
            RouteTable::Routes(r) => r,
            RouteTable::Empty | RouteTable::Unknown => &[],
        }
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTable::Routes(routes) => {
                let joined = routes
                    .iter()
                    .map(Ipv4Addr::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                f.write_str(&joined)
            }
            RouteTable::Empty => f.write_str(units::NONE),
            RouteTable::Unknown => f.write_str(units::UNKNOWN),
        }
    }
}

/// One poll of one device. Every counter key is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterReading {
    counters: BTreeMap<Counter, CounterValue>,
    pub route_table: RouteTable,
}

impl Default for CounterReading {
    fn default() -> Self {
        Self::unknown()
    }
}

impl CounterReading {
    /// Reading with every counter and the route table `Unknown`.
    pub fn unknown() -> Self {
        Self {
            counters: Counter::ALL
                .into_iter()
                .map(|c| (c, CounterValue::Unknown))
                .collect(),
            route_table: RouteTable::Unknown,
        }
    }

    pub fn get(&self, counter: Counter) -> &CounterValue {
        self.counters
            .get(&counter)
            .unwrap_or(&CounterValue::Unknown)
    }

    pub fn set(&mut self, counter: Counter, value: CounterValue) {
        self.counters.insert(counter, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Counter, &CounterValue)> {
        self.counters.iter().map(|(c, v)| (*c, v))
    }

    pub fn unknown_count(&self) -> usize {
        self.counters.values().filter(|v| v.is_unknown()).count()
    }

    /// Uptime in whole seconds, from the timeticks counter.
    pub fn uptime_seconds(&self) -> Result<u64, UnitError> {
        match self.get(Counter::Uptime).as_known() {
            Some(raw) => units::parse_uptime_seconds(raw),
            None => Err(UnitError::Empty),
        }
    }
}
