// Device poller: six scalar counters + route-table walk per device over SNMP.
// Every failure degrades to Unknown; poll() always returns a full reading.

pub mod route_walk;
pub mod session;
mod wire;

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::config::SnmpConfig;
use crate::models::{Counter, CounterReading, CounterValue, Device};
use session::{Oid, SessionFactory, SnmpError, SnmpSession, UdpSessionFactory};

#[derive(Clone)]
pub struct SnmpRepo {
    factory: Arc<dyn SessionFactory>,
    route_walk_max_rows: usize,
}

impl SnmpRepo {
    /// UDP-backed poller from the `[snmp]` config section.
    pub fn new(config: &SnmpConfig) -> Self {
        let factory = UdpSessionFactory {
            timeout: Duration::from_millis(config.timeout_ms),
            retries: config.retries,
        };
        Self::with_factory(Arc::new(factory), config.route_walk_max_rows)
    }

    pub fn with_factory(factory: Arc<dyn SessionFactory>, route_walk_max_rows: usize) -> Self {
        Self {
            factory,
            route_walk_max_rows,
        }
    }

    /// Polls one device on the blocking pool.
    #[instrument(
        skip(self, device),
        fields(repo = "snmp", operation = "poll", device = %device.name)
    )]
    pub async fn poll(&self, device: &Device) -> CounterReading {
        let repo = self.clone();
        let owned = device.clone();
        match tokio::task::spawn_blocking(move || repo.poll_blocking(&owned)).await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(error = %e, "snmp poll task failed");
                CounterReading::unknown()
            }
        }
    }

    /// Sequential counters then route walk, all on one session.
    pub fn poll_blocking(&self, device: &Device) -> CounterReading {
        let mut reading = CounterReading::unknown();
        let mut session = match self.factory.open(device) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    device = %device.name,
                    address = %device.socket_addr(),
                    error = %e,
                    "snmp session open failed"
                );
                return reading;
            }
        };

        for counter in Counter::ALL {
            match read_counter(session.as_mut(), counter) {
                Ok(value) => reading.set(counter, CounterValue::Known(value)),
                Err(e) => {
                    tracing::debug!(
                        device = %device.name,
                        counter = %counter,
                        error = %e,
                        "counter unavailable"
                    );
                }
            }
        }

        reading.route_table =
            route_walk::walk_route_table(session.as_mut(), self.route_walk_max_rows);

        let unknown = reading.unknown_count();
        if unknown == Counter::ALL.len() {
            tracing::info!(device = %device.name, "device unreachable, all counters unknown");
        } else if unknown > 0 {
            tracing::debug!(device = %device.name, unknown, "partial reading");
        }
        reading
    }
}

fn read_counter(session: &mut dyn SnmpSession, counter: Counter) -> Result<String, SnmpError> {
    let oid: Oid = counter.oid().parse()?;
    let value = session.get(&oid)?;
    value
        .display_text()
        .ok_or_else(|| SnmpError::Decode(format!("no value for {}", oid)))
}
