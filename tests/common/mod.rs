// Shared test helpers: an in-memory SNMP agent behind the session traits

#![allow(dead_code)]

pub mod udp_agent;

use routerwatch::models::{Counter, Device};
use routerwatch::snmp_repo::route_walk::ROUTE_TABLE_ROOT;
use routerwatch::snmp_repo::session::{Oid, SessionFactory, SnmpError, SnmpSession, SnmpValue};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

pub fn device(name: &str) -> Device {
    Device {
        name: name.into(),
        model: "Cisco 1941".into(),
        address: "127.0.0.1".parse().unwrap(),
        community: "public".into(),
        port: 161,
    }
}

pub fn oid(s: &str) -> Oid {
    s.parse().unwrap()
}

/// ipRouteDest row OID for a destination.
pub fn route_row(dest: [u8; 4]) -> Oid {
    let mut row = oid(ROUTE_TABLE_ROOT);
    for b in dest {
        row = row.child(u32::from(b));
    }
    row
}

/// A MIB served from memory with injectable failures.
#[derive(Clone, Default)]
pub struct FakeAgent {
    pub mib: BTreeMap<Oid, SnmpValue>,
    /// GETs on these OIDs time out.
    pub timeouts: HashSet<Oid>,
    /// The n-th GETNEXT (1-based) of a session fails.
    pub fail_next_on_call: Option<usize>,
    next_calls: usize,
}

impl FakeAgent {
    /// All six counters answering, plus the given route destinations.
    pub fn healthy(uptime_ticks: u32, routes: &[[u8; 4]]) -> Self {
        let mut agent = FakeAgent::default();
        agent.set(Counter::Uptime, SnmpValue::Timeticks(uptime_ticks));
        agent.set(Counter::InterfaceCount, SnmpValue::Integer(4));
        agent.set(
            Counter::Location,
            SnmpValue::OctetString(b"Server room".to_vec()),
        );
        agent.set(Counter::Memory, SnmpValue::Integer(157_286_400));
        agent.set(
            Counter::RestartCause,
            SnmpValue::OctetString(b"power-on".to_vec()),
        );
        agent.set(Counter::Temperature, SnmpValue::Unsigned32(38));
        for r in routes {
            agent.mib.insert(route_row(*r), SnmpValue::IpAddress(*r));
        }
        // next column, so a walk has to notice it left ipRouteDest
        agent.mib.insert(
            oid("1.3.6.1.2.1.4.21.1.2.0.0.0.0"),
            SnmpValue::Integer(1),
        );
        agent
    }

    pub fn set(&mut self, counter: Counter, value: SnmpValue) {
        self.mib.insert(oid(counter.oid()), value);
    }

    pub fn time_out(&mut self, counter: Counter) {
        self.timeouts.insert(oid(counter.oid()));
    }
}

impl SnmpSession for FakeAgent {
    fn get(&mut self, oid: &Oid) -> Result<SnmpValue, SnmpError> {
        if self.timeouts.contains(oid) {
            return Err(SnmpError::Timeout);
        }
        Ok(self.mib.get(oid).cloned().unwrap_or(SnmpValue::NoSuchObject))
    }

    fn get_next(&mut self, oid: &Oid) -> Result<(Oid, SnmpValue), SnmpError> {
        self.next_calls += 1;
        if self.fail_next_on_call == Some(self.next_calls) {
            return Err(SnmpError::Timeout);
        }
        match self
            .mib
            .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
            .next()
        {
            Some((k, v)) => Ok((k.clone(), v.clone())),
            None => Ok((oid.clone(), SnmpValue::EndOfMibView)),
        }
    }
}

/// Serves one FakeAgent per device name; unknown names fail to open.
#[derive(Clone, Default)]
pub struct FakeFactory {
    pub agents: HashMap<String, FakeAgent>,
}

impl FakeFactory {
    pub fn with(mut self, name: &str, agent: FakeAgent) -> Self {
        self.agents.insert(name.into(), agent);
        self
    }

    pub fn into_arc(self) -> Arc<dyn SessionFactory> {
        Arc::new(self)
    }
}

impl SessionFactory for FakeFactory {
    fn open(&self, device: &Device) -> Result<Box<dyn SnmpSession>, SnmpError> {
        match self.agents.get(&device.name) {
            Some(agent) => Ok(Box::new(agent.clone())),
            None => Err(SnmpError::Transport("host unreachable".into())),
        }
    }
}
