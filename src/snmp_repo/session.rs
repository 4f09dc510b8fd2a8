// SNMP session seam: owned OID/value types, blocking session traits,
// retry decorator, and the UDP transport (codec in `wire`).

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::wire::{self, RequestKind, Response};
use crate::models::Device;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnmpError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("agent returned error-status {status} (index {index})")]
    ErrorStatus { status: u32, index: u32 },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("invalid object identifier: {0:?}")]
    InvalidOid(String),
    #[error("walk protocol violation: {0}")]
    Walk(String),
}

impl SnmpError {
    /// Worth retrying: nothing usable came back from the agent.
    pub fn is_transient(&self) -> bool {
        matches!(self, SnmpError::Timeout | SnmpError::Transport(_))
    }
}

/// Numeric object identifier, ordered lexicographically by arc.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_arcs(arcs: impl Into<Vec<u32>>) -> Self {
        Self(arcs.into())
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    /// True when `self` lies under `root` (root itself excluded).
    pub fn is_child_of(&self, root: &Oid) -> bool {
        self.0.len() > root.0.len() && self.0.starts_with(&root.0)
    }

    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Oid(arcs)
    }
}

impl FromStr for Oid {
    type Err = SnmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim_start_matches('.')
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| SnmpError::InvalidOid(s.to_string()))?;
        if arcs.len() < 2 {
            return Err(SnmpError::InvalidOid(s.to_string()));
        }
        Ok(Oid(arcs))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

/// Owned varbind value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    ObjectId(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Unsigned32(u32),
    Timeticks(u32),
    Counter64(u64),
    Opaque(Vec<u8>),
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl SnmpValue {
    /// v2c exception values: the varbind carries no data.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView
        )
    }

    /// Human-readable text for a scalar counter; None for exceptions and NULL.
    pub fn display_text(&self) -> Option<String> {
        let text = match self {
            SnmpValue::Integer(v) => v.to_string(),
            SnmpValue::OctetString(bytes) => octets_to_text(bytes),
            SnmpValue::ObjectId(oid) => oid.to_string(),
            SnmpValue::IpAddress(ip) => std::net::Ipv4Addr::from(*ip).to_string(),
            SnmpValue::Counter32(v) | SnmpValue::Unsigned32(v) | SnmpValue::Timeticks(v) => {
                v.to_string()
            }
            SnmpValue::Counter64(v) => v.to_string(),
            SnmpValue::Opaque(bytes) => hex(bytes),
            SnmpValue::Null
            | SnmpValue::NoSuchObject
            | SnmpValue::NoSuchInstance
            | SnmpValue::EndOfMibView => return None,
        };
        Some(text)
    }
}

fn octets_to_text(bytes: &[u8]) -> String {
    let trimmed = match bytes.iter().rposition(|b| *b != 0) {
        Some(last) => &bytes[..=last],
        None => &[][..],
    };
    match std::str::from_utf8(trimmed) {
        Ok(s) if s.chars().all(|c| !c.is_control() || c.is_whitespace()) => s.to_string(),
        _ => hex(bytes),
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// One agent conversation. Calls block for at most the configured timeout.
pub trait SnmpSession: Send {
    fn get(&mut self, oid: &Oid) -> Result<SnmpValue, SnmpError>;

    /// Lexicographic successor of `oid` and its value.
    fn get_next(&mut self, oid: &Oid) -> Result<(Oid, SnmpValue), SnmpError>;
}

impl<S: SnmpSession + ?Sized> SnmpSession for Box<S> {
    fn get(&mut self, oid: &Oid) -> Result<SnmpValue, SnmpError> {
        (**self).get(oid)
    }

    fn get_next(&mut self, oid: &Oid) -> Result<(Oid, SnmpValue), SnmpError> {
        (**self).get_next(oid)
    }
}

/// Opens a session for a device using its own address and community.
pub trait SessionFactory: Send + Sync {
    fn open(&self, device: &Device) -> Result<Box<dyn SnmpSession>, SnmpError>;
}

/// Re-issues a request after a transient failure, up to `retries` extra times.
pub struct Retrying<S> {
    inner: S,
    retries: u32,
}

impl<S: SnmpSession> Retrying<S> {
    pub fn new(inner: S, retries: u32) -> Self {
        Self { inner, retries }
    }

    fn run<T>(
        &mut self,
        mut op: impl FnMut(&mut S) -> Result<T, SnmpError>,
    ) -> Result<T, SnmpError> {
        let mut attempt = 0;
        loop {
            match op(&mut self.inner) {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(error = %e, attempt, "snmp request retry");
                }
                other => return other,
            }
        }
    }
}

impl<S: SnmpSession> SnmpSession for Retrying<S> {
    fn get(&mut self, oid: &Oid) -> Result<SnmpValue, SnmpError> {
        self.run(|s| s.get(oid))
    }

    fn get_next(&mut self, oid: &Oid) -> Result<(Oid, SnmpValue), SnmpError> {
        self.run(|s| s.get_next(oid))
    }
}

/// Largest datagram a v2c agent can answer with.
const MAX_DATAGRAM: usize = 65_507;

/// SNMP v2c over one connected UDP socket.
///
/// Every request, retries included, carries a fresh request id. Replies with
/// any other id are late answers to earlier requests and are dropped, so one
/// slow reply cannot shift the answers of the requests that follow it.
pub struct UdpSession {
    socket: UdpSocket,
    community: Vec<u8>,
    timeout: Duration,
    next_req_id: i32,
    send_buf: snmp::pdu::Buf,
    recv_buf: Vec<u8>,
}

impl UdpSession {
    pub fn open(device: &Device, timeout: Duration) -> Result<Self, SnmpError> {
        let target = device.socket_addr();
        let local: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).map_err(transport_error)?;
        socket.connect(target).map_err(transport_error)?;
        Ok(Self {
            socket,
            community: device.community.as_bytes().to_vec(),
            timeout,
            next_req_id: 1,
            send_buf: snmp::pdu::Buf::default(),
            recv_buf: vec![0; MAX_DATAGRAM],
        })
    }

    fn request(&mut self, kind: RequestKind, oid: &Oid) -> Result<(Oid, SnmpValue), SnmpError> {
        let req_id = self.next_req_id;
        self.next_req_id = self.next_req_id.wrapping_add(1);

        wire::encode_request(kind, &self.community, req_id, oid, &mut self.send_buf)?;
        self.socket
            .send(&self.send_buf[..])
            .map_err(transport_error)?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SnmpError::Timeout);
            }
            self.socket
                .set_read_timeout(Some(remaining))
                .map_err(transport_error)?;
            let len = match self.socket.recv(&mut self.recv_buf) {
                Ok(len) => len,
                Err(e)
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
                {
                    return Err(SnmpError::Timeout);
                }
                Err(e) => return Err(transport_error(e)),
            };

            let response = match Response::parse(&self.recv_buf[..len]) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(error = %e, "dropping undecodable datagram");
                    continue;
                }
            };
            if response.req_id != req_id || response.community != self.community.as_slice() {
                tracing::debug!(
                    expected = req_id,
                    received = response.req_id,
                    "dropping stale response"
                );
                continue;
            }
            check_error_status(response.error_status, response.error_index)?;
            return response.first_varbind();
        }
    }
}

impl SnmpSession for UdpSession {
    fn get(&mut self, oid: &Oid) -> Result<SnmpValue, SnmpError> {
        self.request(RequestKind::Get, oid).map(|(_, value)| value)
    }

    fn get_next(&mut self, oid: &Oid) -> Result<(Oid, SnmpValue), SnmpError> {
        self.request(RequestKind::GetNext, oid)
    }
}

/// Production factory: one UDP session per device poll.
#[derive(Debug, Clone)]
pub struct UdpSessionFactory {
    pub timeout: Duration,
    pub retries: u32,
}

impl SessionFactory for UdpSessionFactory {
    fn open(&self, device: &Device) -> Result<Box<dyn SnmpSession>, SnmpError> {
        let session = UdpSession::open(device, self.timeout)?;
        Ok(Box::new(Retrying::new(session, self.retries)))
    }
}

fn check_error_status(status: u32, index: u32) -> Result<(), SnmpError> {
    if status == 0 {
        Ok(())
    } else {
        Err(SnmpError::ErrorStatus { status, index })
    }
}

fn transport_error(e: io::Error) -> SnmpError {
    SnmpError::Transport(e.to_string())
}
