// Loopback SNMP v2c agent on a real UDP socket, for exercising UdpSession.
// Requests are decoded with the `snmp` crate; responses are BER-encoded here
// so exception values and error-status can be sent on purpose.

use routerwatch::models::Device;
use routerwatch::snmp_repo::session::{Oid, SnmpValue};
use snmp::{ObjIdBuf, SnmpMessageType, SnmpPdu};
use std::collections::{BTreeMap, HashMap};
use std::net::{SocketAddr, UdpSocket};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// How the agent answers.
#[derive(Clone, Default)]
pub struct AgentBehavior {
    pub mib: BTreeMap<Oid, SnmpValue>,
    /// The first reply of the agent's lifetime is held back this long.
    pub delay_first_reply: Option<Duration>,
    /// Every reply is sent twice.
    pub duplicate_replies: bool,
    /// Requests for these OIDs get this error-status (index 1) and a NULL value.
    pub error_status: HashMap<Oid, u32>,
}

impl AgentBehavior {
    pub fn new(mib: BTreeMap<Oid, SnmpValue>) -> Self {
        Self {
            mib,
            ..Default::default()
        }
    }

    fn answer(&self, kind: &SnmpMessageType, oid: &Oid) -> (u32, Oid, SnmpValue) {
        if let Some(status) = self.error_status.get(oid) {
            return (*status, oid.clone(), SnmpValue::Null);
        }
        match kind {
            SnmpMessageType::GetNextRequest => {
                match self
                    .mib
                    .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
                    .next()
                {
                    Some((k, v)) => (0, k.clone(), v.clone()),
                    None => (0, oid.clone(), SnmpValue::EndOfMibView),
                }
            }
            _ => (
                0,
                oid.clone(),
                self.mib.get(oid).cloned().unwrap_or(SnmpValue::NoSuchObject),
            ),
        }
    }
}

/// Serves until dropped.
pub struct UdpAgent {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl UdpAgent {
    pub fn start(behavior: AgentBehavior) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let requests = requests.clone();
            let stop = stop.clone();
            std::thread::spawn(move || serve(socket, behavior, requests, stop))
        };
        Self {
            addr,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    /// Device pointing at this agent with community "public".
    pub fn device(&self, name: &str) -> Device {
        Device {
            name: name.into(),
            model: "Edgerouter X".into(),
            address: self.addr.ip(),
            community: "public".into(),
            port: self.addr.port(),
        }
    }

    pub fn requests_seen(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for UdpAgent {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A loopback port with nothing listening on it.
pub fn silent_device(name: &str) -> Device {
    let port = UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    Device {
        name: name.into(),
        model: "Edgerouter X".into(),
        address: "127.0.0.1".parse().unwrap(),
        community: "public".into(),
        port,
    }
}

fn serve(
    socket: UdpSocket,
    behavior: AgentBehavior,
    requests: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; 65_507];
    let mut delay = behavior.delay_first_reply;
    while !stop.load(Ordering::SeqCst) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let Ok(mut pdu) = SnmpPdu::from_bytes(&buf[..len]) else {
            continue;
        };
        let Some((name, _)) = pdu.varbinds.next() else {
            continue;
        };
        let mut arcs: ObjIdBuf = [0; 128];
        let Ok(arcs) = name.read_name(&mut arcs) else {
            continue;
        };
        requests.fetch_add(1, Ordering::SeqCst);

        let oid = Oid::from_arcs(arcs.to_vec());
        let (status, reply_oid, value) = behavior.answer(&pdu.message_type, &oid);
        let reply = encode_response(b"public", pdu.req_id, status, &reply_oid, &value);

        if let Some(d) = delay.take() {
            std::thread::sleep(d);
        }
        let _ = socket.send_to(&reply, peer);
        if behavior.duplicate_replies {
            let _ = socket.send_to(&reply, peer);
        }
    }
}

pub fn encode_response(
    community: &[u8],
    req_id: i32,
    status: u32,
    oid: &Oid,
    value: &SnmpValue,
) -> Vec<u8> {
    let mut pair = tlv(0x06, &oid_content(oid));
    pair.extend(encode_value(value));
    let varbinds = tlv(0x30, &tlv(0x30, &pair));

    let mut pdu = integer(0x02, i64::from(req_id));
    pdu.extend(integer(0x02, i64::from(status)));
    pdu.extend(integer(0x02, if status == 0 { 0 } else { 1 }));
    pdu.extend(varbinds);

    let mut msg = integer(0x02, 1);
    msg.extend(tlv(0x04, community));
    msg.extend(tlv(0xa2, &pdu));
    tlv(0x30, &msg)
}

fn encode_value(value: &SnmpValue) -> Vec<u8> {
    match value {
        SnmpValue::Integer(v) => integer(0x02, *v),
        SnmpValue::OctetString(bytes) => tlv(0x04, bytes),
        SnmpValue::ObjectId(oid) => tlv(0x06, &oid_content(oid)),
        SnmpValue::IpAddress(ip) => tlv(0x40, ip),
        SnmpValue::Counter32(v) => unsigned(0x41, u64::from(*v)),
        SnmpValue::Unsigned32(v) => unsigned(0x42, u64::from(*v)),
        SnmpValue::Timeticks(v) => unsigned(0x43, u64::from(*v)),
        SnmpValue::Opaque(bytes) => tlv(0x44, bytes),
        SnmpValue::Counter64(v) => unsigned(0x46, *v),
        SnmpValue::Null => tlv(0x05, &[]),
        SnmpValue::NoSuchObject => tlv(0x80, &[]),
        SnmpValue::NoSuchInstance => tlv(0x81, &[]),
        SnmpValue::EndOfMibView => tlv(0x82, &[]),
    }
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(content);
    out
}

/// Minimal two's-complement encoding.
fn integer(tag: u8, v: i64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    tlv(tag, &bytes[start..])
}

fn unsigned(tag: u8, v: u64) -> Vec<u8> {
    let mut bytes = vec![0u8];
    bytes.extend_from_slice(&v.to_be_bytes());
    let mut start = 0;
    while start < bytes.len() - 1 && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
        start += 1;
    }
    tlv(tag, &bytes[start..])
}

fn oid_content(oid: &Oid) -> Vec<u8> {
    let arcs = oid.arcs();
    let mut out = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for arc in &arcs[2..] {
        let mut groups = vec![(arc & 0x7f) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            groups.push((rest & 0x7f) as u8 | 0x80);
            rest >>= 7;
        }
        out.extend(groups.iter().rev());
    }
    out
}
