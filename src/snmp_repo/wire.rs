// v2c message codec on top of the `snmp` crate's BER primitives.
// Requests use the crate's encoders. Responses are decoded here so the
// exception tags (noSuchObject, noSuchInstance, endOfMibView) survive.

use snmp::{AsnReader, ObjIdBuf, ObjectIdentifier, asn1};

use super::session::{Oid, SnmpError, SnmpValue};

const TAG_NO_SUCH_OBJECT: u8 = asn1::CLASS_CONTEXTSPECIFIC | asn1::PRIMITIVE;
const TAG_NO_SUCH_INSTANCE: u8 = asn1::CLASS_CONTEXTSPECIFIC | asn1::PRIMITIVE | 1;
const TAG_END_OF_MIB_VIEW: u8 = asn1::CLASS_CONTEXTSPECIFIC | asn1::PRIMITIVE | 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    GetNext,
}

/// Encodes one single-varbind request into `buf`.
pub fn encode_request(
    kind: RequestKind,
    community: &[u8],
    req_id: i32,
    oid: &Oid,
    buf: &mut snmp::pdu::Buf,
) -> Result<(), SnmpError> {
    // the crate's OID encoder asserts on these
    match oid.arcs() {
        [first, second, ..] if *first < 3 && *second < 40 => {}
        _ => return Err(SnmpError::InvalidOid(oid.to_string())),
    }
    match kind {
        RequestKind::Get => snmp::pdu::build_get(community, req_id, oid.arcs(), buf),
        RequestKind::GetNext => snmp::pdu::build_getnext(community, req_id, oid.arcs(), buf),
    }
    Ok(())
}

/// Header of a Response PDU. Varbinds are decoded on demand.
#[derive(Debug)]
pub struct Response<'a> {
    pub community: &'a [u8],
    pub req_id: i32,
    pub error_status: u32,
    pub error_index: u32,
    varbinds: &'a [u8],
}

impl<'a> Response<'a> {
    /// Fails on anything that is not a well-formed v2c Response.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, SnmpError> {
        let message = AsnReader::from_bytes(bytes)
            .read_raw(asn1::TYPE_SEQUENCE)
            .map_err(decode_error)?;
        let mut message = AsnReader::from_bytes(message);

        let version = message.read_asn_integer().map_err(decode_error)?;
        if version != snmp::snmp::VERSION_2 {
            return Err(SnmpError::Decode(format!("unsupported version {}", version)));
        }
        let community = message.read_asn_octetstring().map_err(decode_error)?;
        let pdu = message
            .read_raw(snmp::snmp::MSG_RESPONSE)
            .map_err(|_| SnmpError::Decode("not a response pdu".into()))?;
        let mut pdu = AsnReader::from_bytes(pdu);

        let req_id = read_int::<i32>(&mut pdu, "request id")?;
        let error_status = read_int::<u32>(&mut pdu, "error status")?;
        let error_index = read_int::<u32>(&mut pdu, "error index")?;
        let varbinds = pdu.read_raw(asn1::TYPE_SEQUENCE).map_err(decode_error)?;

        Ok(Self {
            community,
            req_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// First name/value pair of the varbind list.
    pub fn first_varbind(&self) -> Result<(Oid, SnmpValue), SnmpError> {
        let pair = AsnReader::from_bytes(self.varbinds)
            .read_raw(asn1::TYPE_SEQUENCE)
            .map_err(|_| SnmpError::Decode("response without varbinds".into()))?;
        let mut pair = AsnReader::from_bytes(pair);
        let name = pair.read_asn_objectidentifier().map_err(decode_error)?;
        let oid = owned_oid(&name)?;

        let tag = pair.peek_byte().map_err(decode_error)?;
        let value = match tag {
            TAG_NO_SUCH_OBJECT | TAG_NO_SUCH_INSTANCE | TAG_END_OF_MIB_VIEW => {
                pair.read_raw(tag).map_err(decode_error)?;
                match tag {
                    TAG_NO_SUCH_OBJECT => SnmpValue::NoSuchObject,
                    TAG_NO_SUCH_INSTANCE => SnmpValue::NoSuchInstance,
                    _ => SnmpValue::EndOfMibView,
                }
            }
            _ => match pair.next() {
                Some(value) => owned_value(value)?,
                None => {
                    return Err(SnmpError::Decode(format!(
                        "unsupported value tag 0x{:02x}",
                        tag
                    )));
                }
            },
        };
        Ok((oid, value))
    }
}

fn read_int<T: TryFrom<i64>>(reader: &mut AsnReader<'_>, field: &str) -> Result<T, SnmpError> {
    let raw = reader.read_asn_integer().map_err(decode_error)?;
    T::try_from(raw).map_err(|_| SnmpError::Decode(format!("{} out of range: {}", field, raw)))
}

fn decode_error(e: snmp::SnmpError) -> SnmpError {
    SnmpError::Decode(format!("{:?}", e))
}

fn owned_oid(name: &ObjectIdentifier<'_>) -> Result<Oid, SnmpError> {
    let mut buf: ObjIdBuf = [0u32; 128];
    let arcs = name
        .read_name(&mut buf)
        .map_err(|e| SnmpError::Decode(format!("object identifier: {:?}", e)))?;
    Ok(Oid::from_arcs(arcs.to_vec()))
}

fn owned_value(value: snmp::Value<'_>) -> Result<SnmpValue, SnmpError> {
    use snmp::Value;
    let v = match value {
        Value::Integer(v) => SnmpValue::Integer(v),
        Value::Boolean(b) => SnmpValue::Integer(i64::from(b)),
        Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
        Value::ObjectIdentifier(oid) => SnmpValue::ObjectId(owned_oid(&oid)?),
        Value::IpAddress(ip) => SnmpValue::IpAddress(ip),
        Value::Counter32(v) => SnmpValue::Counter32(v),
        Value::Unsigned32(v) => SnmpValue::Unsigned32(v),
        Value::Timeticks(v) => SnmpValue::Timeticks(v),
        Value::Counter64(v) => SnmpValue::Counter64(v),
        Value::Opaque(bytes) => SnmpValue::Opaque(bytes.to_vec()),
        Value::Null => SnmpValue::Null,
        _ => return Err(SnmpError::Decode("unsupported value type".into())),
    };
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        assert!(content.len() < 128);
        let mut out = vec![tag, content.len() as u8];
        out.extend_from_slice(content);
        out
    }

    /// Response carrying one varbind for 1.3.6.1 with the given value TLV.
    fn response(pdu_tag: u8, req_id: u8, status: u8, value: &[u8]) -> Vec<u8> {
        let mut pair = tlv(0x06, &[0x2b, 0x06, 0x01]);
        pair.extend_from_slice(value);
        let list = tlv(0x30, &tlv(0x30, &pair));
        let mut pdu = tlv(0x02, &[req_id]);
        pdu.extend(tlv(0x02, &[status]));
        pdu.extend(tlv(0x02, &[1]));
        pdu.extend(list);
        let mut msg = tlv(0x02, &[1]);
        msg.extend(tlv(0x04, b"public"));
        msg.extend(tlv(pdu_tag, &pdu));
        tlv(0x30, &msg)
    }

    #[test]
    fn decodes_exception_tags() {
        for (tag, expected) in [
            (0x80, SnmpValue::NoSuchObject),
            (0x81, SnmpValue::NoSuchInstance),
            (0x82, SnmpValue::EndOfMibView),
        ] {
            let bytes = response(0xa2, 7, 0, &[tag, 0x00]);
            let resp = Response::parse(&bytes).unwrap();
            assert_eq!(resp.req_id, 7);
            assert_eq!(resp.community, b"public");
            let (oid, value) = resp.first_varbind().unwrap();
            assert_eq!(oid.to_string(), "1.3.6.1");
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn decodes_plain_values_and_error_status() {
        let bytes = response(0xa2, 9, 5, &tlv(0x43, &[0x30, 0x39]));
        let resp = Response::parse(&bytes).unwrap();
        assert_eq!(resp.error_status, 5);
        assert_eq!(resp.error_index, 1);
        assert_eq!(resp.first_varbind().unwrap().1, SnmpValue::Timeticks(12_345));
    }

    #[test]
    fn rejects_non_response_pdu() {
        let bytes = response(0xa0, 1, 0, &[0x05, 0x00]);
        assert!(matches!(Response::parse(&bytes), Err(SnmpError::Decode(_))));
    }

    #[test]
    fn encode_rejects_oids_the_encoder_cannot_take() {
        let mut buf = snmp::pdu::Buf::default();
        let bad = Oid::from_arcs(vec![5, 3, 6]);
        assert!(matches!(
            encode_request(RequestKind::Get, b"public", 1, &bad, &mut buf),
            Err(SnmpError::InvalidOid(_))
        ));
        let good: Oid = "1.3.6.1.2.1.1.3.0".parse().unwrap();
        encode_request(RequestKind::GetNext, b"public", 1, &good, &mut buf).unwrap();
        assert_eq!(buf[0], asn1::TYPE_SEQUENCE);
    }
}
