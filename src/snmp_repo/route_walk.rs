// ipRouteDest walk: GETNEXT from the table root until the subtree ends.
// A row that does not decode as an IPv4 address is skipped; any transport or
// protocol failure voids the whole table.

use std::net::Ipv4Addr;

use super::session::{Oid, SnmpError, SnmpSession, SnmpValue};
use crate::models::RouteTable;

/// ipRouteDest column of ipRouteTable.
pub const ROUTE_TABLE_ROOT: &str = "1.3.6.1.2.1.4.21.1.1";

/// Walks the route table and folds any failure into [`RouteTable::Unknown`].
pub fn walk_route_table(session: &mut dyn SnmpSession, max_rows: usize) -> RouteTable {
    match collect_routes(session, max_rows) {
        Ok(routes) => RouteTable::from_routes(routes),
        Err(e) => {
            tracing::debug!(error = %e, operation = "walk_route_table", "route walk aborted");
            RouteTable::Unknown
        }
    }
}

/// Destinations in walk order. Errors abort without a partial list.
pub fn collect_routes(
    session: &mut dyn SnmpSession,
    max_rows: usize,
) -> Result<Vec<Ipv4Addr>, SnmpError> {
    let root: Oid = ROUTE_TABLE_ROOT.parse()?;
    let mut cursor = root.clone();
    let mut routes = Vec::new();
    let mut rows = 0usize;

    loop {
        let (oid, value) = session.get_next(&cursor)?;
        if value == SnmpValue::EndOfMibView || !oid.is_child_of(&root) {
            break;
        }
        if oid <= cursor {
            return Err(SnmpError::Walk(format!(
                "agent returned non-increasing oid {} after {}",
                oid, cursor
            )));
        }
        rows += 1;
        if rows > max_rows {
            return Err(SnmpError::Walk(format!(
                "route table exceeded {} rows",
                max_rows
            )));
        }
        match route_destination(&value) {
            Some(dest) => routes.push(dest),
            None => tracing::debug!(oid = %oid, "skipping route row without IPv4 destination"),
        }
        cursor = oid;
    }

    Ok(routes)
}

/// Four octets as a dotted quad; anything else is not a destination.
fn route_destination(value: &SnmpValue) -> Option<Ipv4Addr> {
    match value {
        SnmpValue::IpAddress(octets) => Some(Ipv4Addr::from(*octets)),
        SnmpValue::OctetString(bytes) => {
            let octets: [u8; 4] = bytes.as_slice().try_into().ok()?;
            Some(Ipv4Addr::from(octets))
        }
        _ => None,
    }
}
