// Monitored device identity (static fleet from config)

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

fn default_snmp_port() -> u16 {
    161
}

/// One monitored router/switch. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub name: String,
    pub model: String,
    pub address: IpAddr,
    /// SNMP v2c community; never sent to API clients.
    #[serde(skip_serializing)]
    pub community: String,
    #[serde(default = "default_snmp_port")]
    pub port: u16,
}

impl Device {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}
