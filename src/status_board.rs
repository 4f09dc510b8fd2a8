// Live "current status" view: latest scan per configured device.
// Seeded with every device so unreachable ones are never dropped.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::{Device, DeviceScan};

pub struct StatusBoard {
    order: Vec<String>,
    latest: RwLock<HashMap<String, DeviceScan>>,
}

impl StatusBoard {
    pub fn new(devices: &[Device]) -> Self {
        let order = devices.iter().map(|d| d.name.clone()).collect();
        let latest = devices
            .iter()
            .map(|d| (d.name.clone(), DeviceScan::pending(d.clone())))
            .collect();
        Self {
            order,
            latest: RwLock::new(latest),
        }
    }

    /// Replaces the device's entry. Scans for names outside the fleet are ignored.
    pub async fn update(&self, scan: DeviceScan) {
        let mut latest = self.latest.write().await;
        if let Some(slot) = latest.get_mut(&scan.device.name) {
            *slot = scan;
        } else {
            tracing::warn!(device = %scan.device.name, "scan for unconfigured device ignored");
        }
    }

    pub async fn get(&self, name: &str) -> Option<DeviceScan> {
        self.latest.read().await.get(name).cloned()
    }

    /// All entries in configuration order.
    pub async fn snapshot(&self) -> Vec<DeviceScan> {
        let latest = self.latest.read().await;
        self.order
            .iter()
            .filter_map(|name| latest.get(name).cloned())
            .collect()
    }
}
