use serde::Deserialize;
use std::collections::HashSet;

use crate::models::Device;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub snmp: SnmpConfig,
    pub monitoring: MonitoringConfig,
    pub publishing: PublishingConfig,
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnmpConfig {
    /// Per-request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts after a timeout; at most one.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Upper bound on rows accepted from one route-table walk.
    #[serde(default = "default_route_walk_max_rows")]
    pub route_walk_max_rows: usize,
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_retries() -> u32 {
    1
}

fn default_route_walk_max_rows() -> usize {
    4096
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            route_walk_max_rows: default_route_walk_max_rows(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub scan_interval_secs: u64,
    /// How often to log app stats (ws clients, samples saved, storage failures) at INFO level.
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of scan results kept in the broadcast channel for /ws/status.
    /// Slow clients may lag.
    pub broadcast_capacity: usize,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.snmp.timeout_ms > 0,
            "snmp.timeout_ms must be > 0, got {}",
            self.snmp.timeout_ms
        );
        anyhow::ensure!(
            self.snmp.retries <= 1,
            "snmp.retries must be 0 or 1, got {}",
            self.snmp.retries
        );
        anyhow::ensure!(
            self.snmp.route_walk_max_rows > 0,
            "snmp.route_walk_max_rows must be > 0, got {}",
            self.snmp.route_walk_max_rows
        );
        anyhow::ensure!(
            self.monitoring.scan_interval_secs > 0,
            "monitoring.scan_interval_secs must be > 0, got {}",
            self.monitoring.scan_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(!self.devices.is_empty(), "devices must not be empty");

        let mut seen = HashSet::new();
        for d in &self.devices {
            anyhow::ensure!(!d.name.trim().is_empty(), "devices.name must be non-empty");
            anyhow::ensure!(
                seen.insert(d.name.as_str()),
                "devices.name must be unique, {:?} appears twice",
                d.name
            );
            anyhow::ensure!(
                !d.community.is_empty(),
                "devices.community must be non-empty for {:?}",
                d.name
            );
            anyhow::ensure!(d.port > 0, "devices.port must be > 0 for {:?}", d.name);
        }
        Ok(())
    }
}
