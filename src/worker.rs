// Background scan worker. Each cycle polls every device concurrently;
// uptime samples go through one dedicated history writer task (channel),
// which acknowledges every write so storage faults reach the device's scan.

use crate::history_repo::HistoryRepo;
use crate::models::{Device, DeviceScan, UptimeSample};
use crate::snmp_repo::SnmpRepo;
use crate::status_board::StatusBoard;
use chrono::{NaiveDateTime, SubsecRound};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

/// Rate limit for "no receivers" log (avoid logging every cycle when no one is on /ws/status)
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Channel capacity for the history writer (backpressure if writer falls behind).
pub fn writer_channel_capacity(device_count: usize) -> usize {
    (device_count * 2).max(32)
}

/// One append, answered on `ack` once the row is committed (or failed).
pub struct WriteRequest {
    pub sample: UptimeSample,
    pub ack: oneshot::Sender<anyhow::Result<()>>,
}

/// Everything one scan cycle needs.
#[derive(Clone)]
pub struct ScanDeps {
    pub snmp_repo: Arc<SnmpRepo>,
    pub devices: Arc<Vec<Device>>,
    pub board: Arc<StatusBoard>,
    pub tx: broadcast::Sender<DeviceScan>,
    pub write_tx: mpsc::Sender<WriteRequest>,
    pub storage_failures_total: Arc<AtomicU64>,
}

/// Repos, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub scan: ScanDeps,
    pub ws_status_connections: Arc<AtomicUsize>,
    pub samples_saved_total: Arc<AtomicU64>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    pub scan_interval_secs: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Outcome counts of one scan cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub devices: usize,
    pub samples_written: usize,
    pub uptime_unknown: usize,
    pub storage_failures: usize,
}

/// Spawns the task that owns all appends to the uptime store.
/// Exits when every sender is dropped.
pub fn spawn_history_writer(
    mut write_rx: mpsc::Receiver<WriteRequest>,
    history_repo: Arc<HistoryRepo>,
    samples_saved_total: Arc<AtomicU64>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_written: HashMap<String, NaiveDateTime> = HashMap::new();
        while let Some(WriteRequest { sample, ack }) = write_rx.recv().await {
            let sample = keep_non_decreasing(&mut last_written, sample);
            let result = history_repo.append_uptime(&sample).await;
            if result.is_ok() {
                samples_saved_total.fetch_add(1, Ordering::Relaxed);
            }
            if ack.send(result).is_err() {
                tracing::debug!(
                    device = %sample.device_name,
                    "write acknowledged after requester left"
                );
            }
        }
        tracing::debug!("History writer shutting down");
    })
}

/// Clamp a sample older than the device's previous one (wall clock stepped back).
fn keep_non_decreasing(
    last_written: &mut HashMap<String, NaiveDateTime>,
    mut sample: UptimeSample,
) -> UptimeSample {
    if let Some(prev) = last_written.get(&sample.device_name)
        && sample.timestamp < *prev
    {
        tracing::warn!(
            device = %sample.device_name,
            timestamp = %sample.timestamp,
            previous = %prev,
            "clock went backwards; clamping sample timestamp"
        );
        sample.timestamp = *prev;
    }
    last_written.insert(sample.device_name.clone(), sample.timestamp);
    sample
}

/// Hands a sample to the writer and waits for the commit result.
pub async fn submit_sample(
    write_tx: &mpsc::Sender<WriteRequest>,
    sample: UptimeSample,
) -> anyhow::Result<()> {
    let (ack, done) = oneshot::channel();
    write_tx
        .send(WriteRequest { sample, ack })
        .await
        .map_err(|_| anyhow::anyhow!("history writer is not running"))?;
    done.await
        .map_err(|_| anyhow::anyhow!("history writer dropped the request"))?
}

fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local().trunc_subsecs(0)
}

/// Poll one device and persist its uptime. Never fails: problems are recorded on the scan.
pub async fn scan_device(
    snmp_repo: &SnmpRepo,
    device: &Device,
    write_tx: &mpsc::Sender<WriteRequest>,
) -> DeviceScan {
    let reading = snmp_repo.poll(device).await;
    let polled_at = now_local();

    let uptime_seconds = match reading.uptime_seconds() {
        Ok(secs) => Some(secs),
        Err(e) => {
            tracing::debug!(device = %device.name, error = %e, "uptime not recorded");
            None
        }
    };

    let mut storage_error = None;
    if let Some(secs) = uptime_seconds {
        let sample = UptimeSample::new(device.name.clone(), polled_at, secs);
        if let Err(e) = submit_sample(write_tx, sample).await {
            tracing::error!(
                device = %device.name,
                error = %e,
                operation = "append_uptime",
                "failed to persist uptime sample"
            );
            storage_error = Some(e.to_string());
        }
    }

    DeviceScan {
        device: device.clone(),
        reading,
        polled_at: Some(polled_at),
        uptime_seconds,
        storage_error,
    }
}

/// One scan cycle over the whole fleet. Devices are polled concurrently.
pub async fn run_scan(deps: &ScanDeps) -> ScanReport {
    let scans = futures_util::future::join_all(
        deps.devices
            .iter()
            .map(|d| scan_device(&deps.snmp_repo, d, &deps.write_tx)),
    )
    .await;

    let mut report = ScanReport {
        devices: scans.len(),
        ..Default::default()
    };
    for scan in scans {
        match (scan.uptime_seconds, &scan.storage_error) {
            (None, _) => report.uptime_unknown += 1,
            (Some(_), Some(_)) => {
                report.storage_failures += 1;
                deps.storage_failures_total.fetch_add(1, Ordering::Relaxed);
            }
            (Some(_), None) => report.samples_written += 1,
        }
        // Err only means no /ws/status subscribers.
        let _ = deps.tx.send(scan.clone());
        deps.board.update(scan).await;
    }
    report
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        scan,
        ws_status_connections,
        samples_saved_total,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        scan_interval_secs,
        stats_log_interval_secs,
    } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", scan_interval_secs);

    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_secs(scan_interval_secs));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut scans_total: u64 = 0;
            let mut last_no_receivers_warn: Option<Instant> = None;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let started = Instant::now();
                        let report = run_scan(&scan).await;
                        scans_total += 1;
                        tracing::info!(
                            devices = report.devices,
                            samples_written = report.samples_written,
                            uptime_unknown = report.uptime_unknown,
                            storage_failures = report.storage_failures,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "scan complete"
                        );

                        if scan.tx.receiver_count() == 0 {
                            let should_warn = last_no_receivers_warn
                                .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                            if should_warn {
                                tracing::debug!(
                                    operation = "broadcast_scan",
                                    "No active WebSocket clients; \
                                     broadcast channel has no receivers"
                                );
                                last_no_receivers_warn = Some(Instant::now());
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Worker shutting down");
                        break;
                    }
                    _ = stats_log_tick.tick() => {
                        tracing::info!(
                            ws_status_clients = ws_status_connections.load(Ordering::Relaxed),
                            samples_saved_total = samples_saved_total.load(Ordering::Relaxed),
                            storage_failures_total =
                                scan.storage_failures_total.load(Ordering::Relaxed),
                            scans_total = scans_total,
                            "app stats"
                        );
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn writer_clamps_backwards_timestamps_per_device() {
        let mut last = HashMap::new();
        let sample = |name: &str, t: &str, up: u64| UptimeSample::new(name, ts(t), up);
        let a = keep_non_decreasing(&mut last, sample("r1", "2024-10-27 02:30:00", 10));
        assert_eq!(a.timestamp, ts("2024-10-27 02:30:00"));
        let b = keep_non_decreasing(&mut last, sample("r1", "2024-10-27 02:00:00", 11));
        assert_eq!(b.timestamp, ts("2024-10-27 02:30:00"));
        // other devices are unaffected
        let c = keep_non_decreasing(&mut last, sample("r2", "2024-10-27 02:00:00", 5));
        assert_eq!(c.timestamp, ts("2024-10-27 02:00:00"));
    }
}
