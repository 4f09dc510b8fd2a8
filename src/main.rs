use anyhow::Result;
use routerwatch::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        devices = app_config.devices.len(),
        scan_interval_secs = app_config.monitoring.scan_interval_secs,
        "{} {} starting",
        version::NAME,
        version::VERSION
    );

    let (status_tx, _) =
        broadcast::channel::<models::DeviceScan>(app_config.publishing.broadcast_capacity);

    let history_repo = Arc::new(
        history_repo::HistoryRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    history_repo.init().await?;

    let snmp_repo = Arc::new(snmp_repo::SnmpRepo::new(&app_config.snmp));
    let devices = Arc::new(app_config.devices.clone());
    let board = Arc::new(status_board::StatusBoard::new(&devices));

    let ws_status_connections = Arc::new(AtomicUsize::new(0));
    let samples_saved_total = Arc::new(AtomicU64::new(0));
    let storage_failures_total = Arc::new(AtomicU64::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let (write_tx, write_rx) = mpsc::channel(worker::writer_channel_capacity(devices.len()));
    let writer_handle = worker::spawn_history_writer(
        write_rx,
        history_repo.clone(),
        samples_saved_total.clone(),
    );

    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            scan: worker::ScanDeps {
                snmp_repo: snmp_repo.clone(),
                devices,
                board: board.clone(),
                tx: status_tx.clone(),
                write_tx,
                storage_failures_total,
            },
            ws_status_connections: ws_status_connections.clone(),
            samples_saved_total,
            shutdown_rx,
        },
        worker::WorkerConfig {
            scan_interval_secs: app_config.monitoring.scan_interval_secs,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
        },
    );

    let app = routes::app(
        status_tx,
        board,
        history_repo,
        snmp_repo,
        ws_status_connections,
        app_config.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{SignalKind, signal};
                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = worker_handle.await;
            // Worker owned the last write sender; the writer drains and exits.
            let _ = writer_handle.await;
        }
    }

    Ok(())
}
