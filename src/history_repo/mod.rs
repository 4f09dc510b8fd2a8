// SQLite uptime history. Insert-only: one row per successful uptime poll.
// Timestamps are stored as local wall-clock text (YYYY-MM-DD HH:MM:SS),
// which sorts chronologically as text.

pub mod timeline;

use crate::models::{TIMESTAMP_FORMAT, TimelinePoint, UptimeSample};
use chrono::NaiveDateTime;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct HistoryRepo {
    pool: SqlitePool,
}

impl HistoryRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS uptime (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_name TEXT NOT NULL,
                uptime_seconds INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_uptime_device_timestamp \
             ON uptime(device_name, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(
        skip(self, sample),
        fields(repo = "history", operation = "append_uptime", device = %sample.device_name)
    )]
    pub async fn append_uptime(&self, sample: &UptimeSample) -> anyhow::Result<()> {
        let uptime = i64::try_from(sample.uptime_seconds).map_err(|_| {
            anyhow::anyhow!("uptime_seconds out of range: {}", sample.uptime_seconds)
        })?;
        sqlx::query(
            "INSERT INTO uptime (device_name, uptime_seconds, timestamp) VALUES ($1, $2, $3)",
        )
        .bind(&sample.device_name)
        .bind(uptime)
        .bind(sample.timestamp.format(TIMESTAMP_FORMAT).to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Full history for one device, newest first.
    #[instrument(skip(self), fields(repo = "history", operation = "query_history"))]
    pub async fn query_history(&self, device_name: &str) -> anyhow::Result<Vec<UptimeSample>> {
        let rows = sqlx::query(
            "SELECT device_name, uptime_seconds, timestamp FROM uptime
             WHERE device_name = $1 ORDER BY timestamp DESC, id DESC",
        )
        .bind(device_name)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(sample) = Self::parse_sample_row(&row)? {
                out.push(sample);
            }
        }
        Ok(out)
    }

    /// Downsampled status timeline for one device (see [`timeline::aggregate_samples`]).
    #[instrument(skip(self), fields(repo = "history", operation = "get_timeline"))]
    pub async fn get_timeline(&self, device_name: &str) -> anyhow::Result<Vec<TimelinePoint>> {
        let history = self.query_history(device_name).await?;
        Ok(timeline::aggregate_samples(&history))
    }

    pub async fn sample_count(&self, device_name: &str) -> anyhow::Result<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM uptime WHERE device_name = $1")
            .bind(device_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    /// None for rows this code did not write (bad timestamp text, negative uptime).
    fn parse_sample_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Option<UptimeSample>> {
        let device_name: String = row.try_get("device_name")?;
        let uptime_seconds: i64 = row.try_get("uptime_seconds")?;
        let timestamp: String = row.try_get("timestamp")?;

        let Ok(ts) = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT) else {
            tracing::warn!(
                device = %device_name,
                timestamp = %timestamp,
                "skipping uptime row with malformed timestamp"
            );
            return Ok(None);
        };
        let Ok(uptime_seconds) = u64::try_from(uptime_seconds) else {
            tracing::warn!(
                device = %device_name,
                uptime_seconds,
                "skipping uptime row with negative uptime"
            );
            return Ok(None);
        };
        Ok(Some(UptimeSample {
            device_name,
            timestamp: ts,
            uptime_seconds,
        }))
    }
}
