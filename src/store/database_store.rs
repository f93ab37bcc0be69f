use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use uuid::Uuid;

use crate::error_handling::types::StoreError;
use crate::store::store_trait::TelemetryStore;
use crate::store::types::{Alert, ConfigRecord, MetricsSnapshot};

// Internal row mappings to avoid manual try_get
#[derive(Debug, sqlx::FromRow)]
struct MetricsRow {
    total_packets: i64,
    active_hosts: i64,
    connection_rate: f64,
    anomaly_count: i64,
    timestamp: String,
}

impl MetricsRow {
    fn into_snapshot(self) -> Result<MetricsSnapshot, StoreError> {
        Ok(MetricsSnapshot {
            total_packets: self.total_packets.max(0) as u64,
            active_hosts: self.active_hosts.max(0) as u64,
            connection_rate: self.connection_rate,
            anomaly_count: self.anomaly_count.max(0) as u64,
            timestamp: parse_timestamp(&self.timestamp)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: String,
    alert_type: String,
    severity: String,
    source_ip: String,
    description: Option<String>,
    is_resolved: i64,
    timestamp: String,
}

impl AlertRow {
    fn into_alert(self) -> Result<Alert, StoreError> {
        Ok(Alert {
            id: parse_uuid(&self.id)?,
            alert_type: self.alert_type,
            severity: self.severity,
            source_ip: self.source_ip,
            description: self.description,
            is_resolved: self.is_resolved != 0,
            timestamp: parse_timestamp(&self.timestamp)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConfigRow {
    id: String,
    traffic_threshold: i64,
    connection_rate: i64,
    protocol_blacklist: String,
}

impl ConfigRow {
    fn into_record(self) -> Result<ConfigRecord, StoreError> {
        Ok(ConfigRecord {
            id: Some(parse_uuid(&self.id)?),
            traffic_threshold: self.traffic_threshold,
            connection_rate: self.connection_rate,
            protocol_blacklist: self.protocol_blacklist,
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::ReadFailed(format!("bad uuid {}: {}", raw, e)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::ReadFailed(format!("bad timestamp {}: {}", raw, e)))
}

/// SQLite-backed telemetry store.
///
/// The capture pipeline writes `network_metrics` and `network_alerts`;
/// this process only reads them. `network_configs` is read-write, one
/// record per owner.
pub struct DatabaseStore {
    pool: Pool<Sqlite>,
}

impl DatabaseStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        }
        let opts = SqliteConnectOptions::from_str("sqlite://")
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            .filename(path_ref)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::create_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an already-connected pool. Used when the auth provider and the
    /// store share one database file.
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        Self::create_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying pool, for subsystems sharing this database file.
    pub fn pool(&self) -> Pool<Sqlite> {
        self.pool.clone()
    }

    async fn create_schema(pool: &Pool<Sqlite>) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS network_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                total_packets INTEGER NOT NULL,
                active_hosts INTEGER NOT NULL,
                connection_rate REAL NOT NULL,
                anomaly_count INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS network_alerts (
                id TEXT PRIMARY KEY,
                alert_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                source_ip TEXT NOT NULL,
                description TEXT,
                is_resolved INTEGER NOT NULL DEFAULT 0,
                timestamp TEXT NOT NULL
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS network_configs (
                id TEXT PRIMARY KEY,
                traffic_threshold INTEGER NOT NULL,
                connection_rate INTEGER NOT NULL,
                protocol_blacklist TEXT NOT NULL,
                user_id TEXT NOT NULL
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for DatabaseStore {
    async fn latest_metrics(&self) -> Result<Option<MetricsSnapshot>, StoreError> {
        let row: Option<MetricsRow> = sqlx::query_as(
            "SELECT total_packets, active_hosts, connection_rate, anomaly_count, timestamp
             FROM network_metrics ORDER BY timestamp DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        row.map(MetricsRow::into_snapshot).transpose()
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        let rows: Vec<AlertRow> = sqlx::query_as(
            "SELECT id, alert_type, severity, source_ip, description, is_resolved, timestamp
             FROM network_alerts ORDER BY timestamp DESC LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.into_alert()?);
        }
        Ok(out)
    }

    async fn load_config(&self, owner: Uuid) -> Result<Option<ConfigRecord>, StoreError> {
        let row: Option<ConfigRow> = sqlx::query_as(
            "SELECT id, traffic_threshold, connection_rate, protocol_blacklist
             FROM network_configs WHERE user_id = ?1 LIMIT 1",
        )
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        row.map(ConfigRow::into_record).transpose()
    }

    async fn insert_config(
        &self,
        record: &ConfigRecord,
        owner: Uuid,
    ) -> Result<ConfigRecord, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO network_configs (id, traffic_threshold, connection_rate, protocol_blacklist, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id.to_string())
        .bind(record.traffic_threshold)
        .bind(record.connection_rate)
        .bind(&record.protocol_blacklist)
        .bind(owner.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(ConfigRecord {
            id: Some(id),
            ..record.clone()
        })
    }

    async fn update_config(&self, id: Uuid, record: &ConfigRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE network_configs
             SET traffic_threshold = ?1, connection_rate = ?2, protocol_blacklist = ?3
             WHERE id = ?4",
        )
        .bind(record.traffic_threshold)
        .bind(record.connection_rate)
        .bind(&record.protocol_blacklist)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::WriteFailed(format!(
                "no configuration record with id {}",
                id
            )));
        }
        Ok(())
    }
}
