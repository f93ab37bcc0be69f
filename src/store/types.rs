use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of aggregate traffic counters written by the capture pipeline.
///
/// The dashboard only ever shows the most recent row; each poll replaces
/// the previous snapshot wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_packets: u64,
    pub active_hosts: u64,
    pub connection_rate: f64,
    pub anomaly_count: u64,
    pub timestamp: DateTime<Utc>,
}

/// An anomaly alert row. Written by the capture pipeline, read-only here.
///
/// `severity` stays a free-form label: the rows originate outside this
/// process and an unknown label must render (as the low tier), not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: String,
    pub severity: String,
    pub source_ip: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub timestamp: DateTime<Utc>,
}

/// Detection thresholds for the capture pipeline, one record per owner.
///
/// `id` is absent until the first save; the first save inserts, later
/// saves update in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub id: Option<Uuid>,
    pub traffic_threshold: i64,
    pub connection_rate: i64,
    pub protocol_blacklist: String,
}

impl ConfigRecord {
    /// Advisory form bounds. The store is the final authority on ranges;
    /// these only drive the min/step attributes of the edit form.
    pub const TRAFFIC_THRESHOLD_MIN: i64 = 100;
    pub const TRAFFIC_THRESHOLD_STEP: i64 = 100;
    pub const CONNECTION_RATE_MIN: i64 = 10;
    pub const CONNECTION_RATE_STEP: i64 = 10;
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            id: None,
            traffic_threshold: 1000,
            connection_rate: 100,
            protocol_blacklist: String::from("ICMP,IGMP"),
        }
    }
}
