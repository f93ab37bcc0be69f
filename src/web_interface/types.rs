use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::classifier::{classify, display_type, SeverityTier};
use crate::config_editor::editor::Notice;
use crate::store::types::{Alert, ConfigRecord, MetricsSnapshot};

/// API error payload
#[derive(Serialize)]
pub struct ApiError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionStateResponse {
    pub resolved: bool,
    pub authenticated: bool,
    pub email: Option<String>,
}

/// One alert row annotated for display.
#[derive(Debug, Serialize)]
pub struct AlertView {
    pub id: Uuid,
    pub alert_type: String,
    pub severity: String,
    pub tier: SeverityTier,
    pub icon: &'static str,
    pub css_class: &'static str,
    pub badge: &'static str,
    pub source_ip: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub timestamp: DateTime<Utc>,
}

impl AlertView {
    pub fn from_alert(alert: Alert) -> Self {
        let appearance = classify(&alert.severity);
        Self {
            id: alert.id,
            alert_type: display_type(&alert.alert_type),
            severity: alert.severity,
            tier: appearance.tier,
            icon: appearance.icon,
            css_class: appearance.css_class,
            badge: appearance.badge,
            source_ip: alert.source_ip,
            description: alert.description,
            is_resolved: alert.is_resolved,
            timestamp: alert.timestamp,
        }
    }
}

#[derive(Serialize)]
pub struct SnapshotResponse {
    pub metrics: Option<MetricsSnapshot>,
    pub alerts: Vec<AlertView>,
    pub alerts_summary: String,
    pub loading: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// The summary line under the alert list.
pub fn alerts_summary(count: usize, loading: bool) -> String {
    if loading {
        String::from("Loading alerts...")
    } else if count == 0 {
        String::from("No Alerts. Your network is operating normally.")
    } else {
        format!("Showing {} recent alerts", count)
    }
}

/// Raw form values as submitted; integer parsing happens in the editor.
#[derive(Debug, Deserialize)]
pub struct ConfigForm {
    pub traffic_threshold: String,
    pub connection_rate: String,
    pub protocol_blacklist: String,
}

#[derive(Serialize)]
pub struct FormBounds {
    pub traffic_threshold_min: i64,
    pub traffic_threshold_step: i64,
    pub connection_rate_min: i64,
    pub connection_rate_step: i64,
}

impl Default for FormBounds {
    fn default() -> Self {
        Self {
            traffic_threshold_min: ConfigRecord::TRAFFIC_THRESHOLD_MIN,
            traffic_threshold_step: ConfigRecord::TRAFFIC_THRESHOLD_STEP,
            connection_rate_min: ConfigRecord::CONNECTION_RATE_MIN,
            connection_rate_step: ConfigRecord::CONNECTION_RATE_STEP,
        }
    }
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub draft: ConfigRecord,
    pub dirty: bool,
    pub notice: Option<Notice>,
    pub bounds: FormBounds,
}
