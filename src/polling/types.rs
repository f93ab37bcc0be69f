use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::types::{Alert, ConfigRecord, MetricsSnapshot};

/// The combined result of one poll tick, published to the view.
///
/// Slices that fail to fetch keep their previous (stale) value; `loading`
/// is true only until the first tick has landed.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub metrics: Option<MetricsSnapshot>,
    pub alerts: Vec<Alert>,
    pub config: Option<ConfigRecord>,
    pub loading: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            metrics: None,
            alerts: Vec::new(),
            config: None,
            loading: true,
            refreshed_at: None,
        }
    }
}
