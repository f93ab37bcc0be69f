use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error_handling::types::ConfigError;

/// Application configuration that defines all runtime parameters.
///
/// Loaded from a TOML file named on the command line; every field has a
/// default, so an empty file is a valid configuration.
///
/// # Fields Overview
///
/// - `bind_address`: IP address the dashboard binds to
/// - `web_ui_port`: port on which to expose the dashboard
/// - `database_path`: SQLite file shared with the capture pipeline
/// - `poll_interval_secs`: seconds between snapshot fetches
/// - `alert_window`: how many recent alerts one snapshot holds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub web_ui_port: u16,
    pub database_path: PathBuf,
    pub poll_interval_secs: u64,
    pub alert_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: String::from("127.0.0.1"),
            web_ui_port: 8080,
            database_path: PathBuf::from("securenet.sqlite3"),
            poll_interval_secs: 5,
            alert_window: 20,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::BadAddress(self.bind_address.clone()))?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "poll_interval_secs must be at least 1",
            )));
        }
        if self.alert_window == 0 || self.alert_window > 100 {
            return Err(ConfigError::NotInRange(String::from(
                "alert_window must be between 1 and 100",
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        // validate() already proved the address parses
        let ip: IpAddr = self.bind_address.parse().unwrap_or(IpAddr::from([127, 0, 0, 1]));
        SocketAddr::new(ip, self.web_ui_port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
