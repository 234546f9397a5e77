//! Startup configuration
//!
//! Loaded once from a JSON file before any transport is opened; a missing
//! or malformed file is startup-fatal.

use std::fs;
use std::path::Path;
use std::time::Duration;

use mux_protocol::BusAddress;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Names of the per-device attributes exposed in the mirror
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeNames {
    /// Read-only mirror of the active channel
    #[serde(default = "default_channel_attr")]
    pub channel: String,
    /// Read-only mirror of the last operation status
    #[serde(default = "default_status_attr")]
    pub status: String,
    /// Writable channel-change trigger
    #[serde(default = "default_set_channel_attr")]
    pub set_channel: String,
    /// Writable reset trigger
    #[serde(default = "default_reset_attr")]
    pub reset: String,
}

fn default_channel_attr() -> String {
    "ActiveChannel".to_string()
}

fn default_status_attr() -> String {
    "LastOperationStatus".to_string()
}

fn default_set_channel_attr() -> String {
    "SetChannel".to_string()
}

fn default_reset_attr() -> String {
    "Reset".to_string()
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            channel: default_channel_attr(),
            status: default_status_attr(),
            set_channel: default_set_channel_attr(),
            reset: default_reset_attr(),
        }
    }
}

/// Gateway configuration, read-only after startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Connection endpoint of the attribute server
    pub endpoint: String,
    /// Namespace identifier registered on the server
    pub namespace_uri: String,
    /// Name of the root gateway object
    #[serde(default = "default_gateway_object")]
    pub gateway_object: String,
    /// Prefix for per-device object names
    #[serde(default = "default_mux_prefix")]
    pub mux_prefix: String,
    /// Per-device attribute names
    #[serde(default)]
    pub attributes: AttributeNames,
    /// Reconnection monitor period in seconds
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
}

fn default_gateway_object() -> String {
    "MuxGateway".to_string()
}

fn default_mux_prefix() -> String {
    "Mux_".to_string()
}

fn default_monitor_interval_secs() -> u64 {
    5
}

impl GatewayConfig {
    /// Load and validate the configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(endpoint = %config.endpoint, namespace = %config.namespace_uri, "configuration loaded");
        Ok(config)
    }

    /// The mirror object name for a device address, e.g. `Mux_0x20`
    pub fn object_name(&self, address: BusAddress) -> String {
        format!("{}{:#x}", self.mux_prefix, address)
    }

    /// Reconnection monitor period
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}
