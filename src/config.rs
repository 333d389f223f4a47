//! Connection configuration.

use crate::catalog::Catalog;
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`SimConnection`](crate::SimConnection).
///
/// Durations are written in milliseconds in JSON:
/// ```json
/// { "client_name": "panel", "poll_interval_ms": 20, "catalog_path": "vars.json" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Name the engine shows for this client.
    pub client_name: String,

    /// Sleep between empty polls while waiting with a timeout.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    /// Timeout of one-off reads when the caller gives none.
    #[serde(rename = "snapshot_timeout_ms", with = "millis")]
    pub snapshot_timeout: Duration,

    /// Change epsilon for float64 variables declared without one.
    pub default_epsilon: f32,

    /// Catalog to load instead of the built-in one.
    pub catalog_path: Option<PathBuf>,

    /// Install the receivers that log `Open`, `Exception` and `Quit` records.
    pub default_receivers: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            client_name: "simlink".to_string(),
            poll_interval: Duration::from_millis(50),
            snapshot_timeout: Duration::from_secs(1),
            default_epsilon: 1e-4,
            catalog_path: None,
            default_receivers: true,
        }
    }
}

impl ConnectionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| SimError::Config(format!("{}: {}", path.display(), e)))
    }

    /// The configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::from_json_file(path),
            None => Catalog::builtin(),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
