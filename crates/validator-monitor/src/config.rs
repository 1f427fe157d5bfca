//! File-based monitor configuration.

use crate::error::ConfigError;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashSet,
    fs,
    path::Path,
    str::FromStr,
    time::Duration,
};
use tracing::warn;
use url::Url;

pub const DEFAULT_AVERAGE_INTERVAL_HOURS: f64 = 6.0;

fn default_average_interval_hours() -> f64 {
    DEFAULT_AVERAGE_INTERVAL_HOURS
}

/// Configuration loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Base URL of the node's RPC server, e.g. `http://127.0.0.1:26657`.
    pub rpc_url: String,
    /// Validator addresses to watch.
    #[serde(default)]
    pub validators: Vec<String>,
    /// Length of the drift comparison window.
    #[serde(default = "default_average_interval_hours")]
    pub average_interval_hours: f64,
    /// Incoming-webhook URL alerts are posted to.
    pub alert_webhook_url: String,
}

impl MonitorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| {
            ConfigError::Read {
                path: path.display().to_string(),
                source,
            }
        })?;
        contents.parse()
    }

    /// Replace the file's URLs with explicitly provided ones.
    pub fn with_overrides(
        mut self,
        rpc_url: Option<String>,
        alert_webhook_url: Option<String>,
    ) -> Self {
        if let Some(rpc_url) = rpc_url {
            self.rpc_url = rpc_url;
        }
        if let Some(alert_webhook_url) = alert_webhook_url {
            self.alert_webhook_url = alert_webhook_url;
        }
        self
    }

    /// Check URLs and the interval, and collapse duplicate validator
    /// addresses so each one is audited once.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        parse_http_url("rpc_url", &self.rpc_url)?;
        parse_http_url("alert_webhook_url", &self.alert_webhook_url)?;

        averaging_interval(self.average_interval_hours)?;

        let mut seen = HashSet::new();
        self.validators.retain(|address| {
            let address = address.trim();
            if address.is_empty() {
                warn!("ignoring empty validator address in configuration");
                return false;
            }
            if !seen.insert(address.to_string()) {
                warn!(address, "ignoring duplicate validator address in configuration");
                return false;
            }
            true
        });
        for address in &mut self.validators {
            *address = address.trim().to_string();
        }

        if self.validators.is_empty() {
            warn!("no validators configured; only node-level checks will run");
        }

        Ok(self)
    }

    pub fn rpc_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("rpc_url", &self.rpc_url)
    }

    pub fn alert_webhook_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("alert_webhook_url", &self.alert_webhook_url)
    }
}

impl FromStr for MonitorConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Convert `average_interval_hours` to a [`Duration`].
pub fn averaging_interval(hours: f64) -> Result<Duration, ConfigError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "average_interval_hours must be a positive number, got {hours}"
        )));
    }
    Duration::try_from_secs_f64(hours * 3600.0).map_err(|_| {
        ConfigError::Invalid(format!("average_interval_hours is too large, got {hours}"))
    })
}

fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("{field} is not a valid URL ({value}): {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => {
            Err(ConfigError::Invalid(format!(
                "{field} must use http or https, got {scheme}"
            )))
        }
    }
}
