use std::{io::Read, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tuyaapi::{Credentials, DEFAULT_ENDPOINT};

use crate::{Error, Result};

/// Contents of `config.json`:
///
/// ```json
/// {
///   "apiKey": "...",
///   "secretKey": "...",
///   "period_ms": 60000,
///   "devices_config": [{"device_id": "bf01...", "param_name": "cur_power"}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
    /// Any JSON number, `60000` and `60000.0` are the same period.
    pub period_ms: f64,
    #[serde(default)]
    pub devices_config: Vec<DeviceConfig>,
    /// Device used to look up the user id, defaults to the first configured device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub plot: PlotConfig,
}

/// A device status code to chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: String,
    pub param_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub y_min: f64,
    pub y_max: f64,
    pub width: usize,
    pub height: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            y_min: 50.0,
            y_max: 600.0,
            width: 72,
            height: 20,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Config {
    /// Reads yaml for `.yaml` / `.yml` files, json otherwise.
    pub fn from_file(p: impl AsRef<Path>) -> Result<Self> {
        let p = p.as_ref();
        let f = std::fs::File::open(p)?;
        match p.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(f),
            _ => Self::from_json(f),
        }
    }

    pub fn from_json(json_reader: impl Read) -> Result<Self> {
        let config: Config = serde_json::from_reader(json_reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml_reader: impl Read) -> Result<Self> {
        let config: Config = serde_yaml::from_reader(yaml_reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_string(s: impl ToString) -> Result<Self> {
        Config::from_json(s.to_string().as_bytes())
    }

    pub fn validate(&self) -> Result<()> {
        let period = Duration::try_from_secs_f64(self.period_ms / 1000.0);
        if !(self.period_ms > 0.0) || period.is_err() {
            return Err(Error::InvalidConfig(format!(
                "period_ms must be a positive number of milliseconds, got {}",
                self.period_ms
            )));
        }
        if self.uid_device_id().is_none() {
            return Err(Error::InvalidConfig(
                "need `device_id` or at least one entry in `devices_config`".to_string(),
            ));
        }
        if self.plot.y_min >= self.plot.y_max {
            return Err(Error::InvalidConfig(format!(
                "plot.y_min ({}) must be below plot.y_max ({})",
                self.plot.y_min, self.plot.y_max
            )));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(self.period_ms / 1000.0).unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn uid_device_id(&self) -> Option<&str> {
        self.device_id
            .as_deref()
            .or_else(|| self.devices_config.first().map(|d| d.device_id.as_str()))
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.api_key, &self.secret_key)
    }

    /// Replaces the credentials from the file with those given on the command
    /// line or in the environment.
    pub fn override_credentials(&mut self, api_key: Option<String>, secret_key: Option<String>) {
        if let Some(api_key) = api_key {
            self.api_key = api_key;
        }
        if let Some(secret_key) = secret_key {
            self.secret_key = secret_key;
        }
    }

    /// True if a requestor built from `other` would differ from one built from `self`.
    pub fn connection_changed(&self, other: &Config) -> bool {
        self.api_key != other.api_key
            || self.secret_key != other.secret_key
            || self.endpoint != other.endpoint
            || self.request_timeout_ms != other.request_timeout_ms
    }
}
