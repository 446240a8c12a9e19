use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TuyaError};

mod status;
pub use status::DeviceStatus;

/// Status of one device as returned by a single poll.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceData {
    pub id: String,
    pub name: String,
    pub status: Vec<DeviceStatus>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Vec<DeviceStatus>,
}

impl std::fmt::Display for DeviceData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id={:?} name={:?}", self.id, self.name)?;
        for (code, status) in self.status_map() {
            write!(f, " {}={}", code, status.value_string())?;
        }
        Ok(())
    }
}

impl DeviceData {
    /// Converts the `result` array of `v1.0/users/{uid}/devices`. All records
    /// get the same `time`.
    pub fn list_from_json(result: Value, time: DateTime<Utc>) -> Result<Vec<DeviceData>> {
        let devices: Vec<RawDevice> = serde_json::from_value(result)
            .map_err(|err| TuyaError::Parse(format!("cannot parse device list: {err}")))?;
        Ok(devices
            .into_iter()
            .map(|RawDevice { id, name, status }| DeviceData {
                id,
                name,
                status,
                time,
            })
            .collect())
    }

    /// Status values keyed and sorted by code. A later duplicate code wins.
    pub fn status_map(&self) -> BTreeMap<&str, &DeviceStatus> {
        self.status
            .iter()
            .map(|status| (status.code.as_str(), status))
            .collect()
    }

    pub fn find_status(&self, code: &str) -> Option<&DeviceStatus> {
        self.status.iter().rev().find(|status| status.code == code)
    }

    /// Sorted status codes, the column order of exported data.
    pub fn status_codes(&self) -> Vec<&str> {
        self.status_map().into_keys().collect()
    }
}

/// Finds the device with `id` in a poll result.
pub fn find_device<'a>(devices: &'a [DeviceData], id: &str) -> Option<&'a DeviceData> {
    devices.iter().find(|device| device.id == id)
}
