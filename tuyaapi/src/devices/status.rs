use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One data point of a device, e.g. `{"code": "cur_power", "value": 1250}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub code: String,
    pub value: Value,
}

impl DeviceStatus {
    pub fn new(code: impl ToString, value: impl Into<Value>) -> Self {
        Self {
            code: code.to_string(),
            value: value.into(),
        }
    }

    /// The value as a number. Numeric strings are accepted, booleans map to 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Plain text rendering: strings unquoted, everything else as compact JSON.
    pub fn value_string(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_values() {
        assert_eq!(DeviceStatus::new("cur_power", 1250).as_f64(), Some(1250.0));
        assert_eq!(DeviceStatus::new("temp", " 21.5").as_f64(), Some(21.5));
        assert_eq!(DeviceStatus::new("switch_1", true).as_f64(), Some(1.0));
        assert_eq!(DeviceStatus::new("mode", "eco").as_f64(), None);
    }

    #[test]
    fn value_strings() {
        assert_eq!(DeviceStatus::new("mode", "eco").value_string(), "eco");
        assert_eq!(DeviceStatus::new("switch_1", false).value_string(), "false");
        assert_eq!(DeviceStatus::new("cur_voltage", 2301).value_string(), "2301");
        assert_eq!(
            DeviceStatus::new("colour", json!({"h": 1})).value_string(),
            r#"{"h":1}"#
        );
    }
}
