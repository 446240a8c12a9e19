use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TuyaError};

/// Key under which the HTTP status code is added to the raw response object.
pub const STATUS_CODE_KEY: &str = "_status_code";

/// Parsed envelope of a Tuya OpenAPI response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub success: bool,
    pub result: Value,
    pub status_code: u16,
    /// Provider error code, only present on failures.
    pub code: Option<i64>,
    pub msg: Option<String>,
    /// Server time in epoch millis.
    pub t: Option<i64>,
    /// The complete response object including `_status_code`.
    pub raw: Value,
}

impl ApiResponse {
    pub fn from_json(mut raw: Value, status_code: u16) -> Result<Self> {
        let kind = raw_kind(&raw);
        let object = raw
            .as_object_mut()
            .ok_or_else(|| TuyaError::Parse(format!("expected a JSON object, got `{kind}`")))?;
        object.insert(STATUS_CODE_KEY.to_string(), Value::from(status_code));

        Ok(Self {
            success: raw["success"].as_bool().unwrap_or(false),
            result: raw["result"].clone(),
            status_code,
            code: raw["code"].as_i64(),
            msg: raw["msg"].as_str().map(ToString::to_string),
            t: raw["t"].as_i64(),
            raw,
        })
    }

    /// `Ok(result)` on success, [`TuyaError::Api`] with the whole response otherwise.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            Ok(self.result)
        } else {
            Err(TuyaError::Api(self))
        }
    }
}

fn raw_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Parses a raw HTTP body into an [`ApiResponse`].
pub fn parse_response(status_code: u16, body: &[u8]) -> Result<ApiResponse> {
    let raw = decode_json(body)?;
    ApiResponse::from_json(raw, status_code)
}

/// Strict UTF-8 first. If that fails there is exactly one more attempt that
/// detects the byte encoding (UTF-8 BOM, UTF-16 LE/BE) before parsing.
fn decode_json(body: &[u8]) -> Result<Value> {
    let first_attempt: std::result::Result<Value, String> = std::str::from_utf8(body)
        .map_err(|err| err.to_string())
        .and_then(|text| serde_json::from_str(text).map_err(|err| err.to_string()));

    let err = match first_attempt {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    debug!("[tuya api] response is not plain utf-8 json ({err}), trying byte decoding");
    match decode_bytes(body) {
        Some(text) => serde_json::from_str(&text).map_err(|second| {
            TuyaError::Parse(format!("failed to get valid JSON response: {second}"))
        }),
        None => Err(TuyaError::Parse(format!(
            "failed to get valid JSON response: {err}"
        ))),
    }
}

fn decode_bytes(body: &[u8]) -> Option<String> {
    match body {
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8(rest.to_vec()).ok(),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0, b, ..] if *b != 0 => decode_utf16(body, u16::from_be_bytes),
        [a, 0, ..] if *a != 0 => decode_utf16(body, u16::from_le_bytes),
        _ => None,
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
