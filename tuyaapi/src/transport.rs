use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::Result;
use crate::signer::Headers;

/// Central Europe data center.
pub const DEFAULT_ENDPOINT: &str = "https://openapi.tuyaeu.com";

/// Status code and undecoded body of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status_code: u16,
    pub body: Vec<u8>,
}

/// Performs a single HTTP GET. No retries, no body.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, headers: &Headers) -> Result<RawResponse>;
}

/// [`Transport`] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Without a timeout a hung request blocks its caller indefinitely.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, headers: &Headers) -> Result<RawResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        let response = request.send()?;
        let status = response.status();
        debug!(
            "[tuya api] GET {} status: {:?} {:?}",
            response.url().path(),
            status,
            status.canonical_reason().unwrap_or_default()
        );

        Ok(RawResponse {
            status_code: status.as_u16(),
            body: response.bytes()?.to_vec(),
        })
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
