use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::api::{self, Endpoint};
use crate::devices::DeviceData;
use crate::error::{Result, TuyaError};
use crate::response::{parse_response, ApiResponse};
use crate::signer::{self, Credentials, Headers, SignedRequest, SIGNATURE_HEADERS, SIGN_METHOD};
use crate::token::{AccessToken, TokenStore};
use crate::transport::{HttpTransport, Transport, DEFAULT_ENDPOINT};

/// The main interface to the Tuya OpenAPI. Signs every request, caches the
/// access token and re-authenticates once when a request is rejected.
pub struct Requestor<T = HttpTransport> {
    credentials: Credentials,
    endpoint: String,
    transport: T,
    tokens: Mutex<TokenStore>,
}

impl Requestor<HttpTransport> {
    /// Client for the central Europe data center.
    pub fn new(api_key: impl ToString, api_secret: impl ToString) -> Result<Self> {
        Ok(Self::with_transport(
            Credentials::new(api_key, api_secret),
            DEFAULT_ENDPOINT,
            HttpTransport::new()?,
        ))
    }

    pub fn with_endpoint(
        credentials: Credentials,
        endpoint: impl ToString,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        Ok(Self::with_transport(
            credentials,
            endpoint,
            HttpTransport::with_timeout(timeout)?,
        ))
    }
}

impl<T: Transport> Requestor<T> {
    pub fn with_transport(credentials: Credentials, endpoint: impl ToString, transport: T) -> Self {
        Self {
            credentials,
            endpoint: endpoint.to_string(),
            transport,
            tokens: Mutex::new(TokenStore::new()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Signed GET of `uri` (relative to the host, e.g. `v1.0/devices/{id}`).
    ///
    /// A response with `success == false` is returned as `Ok`. Errors are
    /// transport and parse faults and a rejected token request.
    pub fn request(
        &self,
        uri: &str,
        body: Option<&[u8]>,
        headers: Option<&Headers>,
    ) -> Result<ApiResponse> {
        // held for the whole sequence so concurrent callers never refresh twice
        let mut tokens = self.lock_tokens();
        self.request_with_reauth(&mut tokens, uri, body, headers)
    }

    /// Returns the `uid` of the user owning `device_id`.
    pub fn device_uid(&self, device_id: &str) -> Result<String> {
        let uri = Endpoint::Device { device_id }.uri();
        let result = self.request(&uri, None, None)?.into_result()?;
        result["uid"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| TuyaError::Parse(format!("no uid in device response: {result}")))
    }

    /// Lists all devices of user `uid` with their current status.
    pub fn user_devices(&self, uid: &str) -> Result<Vec<DeviceData>> {
        let uri = Endpoint::UserDevices { uid }.uri();
        let result = self.request(&uri, None, None)?.into_result()?;
        DeviceData::list_from_json(result, Utc::now())
    }

    // -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

    fn lock_tokens(&self) -> MutexGuard<'_, TokenStore> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached token first. If there is none or the call is rejected, fetch a
    /// new token and try exactly once more.
    fn request_with_reauth(
        &self,
        tokens: &mut TokenStore,
        uri: &str,
        body: Option<&[u8]>,
        headers: Option<&Headers>,
    ) -> Result<ApiResponse> {
        if let Some(token) = tokens.get().cloned() {
            let response = self.signed_get(uri, Some(&token), body, headers)?;
            if response.success {
                return Ok(response);
            }
            info!(
                "[tuya api] {} rejected (code {:?}: {:?}), refreshing token",
                uri, response.code, response.msg
            );
            tokens.clear();
        }

        let token = tokens.replace(self.get_token()?);
        self.signed_get(uri, Some(&token), body, headers)
    }

    fn get_token(&self) -> Result<AccessToken> {
        let response = self.signed_get(&Endpoint::Token.uri(), None, None, None)?;
        if !response.success {
            return Err(TuyaError::Authentication(response));
        }
        let token = response.result["access_token"]
            .as_str()
            .map(AccessToken::new)
            .ok_or_else(|| TuyaError::Parse("token response has no access_token".to_string()))?;
        info!("[tuya api] obtained new access token");
        Ok(token)
    }

    fn signed_get(
        &self,
        uri: &str,
        token: Option<&AccessToken>,
        body: Option<&[u8]>,
        headers: Option<&Headers>,
    ) -> Result<ApiResponse> {
        let timestamp = Utc::now().timestamp_millis();
        let token = token.map(AccessToken::value);

        let mut signing_headers = Headers::new();
        if let Some(headers) = headers {
            for (name, value) in headers.iter().filter(|(name, _)| *name != SIGNATURE_HEADERS) {
                signing_headers.insert(name, value);
            }
        }
        if !signing_headers.is_empty() {
            let names = signing_headers.names().collect::<Vec<_>>().join(":");
            signing_headers.insert(SIGNATURE_HEADERS, names);
        }
        if token.is_none() {
            signing_headers.insert("secret", self.credentials.api_secret());
        }

        let request = SignedRequest {
            uri: uri.to_string(),
            headers: signing_headers,
            body,
            timestamp,
        };
        let signature = signer::sign(&self.credentials, token, &request);

        let mut headers = request.headers;
        headers.insert("client_id", self.credentials.api_key());
        headers.insert("sign", signature);
        headers.insert("t", timestamp);
        headers.insert("sign_method", SIGN_METHOD);
        if let Some(token) = token {
            headers.insert("access_token", token);
        }

        let raw = self.transport.get(&api::url(&self.endpoint, uri), &headers)?;
        let response = parse_response(raw.status_code, &raw.body)?;
        debug!(
            "[tuya api] {} status: {} success: {}",
            uri, response.status_code, response.success
        );
        Ok(response)
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
