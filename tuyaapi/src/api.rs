/// The OpenAPI endpoints the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Endpoint<'a> {
    Token,
    Device { device_id: &'a str },
    UserDevices { uid: &'a str },
}

impl Endpoint<'_> {
    /// Request uri relative to the host.
    pub(crate) fn uri(&self) -> String {
        use Endpoint::*;
        match self {
            Token => "v1.0/token?grant_type=1".to_string(),
            Device { device_id } => format!("v1.0/devices/{}", device_id),
            UserDevices { uid } => format!("v1.0/users/{}/devices", uid),
        }
    }
}

/// Joins the base url of a data center and a request uri.
pub(crate) fn url(endpoint: &str, uri: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        uri.trim_start_matches('/')
    )
}
