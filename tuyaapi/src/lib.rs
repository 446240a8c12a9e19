//! Client for the Tuya cloud OpenAPI
//! <https://developer.tuya.com/en/docs/iot/api-request?id=Ka4a8uuo1j4t4>.
//!
//! Every request is signed with HMAC-SHA256. The access token is fetched on
//! first use, cached, and refreshed once when the API rejects a request.
//!
//! It is used by the `tuya-collector` utility.
//!
//! ## Example
//!
//! ```ignore
//! let requestor = tuyaapi::Requestor::new(&api_key, &api_secret)?;
//!
//! // The user owning a known device
//! let uid = requestor.device_uid("bf0123456789abcdef")?;
//!
//! // Status of all of that user's devices
//! for device in requestor.user_devices(&uid)? {
//!     println!("{}", device);
//! }
//!
//! // Any other signed GET request
//! let response = requestor.request("v1.0/devices/bf0123456789abcdef/logs", None, None)?;
//! ```

pub(crate) mod api;
pub mod devices;
pub mod error;
pub mod requestor;
pub mod response;
pub mod signer;
pub mod token;
pub mod transport;

pub use devices::{find_device, DeviceData, DeviceStatus};
pub use error::{Result, TuyaError};
pub use requestor::Requestor;
pub use response::ApiResponse;
pub use signer::{sign, Credentials, Headers, SignedRequest};
pub use token::{AccessToken, TokenStore};
pub use transport::{HttpTransport, RawResponse, Transport, DEFAULT_ENDPOINT};
