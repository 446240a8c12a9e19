use crate::response::ApiResponse;

#[derive(thiserror::Error, Debug)]
pub enum TuyaError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cannot parse response: `{0}`")]
    Parse(String),

    #[error("token request rejected: `{}`", .0.raw)]
    Authentication(ApiResponse),

    #[error("API request failed: `{}`", .0.raw)]
    Api(ApiResponse),
}

pub type Result<T> = std::result::Result<T, TuyaError>;
