use bridge_traits::{http::HttpMethod, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Unsupported method: {0:?}")]
    UnsupportedMethod(HttpMethod),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Redirect response missing a location header")]
    MissingRedirectLocation,

    #[error("Malformed API response: {0}")]
    Parse(String),

    #[error("Pipe write failed: {0}")]
    Pipe(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
