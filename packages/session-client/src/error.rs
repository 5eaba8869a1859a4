use thiserror::Error;

/// Failures while decoding a token payload locally.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is not a three-part compact JWT")]
    Malformed,
    #[error("token payload is not valid base64url")]
    InvalidBase64,
    #[error("token payload is not a valid claim set")]
    InvalidClaims,
}

/// Failures talking to the auth API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server refused the credentials; the session is gone.
    #[error("unauthorized")]
    Unauthorized,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// Failures launching or completing an OAuth handshake.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LaunchError {
    #[error("popup window was blocked")]
    PopupBlocked,
    #[error("handshake was cancelled before completion")]
    Cancelled,
}
