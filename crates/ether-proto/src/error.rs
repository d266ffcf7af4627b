//! Errors raised while fetching a stream title.

/// Result type alias for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Why a single title fetch failed.
///
/// The `Display` text is what ends up on the status line, so it is kept short
/// and readable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, timeout or HTTP status failure
    #[error("network error: {0}")]
    Network(String),

    /// Missing `icy-metaint`, or the stream ended mid-frame
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Metadata block is not valid text
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network(format!("timed out: {}", e))
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<std::string::FromUtf8Error> for FetchError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::Decode(e.to_string())
    }
}
