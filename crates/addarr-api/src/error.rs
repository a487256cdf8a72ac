use thiserror::Error;

/// Errors from the Addarr API client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request to {url} timed out after {after_ms}ms")]
    Timeout { url: String, after_ms: u64 },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether the request never produced a response.
    ///
    /// Only these errors make the resolver switch base URLs; a response with
    /// any status code, or a body that fails to parse, is left to the caller.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_status() && !e.is_decode(),
            Self::Connect(_) | Self::Timeout { .. } | Self::InvalidUrl { .. } => true,
            Self::Api { .. } | Self::Parse(_) => false,
        }
    }
}
