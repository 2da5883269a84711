use reqwest::StatusCode;

/// Identity server client errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to send request: {0}")]
    SendRequest(#[from] reqwest::Error),

    #[error("parse URL: {0}")]
    ParseURL(#[from] url::ParseError),

    #[error("identity server responded {status}: {message} ({code})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
        description: Option<String>,
    },

    #[error("unexpected HTTP status code: {0}")]
    UnexpectedStatusCode(StatusCode),
}

impl Error {
    /// The server-provided description of a rejected request, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Api { description, .. } => description.as_deref().filter(|d| !d.is_empty()),
            _ => None,
        }
    }

    /// The HTTP status the server responded with, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } | Self::UnexpectedStatusCode(status) => Some(*status),
            Self::SendRequest(err) => err.status(),
            Self::ParseURL(_) => None,
        }
    }
}
