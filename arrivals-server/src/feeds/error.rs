//! Feed transport error types.

use std::fmt;

/// Errors from the upstream feed transports.
#[derive(Debug)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// Upstream served an HTML error page instead of a payload
    ErrorPage,

    /// Rate limited by the upstream
    RateLimited,

    /// Invalid credentials or expired token
    Unauthorized,

    /// Upstream returned an error status code
    ApiError { status: u16, message: String },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "HTTP error: {e}"),
            FeedError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            FeedError::ErrorPage => write!(f, "upstream served an error page"),
            FeedError::RateLimited => write!(f, "rate limited by upstream"),
            FeedError::Unauthorized => write!(f, "unauthorized (invalid or expired token)"),
            FeedError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

impl FeedError {
    /// True for failures the poller should respond to by backing off.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, FeedError::RateLimited)
    }
}
