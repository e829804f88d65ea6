use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by upstream operations.
///
/// `Fetch` and `Parse` are deliberately distinct: a refresh that dies
/// on the wire and a refresh that got a page back but could not find
/// the expected markup are handled identically by callers but must be
/// distinguishable in logs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("upstream fetch failed: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("upstream response did not match expected structure at {hop}")]
    Parse { hop: &'static str },

    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error("token decode failed: {0}")]
    Decode(String),

    #[error("upstream error at {context}: {message}")]
    Upstream {
        context: &'static str,
        message: String,
    },

    #[error("upstream request timed out")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn upstream(context: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            context,
            message: message.into(),
        }
    }

    pub fn upstream_status(context: &'static str, status: reqwest::StatusCode) -> Self {
        Self::upstream(context, format!("status {status}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts map to a dedicated variant so the HTTP layer can
        // answer 504 instead of a generic 500.
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Fetch(err)
        }
    }
}
