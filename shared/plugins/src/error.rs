use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

/// Failure modes of a repository source fetch.
///
/// `validate` rejections are not errors at this layer; a source that does
/// not recognize a URI simply returns `false` and the manager reports the
/// URI as invalid on its own.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source unreachable: {0}")]
    Unreachable(String),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Malformed source data: {0}")]
    Malformed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),
}

impl SourceError {
    /// True for transient failures worth retrying with the same URI.
    /// `NotFound` and `Malformed` are stable properties of the remote and
    /// retrying them is pointless.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::Unreachable(_) | SourceError::RateLimited(_)
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else {
            SourceError::Unreachable(err.to_string())
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(err.to_string()),
            _ => SourceError::Unreachable(err.to_string()),
        }
    }
}
