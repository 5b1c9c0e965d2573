use std::time::Duration;

/// Transcription-service failure classes, per the spec's external-interface
/// contract. `ClientError` (4xx other than 429) is the only class never
/// retried.
#[derive(Debug, thiserror::Error, Clone)]
pub enum DispatchError {
    #[error("request timed out")]
    Timeout,
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error: {0}")]
    ServerError(String),
    #[error("client error: {0}")]
    ClientError(String),
    #[error("network error: {0}")]
    Network(String),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::ClientError(_))
    }
}
