/// Failure talking to the transcript backing store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// A raw store record that does not fit the [`Message`](crate::Message) schema.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is missing field '{0}'")]
    MissingField(&'static str),

    #[error("unknown sender '{0}'")]
    UnknownSender(String),

    #[error("record text is blank")]
    BlankText,

    #[error("unparsable timestamp '{0}'")]
    BadTimestamp(String),
}

/// Errors a completion backend can report.
///
/// The orchestrator treats every variant the same way (fallback reply);
/// the distinction only matters for logs and the retry decision.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    /// Short, stable label for logs and trace events.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Timeout(_) => "timeout",
            CompletionError::Unauthorized(_) => "unauthorized",
            CompletionError::RateLimited(_) => "rate_limited",
            CompletionError::Unavailable(_) => "unavailable",
            CompletionError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::Timeout(_)
                | CompletionError::RateLimited(_)
                | CompletionError::Unavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_parse_failures_are_not_retryable() {
        assert!(!CompletionError::Unauthorized("401".into()).is_retryable());
        assert!(!CompletionError::MalformedResponse("no choices".into()).is_retryable());
        assert!(CompletionError::RateLimited("429".into()).is_retryable());
        assert!(CompletionError::Timeout("20s".into()).is_retryable());
    }

    #[test]
    fn io_error_maps_to_unavailable() {
        let err: StoreError = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert_eq!(err, StoreError::Unavailable("disk gone".into()));
    }
}
