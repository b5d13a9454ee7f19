use eventdepot_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// No response arrived before the deadline
    #[error("request timed out after {0} ms")]
    TimedOut(u64),

    /// The request could not be formed
    #[error("invalid request: {0}")]
    InvalidArgs(String),

    /// The collector answered with a non-success HTTP status
    #[error("collector returned HTTP {0}")]
    Status(u16),

    /// Connection, TLS, or other unexpected failure
    #[error("request failed: {0}")]
    Generic(String),
}

impl TransportError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TimedOut(_) => ErrorCode::RequestTimedOut,
            Self::InvalidArgs(_) => ErrorCode::InvalidArgs,
            Self::Status(_) | Self::Generic(_) => ErrorCode::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TransportError::TimedOut(10).code(),
            ErrorCode::RequestTimedOut
        );
        assert_eq!(
            TransportError::InvalidArgs("x".into()).code(),
            ErrorCode::InvalidArgs
        );
        assert_eq!(TransportError::Status(503).code(), ErrorCode::Generic);
        assert_eq!(
            TransportError::Generic("reset".into()).code(),
            ErrorCode::Generic
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TransportError::TimedOut(2500).to_string(),
            "request timed out after 2500 ms"
        );
        assert_eq!(
            TransportError::Status(404).to_string(),
            "collector returned HTTP 404"
        );
    }
}
