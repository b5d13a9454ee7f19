//! Error codes and depot errors.

use thiserror::Error;

/// Integer error codes shared with the data collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    Generic,
    NotInitialized,
    AlreadyInitialized,
    InvalidArgs,
    MissingId,
    RequestTimedOut,
    /// Any code outside the known range
    Unknown,
}

impl ErrorCode {
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Success => 0,
            Self::Generic => -1,
            Self::NotInitialized => -2,
            Self::AlreadyInitialized => -3,
            Self::InvalidArgs => -4,
            Self::MissingId => -5,
            Self::RequestTimedOut => -6,
            Self::Unknown => -99,
        }
    }

    pub fn from_i64(code: i64) -> Self {
        match code {
            0 => Self::Success,
            -1 => Self::Generic,
            -2 => Self::NotInitialized,
            -3 => Self::AlreadyInitialized,
            -4 => Self::InvalidArgs,
            -5 => Self::MissingId,
            -6 => Self::RequestTimedOut,
            _ => Self::Unknown,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Success => "Success",
            Self::Generic => "Generic",
            Self::NotInitialized => "NotInitialized",
            Self::AlreadyInitialized => "AlreadyInitialized",
            Self::InvalidArgs => "InvalidArgs",
            Self::MissingId => "MissingId",
            Self::RequestTimedOut => "RequestTimedOut",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Errors surfaced to callers of the depot handle.
#[derive(Debug, Error)]
pub enum DepotError {
    /// The depot has not been initialized yet
    #[error("event depot is not initialized")]
    NotInitialized,

    /// The worker thread stopped accepting jobs
    #[error("event depot worker is no longer running")]
    WorkerStopped,

    /// The worker could not be started
    #[error("failed to start event depot worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl DepotError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::WorkerStopped | Self::Spawn(_) => ErrorCode::Generic,
        }
    }
}
