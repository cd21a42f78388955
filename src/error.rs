// Collection and scheduler error types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Domain;

/// How the core reacts to a failed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Hardware or feature not present on this host. Not an operational failure.
    Unavailable,
    /// Timeout or temporary OS/driver error; retried on the next due tick.
    Transient,
    /// Unexpected failure (including a caught panic); retried like `Transient`.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Transient => "transient",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a `SourceAdapter::collect` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CollectError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CollectError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn timed_out(budget: Duration) -> Self {
        Self::transient(format!("collection timed out after {} ms", budget.as_millis()))
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == ErrorKind::Unavailable
    }
}

/// Adapter-side I/O errors (sysfs reads, `spawn_blocking` joins) are retryable.
impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::transient(e.to_string())
    }
}

impl From<tokio::task::JoinError> for CollectError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            CollectError::unknown(format!("collector task panicked: {}", e))
        } else {
            CollectError::transient(format!("collector task cancelled: {}", e))
        }
    }
}

/// Misconfiguration detected while assembling the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("a sampler for domain {0} is already registered")]
    DuplicateDomain(Domain),
    #[error("{domain}: timeout ({timeout_ms} ms) must be shorter than cadence ({cadence_ms} ms)")]
    TimeoutNotBelowCadence {
        domain: Domain,
        timeout_ms: u64,
        cadence_ms: u64,
    },
    #[error("{0}: cadence must be > 0")]
    ZeroCadence(Domain),
    #[error("{0}: history capacity must be > 0")]
    ZeroHistoryCapacity(Domain),
    #[error("tick interval must be > 0")]
    ZeroTick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = CollectError::transient("sensor busy");
        assert_eq!(e.to_string(), "transient: sensor busy");
    }

    #[test]
    fn timeout_is_transient() {
        let e = CollectError::timed_out(Duration::from_millis(750));
        assert_eq!(e.kind, ErrorKind::Transient);
        assert!(e.message.contains("750"));
    }

    #[test]
    fn io_error_maps_to_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "EAGAIN");
        let e: CollectError = io.into();
        assert_eq!(e.kind, ErrorKind::Transient);
    }
}
