//! Failover Error Types
//!
//! Reachability and topology ambiguity are steady-state signals and never
//! surface as errors. Only configuration problems, persisted-store I/O and
//! service control failures propagate to the caller.

use std::fmt;

/// Failover error type
#[derive(Debug, Clone)]
pub struct FailoverError {
    /// Error kind
    pub kind: FailoverErrorKind,
    /// Error message
    pub message: String,
}

/// Failover error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverErrorKind {
    /// Malformed connection parameters or missing configuration.
    /// Fatal to the cycle, raised before any side effect.
    Configuration,

    /// Persisted store (primary config, topology cache) could not be
    /// read or written.
    StoreIo,

    /// The dependent application service could not be stopped or started.
    ServiceControl,

    /// A repmgr query over an open connection failed.
    QueryFailed,

    /// Forbidden state transition attempted
    ForbiddenTransition,
}

impl FailoverErrorKind {
    /// Stable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration => "PGHA_CONFIGURATION",
            Self::StoreIo => "PGHA_STORE_IO",
            Self::ServiceControl => "PGHA_SERVICE_CONTROL",
            Self::QueryFailed => "PGHA_QUERY_FAILED",
            Self::ForbiddenTransition => "PGHA_FORBIDDEN_TRANSITION",
        }
    }
}

impl FailoverError {
    /// Create a new failover error.
    pub fn new(kind: FailoverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FailoverErrorKind::Configuration, message)
    }

    /// Create a store I/O error.
    pub fn store_io(message: impl Into<String>) -> Self {
        Self::new(FailoverErrorKind::StoreIo, message)
    }

    /// Create a service control error.
    pub fn service_control(message: impl Into<String>) -> Self {
        Self::new(FailoverErrorKind::ServiceControl, message)
    }

    /// Create a query failed error.
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::new(FailoverErrorKind::QueryFailed, message)
    }

    /// Create a forbidden transition error.
    pub fn forbidden_transition(from: &str, to: &str) -> Self {
        Self::new(
            FailoverErrorKind::ForbiddenTransition,
            format!("forbidden transition: {} → {}", from, to),
        )
    }

    /// Whether this error must abort the cycle before any side effect.
    pub fn is_configuration(&self) -> bool {
        self.kind == FailoverErrorKind::Configuration
    }
}

impl fmt::Display for FailoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for FailoverError {}

/// Result type for failover operations
pub type FailoverResult<T> = Result<T, FailoverError>;
