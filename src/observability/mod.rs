//! Observability for the failover monitor
//!
//! - Structured logging (JSON lines)
//! - Typed monitor events
//!
//! Observability is read-only: it describes what a cycle did and never
//! decides what the next step is. A failure to write a log line is never
//! fatal to a cycle.
//!
//! # Usage
//!
//! ```ignore
//! use pgha::observability::{Logger, MonitorEvent};
//!
//! let logger = Logger::console().with_context("environment", "production");
//! logger.event(MonitorEvent::PrimaryReachable, &[("host", "203.0.113.1")]);
//! ```

mod events;
mod logger;

pub use events::MonitorEvent;
pub use logger::{LogBuffer, LogScope, Logger, Severity};

use std::fmt;
use std::io;

/// Observability error
///
/// Raised only while opening a log destination.
#[derive(Debug)]
pub struct ObservabilityError {
    message: String,
    source: io::Error,
}

impl ObservabilityError {
    /// Create with source error
    pub fn with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            message: message.into(),
            source,
        }
    }
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PGHA_OBSERVABILITY_FAILED: {} (caused by: {})",
            self.message, self.source
        )
    }
}

impl std::error::Error for ObservabilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Result type for observability operations
pub type ObservabilityResult<T> = Result<T, ObservabilityError>;
