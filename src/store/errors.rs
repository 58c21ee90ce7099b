//! # Store Errors

use std::path::PathBuf;

use thiserror::Error;

use crate::failover::FailoverError;

/// Result type for persisted store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("environment '{environment}' not found in {}", .path.display())]
    MissingSection { path: PathBuf, environment: String },

    #[error("'{field}' missing from {}", .path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("malformed {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to serialize YAML: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("repmgr query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Whether the error comes from content or layout rather than I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::MissingSection { .. }
                | Self::MissingField { .. }
                | Self::Malformed { .. }
        )
    }
}

impl From<StoreError> for FailoverError {
    fn from(e: StoreError) -> Self {
        if e.is_configuration() {
            FailoverError::configuration(e.to_string())
        } else {
            FailoverError::store_io(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::FailoverErrorKind;

    #[test]
    fn test_missing_section_maps_to_configuration() {
        let err = StoreError::MissingSection {
            path: PathBuf::from("/var/www/miq/vmdb/config/database.yml"),
            environment: "production".to_string(),
        };
        let failover: FailoverError = err.into();
        assert_eq!(failover.kind, FailoverErrorKind::Configuration);
        assert!(failover.message.contains("production"));
    }

    #[test]
    fn test_io_maps_to_store_io() {
        let err = StoreError::io(
            "failed to rename",
            "/tmp/database.yml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let failover: FailoverError = err.into();
        assert_eq!(failover.kind, FailoverErrorKind::StoreIo);
        assert!(failover.message.contains("failed to rename"));
    }
}
