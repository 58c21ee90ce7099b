//! Connection Parameters
//!
//! Identifies a node to probe or connect to. Immutable value; read fresh
//! from the primary config store or derived from a cached topology record
//! on every cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{FailoverError, FailoverResult};

/// Parameters needed to open a connection to one cluster member.
///
/// `Debug` and `Display` never render the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Host name or address
    pub host: String,

    /// Database role to connect as
    pub user: String,

    /// Database name
    pub dbname: String,

    /// Port, server default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Password, omitted when authentication is handled elsewhere (pgpass, trust)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ConnectionParams {
    /// Create parameters without port or password.
    pub fn new(host: impl Into<String>, user: impl Into<String>, dbname: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            dbname: dbname.into(),
            port: None,
            password: None,
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Reject parameters that cannot address a node.
    ///
    /// Malformed parameters are a configuration error, not a reachability
    /// failure.
    pub fn validate(&self) -> FailoverResult<()> {
        for (name, value) in [("host", &self.host), ("user", &self.user), ("dbname", &self.dbname)] {
            if value.trim().is_empty() {
                return Err(FailoverError::configuration(format!(
                    "connection parameter '{}' is empty",
                    name
                )));
            }
        }
        if self.port == Some(0) {
            return Err(FailoverError::configuration("connection parameter 'port' is 0"));
        }
        Ok(())
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host={}", self.host)?;
        if let Some(port) = self.port {
            write!(f, " port={}", port)?;
        }
        write!(f, " user={} dbname={}", self.user, self.dbname)
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("dbname", &self.dbname)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
