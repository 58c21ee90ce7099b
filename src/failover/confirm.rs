//! Primary Confirmation
//!
//! A candidate is confirmed as the new primary only when repmgr's
//! cluster-wide metadata, read through some live connection, names it as the
//! single active master. The candidate's own self-report is not trusted.

use std::fmt;

use super::collaborators::RepmgrConnection;
use super::errors::FailoverResult;
use super::topology::{ClusterNode, TopologySnapshot};

/// Interpretation of a repmgr result set for one expected host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Exactly one active master and it is the expected host.
    Confirmed { host: String },

    /// No active master in the result.
    NoMaster,

    /// More than one active master; treated as not confirmed.
    Ambiguous { masters: usize },

    /// Exactly one active master but a different host.
    OtherMaster { host: String },
}

impl Confirmation {
    /// Evaluate `snapshot` against `expected_host`.
    pub fn evaluate(snapshot: &TopologySnapshot, expected_host: &str) -> Self {
        let masters = snapshot.active_masters();
        match masters.as_slice() {
            [] => Self::NoMaster,
            [master] if master.host == expected_host => Self::Confirmed {
                host: master.host.clone(),
            },
            [master] => Self::OtherMaster {
                host: master.host.clone(),
            },
            many => Self::Ambiguous {
                masters: many.len(),
            },
        }
    }

    /// The confirmed host, if any.
    pub fn into_host(self) -> Option<String> {
        match self {
            Self::Confirmed { host } => Some(host),
            _ => None,
        }
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed { host } => write!(f, "{} is the active master", host),
            Self::NoMaster => write!(f, "no active master reported"),
            Self::Ambiguous { masters } => write!(f, "{} active masters reported", masters),
            Self::OtherMaster { host } => write!(f, "active master is {}", host),
        }
    }
}

/// Query repmgr through `connection` and evaluate the result for `expected`.
pub fn confirm_candidate(
    connection: &mut dyn RepmgrConnection,
    expected: &ClusterNode,
) -> FailoverResult<Confirmation> {
    let snapshot = connection.query_repmgr()?;
    Ok(Confirmation::evaluate(&snapshot, &expected.host))
}

/// Host of `expected` if repmgr, queried through `connection`, reports it as
/// the single active master. A failed query confirms nothing.
pub fn host_for_primary_database(
    connection: &mut dyn RepmgrConnection,
    expected: &ClusterNode,
) -> Option<String> {
    confirm_candidate(connection, expected)
        .ok()
        .and_then(Confirmation::into_host)
}
