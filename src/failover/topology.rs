//! Cluster Topology
//!
//! A topology snapshot is a point-in-time view of the cluster members as
//! reported by repmgr, either read through a live connection or from the
//! persisted cache. Order is iteration order only.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::params::ConnectionParams;

/// Role of a cluster member as recorded by repmgr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Accepts writes. repmgr 4+ reports this as `primary`.
    #[serde(alias = "primary")]
    Master,
    /// Replica applying the primary's write stream
    Standby,
}

impl NodeRole {
    /// Parse a repmgr `type` column value.
    ///
    /// Returns `None` for roles that never take part in failover (witness,
    /// bdr, unknown values).
    pub fn from_repmgr(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "master" | "primary" => Some(Self::Master),
            "standby" => Some(Self::Standby),
            _ => None,
        }
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Standby => "standby",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cluster member.
///
/// `active = false` means the node is known but excluded from candidacy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Role reported by repmgr
    #[serde(rename = "type")]
    pub role: NodeRole,

    /// Whether repmgr considers the node active
    pub active: bool,

    /// Host name or address
    pub host: String,

    /// Database role
    pub user: String,

    /// Database name
    pub dbname: String,

    /// Port from the node's conninfo, if it carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ClusterNode {
    /// Create a node record without a port.
    pub fn new(
        role: NodeRole,
        active: bool,
        host: impl Into<String>,
        user: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Self {
        Self {
            role,
            active,
            host: host.into(),
            user: user.into(),
            dbname: dbname.into(),
            port: None,
        }
    }

    /// Active standby: may be considered as the new primary.
    pub fn is_failover_candidate(&self) -> bool {
        self.active && self.role == NodeRole::Standby
    }

    /// Active master.
    pub fn is_active_master(&self) -> bool {
        self.active && self.role == NodeRole::Master
    }

    /// Connection parameters for this node.
    ///
    /// The topology does not record credentials, so the password comes from
    /// `credentials` (the configured primary). The port falls back to the
    /// credentials' port when the record carries none.
    pub fn connection_params(&self, credentials: &ConnectionParams) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            user: self.user.clone(),
            dbname: self.dbname.clone(),
            port: self.port.or(credentials.port),
            password: credentials.password.clone(),
        }
    }
}

/// Ordered set of cluster members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopologySnapshot {
    nodes: Vec<ClusterNode>,
}

impl TopologySnapshot {
    /// Create a snapshot from records in iteration order.
    pub fn new(nodes: Vec<ClusterNode>) -> Self {
        Self { nodes }
    }

    /// All members, in iteration order.
    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Members with `active = true`.
    pub fn active_members(&self) -> Vec<ClusterNode> {
        self.nodes.iter().filter(|n| n.active).cloned().collect()
    }

    /// Active members that claim the master role.
    pub fn active_masters(&self) -> Vec<&ClusterNode> {
        self.nodes.iter().filter(|n| n.is_active_master()).collect()
    }
}
