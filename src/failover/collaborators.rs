//! Collaborator Capabilities
//!
//! The engine depends only on these traits. Each has one production
//! implementation (`crate::pg`, `crate::store`, `crate::service`) and test
//! doubles under `tests/common`.

use super::errors::FailoverResult;
use super::params::ConnectionParams;
use super::topology::{ClusterNode, TopologySnapshot};

/// An open connection to one cluster member.
///
/// Dropping the value releases the connection. The engine relies on this to
/// release every connection on every exit path.
pub trait RepmgrConnection {
    /// Parameters this connection was opened with.
    fn params(&self) -> &ConnectionParams;

    /// Query repmgr's cluster-wide view of members and roles.
    fn query_repmgr(&mut self) -> FailoverResult<TopologySnapshot>;
}

/// Opens connections.
pub trait ConnectionProbe {
    /// Open a connection.
    ///
    /// Returns `Ok(None)` when the node is unreachable. Errors are reserved
    /// for configuration problems such as malformed parameters.
    fn open(&self, params: &ConnectionParams) -> FailoverResult<Option<Box<dyn RepmgrConnection>>>;
}

/// Asks a node directly whether it is still replaying as a standby.
pub trait RecoveryStatusChecker {
    /// `true` while the node is in recovery.
    ///
    /// An unreachable node reports `true`: it is not usable this attempt.
    fn is_in_recovery(&self, params: &ConnectionParams) -> bool;
}

/// Persisted cache of cluster members.
pub trait TopologyStore {
    /// Cached members with `active = true`, without contacting the cluster.
    fn active_members(&self) -> FailoverResult<Vec<ClusterNode>>;

    /// Re-query live cluster state through `connection` and persist it.
    fn refresh(&self, connection: &mut dyn RepmgrConnection) -> FailoverResult<()>;
}

/// Persisted "which host is primary" record consumed by the application.
pub trait PrimaryConfigStore {
    fn read(&self) -> FailoverResult<ConnectionParams>;

    /// Atomically rewrite the record.
    fn write(&self, params: &ConnectionParams) -> FailoverResult<()>;
}

/// Start/stop for the dependent application.
pub trait ServiceController {
    fn is_running(&self) -> FailoverResult<bool>;

    /// Stopping a stopped service is not an error.
    fn stop(&self) -> FailoverResult<()>;

    fn start(&self) -> FailoverResult<()>;
}

/// Borrowed set of collaborators for one engine.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub probe: &'a dyn ConnectionProbe,
    pub recovery: &'a dyn RecoveryStatusChecker,
    pub topology: &'a dyn TopologyStore,
    pub primary_config: &'a dyn PrimaryConfigStore,
    pub service: &'a dyn ServiceController,
}
