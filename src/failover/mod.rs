//! Failover Subsystem
//!
//! The decision engine that, once per invocation, decides whether the
//! configured primary is lost, which standby repmgr has promoted, and in
//! what order the application is stopped, repointed and restarted.
//!
//! - Reachability and ambiguity are expected signals, never errors
//! - The candidate search is bounded by an explicit `FailoverPolicy`
//! - A standby still in recovery is never queried for confirmation
//! - Service stop → config rewrite → service start, in that order
//! - No state is kept between invocations
//!
//! All I/O goes through the traits in `collaborators`.

mod collaborators;
mod confirm;
mod engine;
mod errors;
mod params;
mod policy;
mod state;
mod topology;

pub use collaborators::{
    Collaborators, ConnectionProbe, PrimaryConfigStore, RecoveryStatusChecker, RepmgrConnection,
    ServiceController, TopologyStore,
};
pub use confirm::{confirm_candidate, host_for_primary_database, Confirmation};
pub use engine::FailoverEngine;
pub use errors::{FailoverError, FailoverErrorKind, FailoverResult};
pub use params::ConnectionParams;
pub use policy::{FailoverPolicy, DEFAULT_ATTEMPT_INTERVAL, DEFAULT_FAILOVER_ATTEMPTS};
pub use state::{FailoverOutcome, FailoverState};
pub use topology::{ClusterNode, NodeRole, TopologySnapshot};
