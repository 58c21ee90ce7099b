//! Observable events of the failover monitor
//!
//! Every transition of a check cycle has an event. Events are explicit and
//! typed; the log never feeds back into control decisions.

use std::fmt;

use super::logger::Severity;

/// Observable monitor events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    // Cycle
    /// Check cycle started
    CheckBegin,
    /// Check cycle ended with an error
    CycleError,

    // Healthy path
    /// Configured primary accepted a connection
    PrimaryReachable,
    /// Topology cache rewritten from a live query
    TopologyRefreshed,
    /// Topology cache could not be refreshed
    TopologyRefreshFailed,
    /// Topology cache could not be read
    TopologyReadFailed,

    // Failure path
    /// Configured primary did not accept a connection
    PrimaryUnreachable,
    /// Application service stopped
    ServiceStopped,
    /// Application service was not running
    ServiceAlreadyStopped,
    /// Application service could not be stopped
    ServiceStopFailed,

    // Candidate search
    /// Search attempt started
    FailoverAttempt,
    /// Candidate still in recovery, skipped this attempt
    CandidateInRecovery,
    /// Candidate did not accept a connection
    CandidateUnreachable,
    /// repmgr does not name the candidate as the single active master
    CandidateRejected,
    /// repmgr names the candidate as the single active master
    CandidateConfirmed,
    /// All attempts used without a confirmed master
    FailoverExhausted,

    // Commit
    /// Primary config now points at the new primary
    PrimaryConfigCommitted,
    /// Primary config could not be rewritten
    PrimaryConfigCommitFailed,
    /// Application service started
    ServiceStarted,
    /// Application service could not be started
    ServiceStartFailed,
    /// Failover completed
    FailoverComplete,
    /// Failover did not complete; application left stopped
    FailoverFailed,

    // Connections
    /// A connection attempt failed
    ConnectionFailed,
    /// A repmgr row could not be turned into a cluster member
    RepmgrRecordSkipped,
    /// Recovery status could not be read; node treated as in recovery
    RecoveryCheckFailed,
}

impl MonitorEvent {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorEvent::CheckBegin => "CHECK_BEGIN",
            MonitorEvent::CycleError => "CYCLE_ERROR",

            MonitorEvent::PrimaryReachable => "PRIMARY_REACHABLE",
            MonitorEvent::TopologyRefreshed => "TOPOLOGY_REFRESHED",
            MonitorEvent::TopologyRefreshFailed => "TOPOLOGY_REFRESH_FAILED",
            MonitorEvent::TopologyReadFailed => "TOPOLOGY_READ_FAILED",

            MonitorEvent::PrimaryUnreachable => "PRIMARY_UNREACHABLE",
            MonitorEvent::ServiceStopped => "SERVICE_STOPPED",
            MonitorEvent::ServiceAlreadyStopped => "SERVICE_ALREADY_STOPPED",
            MonitorEvent::ServiceStopFailed => "SERVICE_STOP_FAILED",

            MonitorEvent::FailoverAttempt => "FAILOVER_ATTEMPT",
            MonitorEvent::CandidateInRecovery => "CANDIDATE_IN_RECOVERY",
            MonitorEvent::CandidateUnreachable => "CANDIDATE_UNREACHABLE",
            MonitorEvent::CandidateRejected => "CANDIDATE_REJECTED",
            MonitorEvent::CandidateConfirmed => "CANDIDATE_CONFIRMED",
            MonitorEvent::FailoverExhausted => "FAILOVER_EXHAUSTED",

            MonitorEvent::PrimaryConfigCommitted => "PRIMARY_CONFIG_COMMITTED",
            MonitorEvent::PrimaryConfigCommitFailed => "PRIMARY_CONFIG_COMMIT_FAILED",
            MonitorEvent::ServiceStarted => "SERVICE_STARTED",
            MonitorEvent::ServiceStartFailed => "SERVICE_START_FAILED",
            MonitorEvent::FailoverComplete => "FAILOVER_COMPLETE",
            MonitorEvent::FailoverFailed => "FAILOVER_FAILED",

            MonitorEvent::ConnectionFailed => "CONNECTION_FAILED",
            MonitorEvent::RepmgrRecordSkipped => "REPMGR_RECORD_SKIPPED",
            MonitorEvent::RecoveryCheckFailed => "RECOVERY_CHECK_FAILED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            MonitorEvent::PrimaryUnreachable
            | MonitorEvent::CycleError
            | MonitorEvent::TopologyRefreshFailed
            | MonitorEvent::TopologyReadFailed
            | MonitorEvent::ServiceStopFailed
            | MonitorEvent::FailoverExhausted
            | MonitorEvent::PrimaryConfigCommitFailed
            | MonitorEvent::ServiceStartFailed
            | MonitorEvent::FailoverFailed
            | MonitorEvent::ConnectionFailed => Severity::Error,
            MonitorEvent::CandidateUnreachable
            | MonitorEvent::CandidateRejected
            | MonitorEvent::RepmgrRecordSkipped
            | MonitorEvent::RecoveryCheckFailed => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
