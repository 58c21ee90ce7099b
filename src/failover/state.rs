//! Failover State Machine
//!
//! One check cycle moves through:
//!
//! ```text
//! Monitoring → PrimaryUnreachable → ServiceStopping → CandidateSearch(1..N)
//!     → Committing → Monitoring
//!     → Failed
//! ```
//!
//! - Every cycle starts in `Monitoring`
//! - Transitions consume the current state and reject anything not listed
//! - `Committing` is the only state in which persisted config may change
//!   or the service may start
//! - `Failed` is terminal for the cycle; the next cycle starts over

use super::errors::{FailoverError, FailoverResult};
use super::params::ConnectionParams;

/// Failover cycle state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FailoverState {
    /// Checking the configured primary. Initial state of every cycle.
    #[default]
    Monitoring,

    /// The configured primary could not be reached.
    PrimaryUnreachable,

    /// Stopping the dependent application before any further action.
    ServiceStopping,

    /// Searching for a confirmed new master.
    CandidateSearch {
        /// 1-based attempt number
        attempt: u32,
    },

    /// A new master is confirmed; config rewrite and service start pending.
    Committing {
        /// The confirmed new primary
        new_primary: ConnectionParams,
    },

    /// The cycle ended without a usable primary. Application left stopped.
    Failed {
        /// Attempts made before giving up (0 if the search never ran)
        attempts: u32,
    },
}

impl FailoverState {
    /// Get the state name for observability.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Monitoring => "Monitoring",
            Self::PrimaryUnreachable => "PrimaryUnreachable",
            Self::ServiceStopping => "ServiceStopping",
            Self::CandidateSearch { .. } => "CandidateSearch",
            Self::Committing { .. } => "Committing",
            Self::Failed { .. } => "Failed",
        }
    }

    /// Current search attempt, if searching.
    pub fn attempt(&self) -> Option<u32> {
        match self {
            Self::CandidateSearch { attempt } => Some(*attempt),
            _ => None,
        }
    }

    /// Whether persisted config may be rewritten and the service started.
    pub fn permits_commit(&self) -> bool {
        matches!(self, Self::Committing { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Monitoring → PrimaryUnreachable
    pub fn primary_lost(self) -> FailoverResult<Self> {
        match self {
            Self::Monitoring => Ok(Self::PrimaryUnreachable),
            _ => Err(FailoverError::forbidden_transition(
                self.state_name(),
                "PrimaryUnreachable",
            )),
        }
    }

    /// PrimaryUnreachable → ServiceStopping
    pub fn begin_service_stop(self) -> FailoverResult<Self> {
        match self {
            Self::PrimaryUnreachable => Ok(Self::ServiceStopping),
            _ => Err(FailoverError::forbidden_transition(
                self.state_name(),
                "ServiceStopping",
            )),
        }
    }

    /// ServiceStopping → CandidateSearch(1)
    ///
    /// The search never starts while the application may still be running.
    pub fn begin_search(self) -> FailoverResult<Self> {
        match self {
            Self::ServiceStopping => Ok(Self::CandidateSearch { attempt: 1 }),
            _ => Err(FailoverError::forbidden_transition(
                self.state_name(),
                "CandidateSearch",
            )),
        }
    }

    /// CandidateSearch(n) → CandidateSearch(n + 1)
    pub fn next_attempt(self) -> FailoverResult<Self> {
        match self {
            Self::CandidateSearch { attempt } => Ok(Self::CandidateSearch {
                attempt: attempt.saturating_add(1),
            }),
            _ => Err(FailoverError::forbidden_transition(
                self.state_name(),
                "CandidateSearch",
            )),
        }
    }

    /// CandidateSearch → Committing
    pub fn confirm(self, new_primary: ConnectionParams) -> FailoverResult<Self> {
        match self {
            Self::CandidateSearch { .. } => Ok(Self::Committing { new_primary }),
            _ => Err(FailoverError::forbidden_transition(
                self.state_name(),
                "Committing",
            )),
        }
    }

    /// CandidateSearch → Failed
    pub fn exhaust(self) -> FailoverResult<Self> {
        match self {
            Self::CandidateSearch { attempt } => Ok(Self::Failed { attempts: attempt }),
            _ => Err(FailoverError::forbidden_transition(self.state_name(), "Failed")),
        }
    }

    /// Committing → Monitoring
    pub fn complete_commit(self) -> FailoverResult<Self> {
        match self {
            Self::Committing { .. } => Ok(Self::Monitoring),
            _ => Err(FailoverError::forbidden_transition(
                self.state_name(),
                "Monitoring",
            )),
        }
    }

    /// ServiceStopping | CandidateSearch | Committing → Failed
    ///
    /// Taken when a service or store error ends the cycle after the primary
    /// was declared lost.
    pub fn abandon(self) -> FailoverResult<Self> {
        match self {
            Self::ServiceStopping => Ok(Self::Failed { attempts: 0 }),
            Self::CandidateSearch { attempt } => Ok(Self::Failed { attempts: attempt }),
            Self::Committing { .. } => Ok(Self::Failed { attempts: 0 }),
            _ => Err(FailoverError::forbidden_transition(self.state_name(), "Failed")),
        }
    }
}

/// Result of one check cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverOutcome {
    /// Primary reachable, no action taken beyond the topology refresh.
    Healthy,

    /// Failover completed; config now points at the new primary.
    Recovered(ConnectionParams),

    /// Attempts exhausted without a confirmed master. Application left stopped.
    Failed,
}

impl FailoverOutcome {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Recovered(_) => "recovered",
            Self::Failed => "failed",
        }
    }

    /// The new primary, if a failover completed.
    pub fn new_primary(&self) -> Option<&ConnectionParams> {
        match self {
            Self::Recovered(params) => Some(params),
            _ => None,
        }
    }
}
