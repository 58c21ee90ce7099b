//! Failover Decision Engine
//!
//! Runs one health-check/failover cycle:
//!
//! 1. Read the configured primary and try to connect
//! 2. Reachable: refresh the topology cache, done
//! 3. Unreachable: stop the application, search for a confirmed new master
//!    within the policy bound, then commit in fixed order:
//!    config rewrite → topology refresh → service start
//!
//! Ordering guarantees:
//! - Service stop happens before the search and before any config change
//! - Config rewrite and service start only happen in `Committing`
//! - Config rewrite happens before service start; a failed rewrite leaves
//!   the application stopped
//!
//! The engine keeps no state between cycles. Every connection it opens is
//! dropped before the step that opened it returns.

use std::thread;

use uuid::Uuid;

use super::collaborators::{Collaborators, RepmgrConnection};
use super::confirm::{confirm_candidate, Confirmation};
use super::errors::{FailoverError, FailoverResult};
use super::params::ConnectionParams;
use super::policy::FailoverPolicy;
use super::state::{FailoverOutcome, FailoverState};
use super::topology::ClusterNode;
use crate::observability::{Logger, MonitorEvent};

/// Failover decision engine.
pub struct FailoverEngine<'a> {
    collaborators: Collaborators<'a>,
    policy: FailoverPolicy,
    logger: Logger,
    state: FailoverState,
}

impl<'a> FailoverEngine<'a> {
    /// Create an engine in `Monitoring`.
    pub fn new(collaborators: Collaborators<'a>, policy: FailoverPolicy, logger: Logger) -> Self {
        Self {
            collaborators,
            policy,
            logger,
            state: FailoverState::Monitoring,
        }
    }

    /// State reached by the last cycle.
    pub fn state(&self) -> &FailoverState {
        &self.state
    }

    /// Run exactly one health-check/failover cycle.
    ///
    /// Reachability and ambiguity are handled here and never returned as
    /// errors. Errors are configuration problems (raised before any side
    /// effect), persisted-store I/O and service control failures.
    pub fn check_and_failover(&mut self) -> FailoverResult<FailoverOutcome> {
        self.state = FailoverState::Monitoring;
        let cycle = Uuid::new_v4().to_string();
        // Collaborators holding clones of the logger pick this up too.
        let _cycle = self.logger.scope("cycle", &cycle);
        let logger = self.logger.clone();

        let result = self.run_cycle(&logger);
        if let Err(ref e) = result {
            logger.event(
                MonitorEvent::CycleError,
                &[
                    ("code", e.kind.code()),
                    ("reason", &e.message),
                    ("state", self.state.state_name()),
                ],
            );
        }
        result
    }

    fn run_cycle(&mut self, logger: &Logger) -> FailoverResult<FailoverOutcome> {
        let primary = self.collaborators.primary_config.read()?;
        primary.validate()?;

        let host = primary.host.as_str();
        logger.event(MonitorEvent::CheckBegin, &[("primary", &primary.to_string())]);

        if let Some(mut connection) = self.collaborators.probe.open(&primary)? {
            logger.event(MonitorEvent::PrimaryReachable, &[("host", host)]);
            self.refresh_topology(logger, connection.as_mut())?;
            return Ok(FailoverOutcome::Healthy);
        }

        self.advance(FailoverState::primary_lost)?;
        logger.event(
            MonitorEvent::PrimaryUnreachable,
            &[
                ("host", host),
                ("action", "stopping service and starting failover"),
                (
                    "max_search_secs",
                    &self.policy.max_search_delay().as_secs().to_string(),
                ),
            ],
        );

        self.advance(FailoverState::begin_service_stop)?;
        if let Err(e) = self.stop_service(logger) {
            self.advance(FailoverState::abandon)?;
            return Err(e);
        }

        self.advance(FailoverState::begin_search)?;
        match self.search(logger, &primary)? {
            FailoverOutcome::Recovered(new_primary) => self.commit(logger, new_primary),
            outcome => {
                logger.event(
                    MonitorEvent::FailoverFailed,
                    &[("action", "service left stopped; no configuration changed")],
                );
                Ok(outcome)
            }
        }
    }

    /// Search for a confirmed new master, bounded by the policy.
    ///
    /// Standalone entry to the candidate search: the state is set to the
    /// first attempt. `credentials` supplies the password (and a default
    /// port) for candidate connections. Never mutates config or the service.
    pub fn execute_failover(&mut self, credentials: &ConnectionParams) -> FailoverResult<FailoverOutcome> {
        self.state = FailoverState::CandidateSearch { attempt: 1 };
        let logger = self.logger.clone();
        self.search(&logger, credentials)
    }

    fn search(&mut self, logger: &Logger, credentials: &ConnectionParams) -> FailoverResult<FailoverOutcome> {
        let max_attempts = self.policy.max_attempts();
        let max = max_attempts.to_string();

        loop {
            let attempt = self.state.attempt().unwrap_or(1);
            logger.event(
                MonitorEvent::FailoverAttempt,
                &[("attempt", &attempt.to_string()), ("max_attempts", &max)],
            );

            if let Some(new_primary) = self.scan_candidates(logger, credentials) {
                self.advance(|s| s.confirm(new_primary.clone()))?;
                return Ok(FailoverOutcome::Recovered(new_primary));
            }

            if attempt >= max_attempts {
                self.advance(FailoverState::exhaust)?;
                logger.event(MonitorEvent::FailoverExhausted, &[("attempts", &attempt.to_string())]);
                return Ok(FailoverOutcome::Failed);
            }

            let interval = self.policy.attempt_interval();
            if !interval.is_zero() {
                thread::sleep(interval);
            }
            self.advance(FailoverState::next_attempt)?;
        }
    }

    /// One pass over the cached active standbys.
    fn scan_candidates(&self, logger: &Logger, credentials: &ConnectionParams) -> Option<ConnectionParams> {
        let members = match self.collaborators.topology.active_members() {
            Ok(members) => members,
            Err(e) => {
                logger.event(
                    MonitorEvent::TopologyReadFailed,
                    &[("code", e.kind.code()), ("reason", &e.message)],
                );
                return None;
            }
        };

        members
            .iter()
            .filter(|node| node.is_failover_candidate())
            .find_map(|candidate| self.try_candidate(logger, candidate, credentials))
    }

    fn try_candidate(
        &self,
        logger: &Logger,
        candidate: &ClusterNode,
        credentials: &ConnectionParams,
    ) -> Option<ConnectionParams> {
        let params = candidate.connection_params(credentials);
        let host = candidate.host.as_str();

        if self.collaborators.recovery.is_in_recovery(&params) {
            logger.event(MonitorEvent::CandidateInRecovery, &[("host", host)]);
            return None;
        }

        let mut connection = match self.collaborators.probe.open(&params) {
            Ok(Some(connection)) => connection,
            Ok(None) => {
                logger.event(MonitorEvent::CandidateUnreachable, &[("host", host)]);
                return None;
            }
            Err(e) => {
                logger.event(
                    MonitorEvent::CandidateUnreachable,
                    &[("host", host), ("reason", &e.message)],
                );
                return None;
            }
        };

        match confirm_candidate(connection.as_mut(), candidate) {
            Ok(Confirmation::Confirmed { .. }) => {
                logger.event(MonitorEvent::CandidateConfirmed, &[("primary", &params.to_string())]);
                Some(params)
            }
            Ok(rejection) => {
                logger.event(
                    MonitorEvent::CandidateRejected,
                    &[("host", host), ("reason", &rejection.to_string())],
                );
                None
            }
            Err(e) => {
                logger.event(
                    MonitorEvent::CandidateRejected,
                    &[("host", host), ("reason", &e.message)],
                );
                None
            }
        }
    }

    fn stop_service(&self, logger: &Logger) -> FailoverResult<()> {
        let service = self.collaborators.service;
        let result = service.is_running().and_then(|running| {
            if running {
                service.stop().map(|_| MonitorEvent::ServiceStopped)
            } else {
                Ok(MonitorEvent::ServiceAlreadyStopped)
            }
        });

        match result {
            Ok(event) => {
                logger.event(event, &[]);
                Ok(())
            }
            Err(e) => {
                logger.event(MonitorEvent::ServiceStopFailed, &[("reason", &e.message)]);
                Err(e)
            }
        }
    }

    /// Config rewrite → topology refresh → service start.
    fn commit(&mut self, logger: &Logger, new_primary: ConnectionParams) -> FailoverResult<FailoverOutcome> {
        if !self.state.permits_commit() {
            return Err(FailoverError::forbidden_transition(
                self.state.state_name(),
                "Committing",
            ));
        }

        let primary = new_primary.to_string();

        if let Err(e) = self.collaborators.primary_config.write(&new_primary) {
            logger.event(
                MonitorEvent::PrimaryConfigCommitFailed,
                &[("primary", &primary), ("reason", &e.message)],
            );
            self.advance(FailoverState::abandon)?;
            return Err(e);
        }
        logger.event(MonitorEvent::PrimaryConfigCommitted, &[("primary", &primary)]);

        // Does not gate the service start.
        match self.collaborators.probe.open(&new_primary) {
            Ok(Some(mut connection)) => {
                let _ = self.refresh_topology(logger, connection.as_mut());
            }
            Ok(None) => logger.event(
                MonitorEvent::TopologyRefreshFailed,
                &[("reason", "new primary did not accept a connection")],
            ),
            Err(e) => logger.event(MonitorEvent::TopologyRefreshFailed, &[("reason", &e.message)]),
        }

        if let Err(e) = self.collaborators.service.start() {
            logger.event(MonitorEvent::ServiceStartFailed, &[("reason", &e.message)]);
            self.advance(FailoverState::abandon)?;
            return Err(e);
        }
        logger.event(MonitorEvent::ServiceStarted, &[]);

        self.advance(FailoverState::complete_commit)?;
        logger.event(MonitorEvent::FailoverComplete, &[("primary", &primary)]);

        Ok(FailoverOutcome::Recovered(new_primary))
    }

    fn refresh_topology(&self, logger: &Logger, connection: &mut dyn RepmgrConnection) -> FailoverResult<()> {
        let host = connection.params().host.clone();
        match self.collaborators.topology.refresh(connection) {
            Ok(()) => {
                logger.event(MonitorEvent::TopologyRefreshed, &[("via", &host)]);
                Ok(())
            }
            Err(e) => {
                logger.event(
                    MonitorEvent::TopologyRefreshFailed,
                    &[("via", &host), ("code", e.kind.code()), ("reason", &e.message)],
                );
                Err(e)
            }
        }
    }

    fn advance<F>(&mut self, transition: F) -> FailoverResult<()>
    where
        F: FnOnce(FailoverState) -> FailoverResult<FailoverState>,
    {
        self.state = transition(std::mem::take(&mut self.state))?;
        Ok(())
    }
}
