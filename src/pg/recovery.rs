//! Recovery status probe

use crate::failover::{ConnectionParams, RecoveryStatusChecker};
use crate::observability::{Logger, MonitorEvent};

use super::connection::PgConnector;

/// Asks a candidate directly with `pg_is_in_recovery()`.
///
/// Any failure to answer counts as "in recovery" so the candidate is
/// skipped for this attempt.
pub struct PgRecoveryChecker {
    connector: PgConnector,
    logger: Logger,
}

impl PgRecoveryChecker {
    pub fn new(connector: PgConnector, logger: Logger) -> Self {
        Self { connector, logger }
    }
}

impl RecoveryStatusChecker for PgRecoveryChecker {
    fn is_in_recovery(&self, params: &ConnectionParams) -> bool {
        let host = params.host.as_str();
        let mut session = match self.connector.connect(params) {
            Ok(Some(session)) => session,
            Ok(None) => return true,
            Err(e) => {
                self.logger.event(
                    MonitorEvent::RecoveryCheckFailed,
                    &[("host", host), ("reason", &e.message)],
                );
                return true;
            }
        };

        match session.is_in_recovery() {
            Ok(in_recovery) => in_recovery,
            Err(e) => {
                self.logger.event(
                    MonitorEvent::RecoveryCheckFailed,
                    &[("host", host), ("reason", &e.message)],
                );
                true
            }
        }
    }
}
