//! PostgreSQL connections
//!
//! Blocking wrappers over `sqlx` connections driven by a private
//! current-thread tokio runtime. The failover cycle is strictly sequential,
//! so there is nothing to gain from running it inside an async executor.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tokio::runtime::{Builder, Runtime};

use super::conninfo::node_from_repmgr;
use crate::failover::{
    ConnectionParams, ConnectionProbe, FailoverError, FailoverResult, RepmgrConnection,
    TopologySnapshot,
};
use crate::observability::{Logger, MonitorEvent};

/// repmgr 4+ keeps members in `repmgr.nodes`; repmgr 3 used `repl_nodes`
/// in the cluster schema on the search path.
const REPMGR_NODE_TABLES: [&str; 2] = ["repmgr.nodes", "repl_nodes"];

const APPLICATION_NAME: &str = "pgha";

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens connections to cluster members.
#[derive(Clone)]
pub struct PgConnector {
    runtime: Arc<Runtime>,
    connect_timeout: Duration,
    logger: Logger,
}

impl PgConnector {
    pub fn new(connect_timeout: Duration, logger: Logger) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
            connect_timeout,
            logger,
        })
    }

    /// Connect to `params`.
    ///
    /// Refused, unreachable and timed-out connections are `Ok(None)` and
    /// logged. Only malformed parameters are errors.
    pub fn connect(&self, params: &ConnectionParams) -> FailoverResult<Option<PgSession>> {
        params.validate()?;

        let options = connect_options(params);
        let attempt = self.runtime.block_on(async {
            tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options)).await
        });

        let host = params.host.as_str();
        match attempt {
            Ok(Ok(connection)) => Ok(Some(PgSession {
                params: params.clone(),
                connection: Some(connection),
                runtime: Arc::clone(&self.runtime),
                logger: self.logger.clone(),
            })),
            Ok(Err(e)) => {
                self.logger.event(
                    MonitorEvent::ConnectionFailed,
                    &[("host", host), ("reason", &e.to_string())],
                );
                Ok(None)
            }
            Err(_) => {
                let timeout = format!("timed out after {}s", self.connect_timeout.as_secs());
                self.logger.event(
                    MonitorEvent::ConnectionFailed,
                    &[("host", host), ("reason", &timeout)],
                );
                Ok(None)
            }
        }
    }
}

impl ConnectionProbe for PgConnector {
    fn open(&self, params: &ConnectionParams) -> FailoverResult<Option<Box<dyn RepmgrConnection>>> {
        Ok(self
            .connect(params)?
            .map(|session| Box::new(session) as Box<dyn RepmgrConnection>))
    }
}

/// An open connection. Closed gracefully on drop.
pub struct PgSession {
    params: ConnectionParams,
    connection: Option<PgConnection>,
    runtime: Arc<Runtime>,
    logger: Logger,
}

impl PgSession {
    /// `SELECT pg_is_in_recovery()`
    pub fn is_in_recovery(&mut self) -> FailoverResult<bool> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| FailoverError::query_failed("connection already closed"))?;

        self.runtime
            .block_on(
                sqlx::query_scalar::<_, bool>("SELECT pg_is_in_recovery()")
                    .fetch_one(&mut *connection),
            )
            .map_err(|e| FailoverError::query_failed(format!("{}: {}", self.params.host, e)))
    }
}

impl RepmgrConnection for PgSession {
    fn params(&self) -> &ConnectionParams {
        &self.params
    }

    fn query_repmgr(&mut self) -> FailoverResult<TopologySnapshot> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| FailoverError::query_failed("connection already closed"))?;

        let rows = self
            .runtime
            .block_on(fetch_repmgr_nodes(connection))
            .map_err(|e| FailoverError::query_failed(format!("{}: {}", self.params.host, e)))?;

        let mut nodes = Vec::with_capacity(rows.len());
        for (role, conninfo, active) in rows {
            match node_from_repmgr(&role, &conninfo, active) {
                Ok(Some(node)) => nodes.push(node),
                Ok(None) => {}
                Err(e) => self.logger.event(
                    MonitorEvent::RepmgrRecordSkipped,
                    &[("type", &role), ("reason", &e.to_string())],
                ),
            }
        }

        Ok(TopologySnapshot::new(nodes))
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = self
                .runtime
                .block_on(tokio::time::timeout(CLOSE_TIMEOUT, connection.close()));
        }
    }
}

/// Rows of `(type, conninfo, active)` from whichever repmgr node table
/// exists. No table means no repmgr metadata: an empty result.
async fn fetch_repmgr_nodes(
    connection: &mut PgConnection,
) -> Result<Vec<(String, String, bool)>, sqlx::Error> {
    for table in REPMGR_NODE_TABLES {
        let found: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(table)
            .fetch_one(&mut *connection)
            .await?;

        if found.is_some() {
            let sql = format!("SELECT type, conninfo, active FROM {}", table);
            return sqlx::query_as::<_, (String, String, bool)>(&sql)
                .fetch_all(&mut *connection)
                .await;
        }
    }
    Ok(Vec::new())
}

fn connect_options(params: &ConnectionParams) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&params.host)
        .username(&params.user)
        .database(&params.dbname)
        .application_name(APPLICATION_NAME);
    if let Some(port) = params.port {
        options = options.port(port);
    }
    if let Some(ref password) = params.password {
        options = options.password(password);
    }
    options
}
