//! PostgreSQL Adapters
//!
//! Production implementations of `ConnectionProbe`, `RepmgrConnection` and
//! `RecoveryStatusChecker` on top of `sqlx`.

mod connection;
mod conninfo;
mod recovery;

pub use connection::{PgConnector, PgSession};
pub use conninfo::{node_from_repmgr, parse_conninfo, ConninfoError};
pub use recovery::PgRecoveryChecker;
