//! pgha - failover monitor for repmgr-managed PostgreSQL clusters
//!
//! Watches the primary an application is configured to use. When it stops
//! answering, stops the application, waits for repmgr to promote a standby,
//! repoints the application's database config at it and starts the
//! application again.

pub mod cli;
pub mod failover;
pub mod observability;
pub mod pg;
pub mod service;
pub mod store;
