//! Cached cluster topology (`failover_databases.yml`)
//!
//! The last non-empty repmgr topology seen through a live connection,
//! stored as a YAML list of `{type, active, host, user, dbname}` records.
//! The candidate search reads this cache only; it never queries the
//! cluster for membership mid-failover.

use std::path::{Path, PathBuf};

use super::atomic::AtomicFile;
use super::errors::{StoreError, StoreResult};
use crate::failover::{
    ClusterNode, FailoverResult, RepmgrConnection, TopologySnapshot, TopologyStore,
};

/// File-backed topology store.
#[derive(Debug, Clone)]
pub struct FailoverDatabasesYml {
    file: AtomicFile,
}

impl FailoverDatabasesYml {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: AtomicFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Cached snapshot. A missing file is an empty topology.
    pub fn load(&self) -> StoreResult<TopologySnapshot> {
        let Some(content) = self.file.read()? else {
            return Ok(TopologySnapshot::default());
        };
        if content.trim().is_empty() {
            return Ok(TopologySnapshot::default());
        }

        serde_yaml::from_str(&content).map_err(|e| StoreError::Malformed {
            path: self.path().to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Persist `snapshot`. Empty snapshots are not written so a single
    /// empty query never erases the known topology. Returns whether the
    /// file was written.
    pub fn store(&self, snapshot: &TopologySnapshot) -> StoreResult<bool> {
        if snapshot.is_empty() {
            return Ok(false);
        }
        let content = serde_yaml::to_string(snapshot)?;
        self.file.write(&content)?;
        Ok(true)
    }

    /// Query repmgr through `connection` and persist the result.
    pub fn update_from(&self, connection: &mut dyn RepmgrConnection) -> StoreResult<bool> {
        let snapshot = connection
            .query_repmgr()
            .map_err(|e| StoreError::Query(e.message))?;
        self.store(&snapshot)
    }
}

impl TopologyStore for FailoverDatabasesYml {
    fn active_members(&self) -> FailoverResult<Vec<ClusterNode>> {
        Ok(self.load()?.active_members())
    }

    fn refresh(&self, connection: &mut dyn RepmgrConnection) -> FailoverResult<()> {
        self.update_from(connection)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::{ConnectionParams, FailoverError, NodeRole};
    use std::fs;
    use tempfile::TempDir;

    struct StaticConnection {
        params: ConnectionParams,
        result: FailoverResult<TopologySnapshot>,
    }

    impl RepmgrConnection for StaticConnection {
        fn params(&self) -> &ConnectionParams {
            &self.params
        }

        fn query_repmgr(&mut self) -> FailoverResult<TopologySnapshot> {
            self.result.clone()
        }
    }

    fn connection(result: FailoverResult<TopologySnapshot>) -> StaticConnection {
        StaticConnection {
            params: ConnectionParams::new("203.0.113.1", "root", "vmdb_test"),
            result,
        }
    }

    fn cluster() -> TopologySnapshot {
        TopologySnapshot::new(vec![
            ClusterNode::new(NodeRole::Master, true, "203.0.113.1", "root", "vmdb_test"),
            ClusterNode::new(NodeRole::Standby, true, "203.0.113.2", "root", "vmdb_test"),
            ClusterNode::new(NodeRole::Standby, false, "203.0.113.3", "root", "vmdb_test"),
        ])
    }

    #[test]
    fn test_missing_file_is_empty_topology() {
        let tmp = TempDir::new().unwrap();
        let store = FailoverDatabasesYml::new(tmp.path().join("failover_databases.yml"));

        assert!(store.load().unwrap().is_empty());
        assert!(store.active_members().unwrap().is_empty());
    }

    #[test]
    fn test_refresh_persists_query_result() {
        let tmp = TempDir::new().unwrap();
        let store = FailoverDatabasesYml::new(tmp.path().join("failover_databases.yml"));

        store.refresh(&mut connection(Ok(cluster()))).unwrap();

        assert_eq!(store.load().unwrap(), cluster());
        let hosts: Vec<String> = store
            .active_members()
            .unwrap()
            .into_iter()
            .map(|n| n.host)
            .collect();
        assert_eq!(hosts, vec!["203.0.113.1", "203.0.113.2"]);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("failover_databases.yml");
        let store = FailoverDatabasesYml::new(&path);

        store.refresh(&mut connection(Ok(cluster()))).unwrap();
        let first = fs::read(&path).unwrap();
        store.refresh(&mut connection(Ok(cluster()))).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_query_keeps_cache() {
        let tmp = TempDir::new().unwrap();
        let store = FailoverDatabasesYml::new(tmp.path().join("failover_databases.yml"));
        store.refresh(&mut connection(Ok(cluster()))).unwrap();

        let written = store
            .update_from(&mut connection(Ok(TopologySnapshot::default())))
            .unwrap();

        assert!(!written);
        assert_eq!(store.load().unwrap(), cluster());
    }

    #[test]
    fn test_query_failure_is_store_error() {
        let tmp = TempDir::new().unwrap();
        let store = FailoverDatabasesYml::new(tmp.path().join("failover_databases.yml"));

        let err = store
            .refresh(&mut connection(Err(FailoverError::query_failed("timeout"))))
            .unwrap_err();

        assert!(!err.is_configuration());
        assert!(err.message.contains("timeout"));
    }

    #[test]
    fn test_malformed_cache_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("failover_databases.yml");
        fs::write(&path, "- type: leader\n  host: x\n").unwrap();

        let store = FailoverDatabasesYml::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));
    }
}
