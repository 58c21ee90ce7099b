//! Test doubles for the failover collaborators
//!
//! Every double records its side effects into one shared journal so tests
//! can assert on global ordering (stop → config write → start) and on
//! connection release.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pgha::failover::{
    ClusterNode, Collaborators, ConnectionParams, ConnectionProbe, FailoverError,
    FailoverPolicy, FailoverResult, NodeRole, PrimaryConfigStore, RecoveryStatusChecker,
    RepmgrConnection, ServiceController, TopologySnapshot, TopologyStore,
};

pub const USER: &str = "root";
pub const DBNAME: &str = "vmdb_production";
pub const PASSWORD: &str = "smartvm";

/// Observable side effects, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Connect(String),
    Close(String),
    RecoveryCheck(String),
    RepmgrQuery(String),
    TopologyRefresh(String),
    ConfigWrite(String),
    ServiceStop,
    ServiceStart,
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Effect>>>);

impl Journal {
    pub fn record(&self, effect: Effect) {
        self.0.lock().unwrap().push(effect);
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, effect: &Effect) -> usize {
        self.effects().iter().filter(|e| *e == effect).count()
    }

    pub fn position(&self, effect: &Effect) -> Option<usize> {
        self.effects().iter().position(|e| e == effect)
    }

    /// Side effects on the application and its config only.
    pub fn mutations(&self) -> Vec<Effect> {
        self.effects()
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    Effect::ServiceStop | Effect::ServiceStart | Effect::ConfigWrite(_)
                )
            })
            .collect()
    }

    /// Every opened connection has been dropped.
    pub fn all_connections_released(&self) -> bool {
        let effects = self.effects();
        let opened = effects.iter().filter(|e| matches!(e, Effect::Connect(_))).count();
        let closed = effects.iter().filter(|e| matches!(e, Effect::Close(_))).count();
        opened == closed
    }
}

pub fn master(host: &str) -> ClusterNode {
    ClusterNode::new(NodeRole::Master, true, host, USER, DBNAME)
}

pub fn standby(host: &str) -> ClusterNode {
    ClusterNode::new(NodeRole::Standby, true, host, USER, DBNAME)
}

pub fn inactive(mut node: ClusterNode) -> ClusterNode {
    node.active = false;
    node
}

pub fn snapshot(nodes: Vec<ClusterNode>) -> TopologySnapshot {
    TopologySnapshot::new(nodes)
}

pub fn params(host: &str) -> ConnectionParams {
    ConnectionParams::new(host, USER, DBNAME).with_password(PASSWORD)
}

/// No waiting between attempts.
pub fn policy(max_attempts: u32) -> FailoverPolicy {
    FailoverPolicy::new(max_attempts, Duration::ZERO).unwrap()
}

#[derive(Default)]
struct ClusterState {
    reachable: HashSet<String>,
    views: HashMap<String, VecDeque<TopologySnapshot>>,
    recovery: HashMap<String, VecDeque<bool>>,
    failing_queries: HashSet<String>,
}

/// Pops the next scripted value; the last one repeats forever.
fn next_scripted<T: Clone>(queue: Option<&mut VecDeque<T>>) -> Option<T> {
    let queue = queue?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

/// Scripted cluster: which hosts accept connections, what repmgr reports
/// through each host, and each host's recovery status per attempt.
#[derive(Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
    journal: Journal,
}

impl FakeCluster {
    pub fn new(journal: Journal) -> Self {
        Self {
            state: Arc::default(),
            journal,
        }
    }

    pub fn reachable(&self, host: &str) {
        self.state.lock().unwrap().reachable.insert(host.to_string());
    }

    /// Queue what repmgr reports through a connection to `host`.
    pub fn view_through(&self, host: &str, view: TopologySnapshot) {
        self.state
            .lock()
            .unwrap()
            .views
            .entry(host.to_string())
            .or_default()
            .push_back(view);
    }

    /// Recovery status of `host` for successive checks.
    pub fn recovery(&self, host: &str, statuses: &[bool]) {
        self.state
            .lock()
            .unwrap()
            .recovery
            .insert(host.to_string(), statuses.iter().copied().collect());
    }

    pub fn fail_queries_through(&self, host: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_queries
            .insert(host.to_string());
    }
}

impl ConnectionProbe for FakeCluster {
    fn open(&self, params: &ConnectionParams) -> FailoverResult<Option<Box<dyn RepmgrConnection>>> {
        params.validate()?;

        if !self.state.lock().unwrap().reachable.contains(&params.host) {
            return Ok(None);
        }

        self.journal.record(Effect::Connect(params.host.clone()));
        Ok(Some(Box::new(FakeConnection {
            params: params.clone(),
            cluster: self.clone(),
        })))
    }
}

impl RecoveryStatusChecker for FakeCluster {
    fn is_in_recovery(&self, params: &ConnectionParams) -> bool {
        self.journal.record(Effect::RecoveryCheck(params.host.clone()));

        let mut state = self.state.lock().unwrap();
        if !state.reachable.contains(&params.host) {
            return true;
        }
        next_scripted(state.recovery.get_mut(&params.host)).unwrap_or(false)
    }
}

pub struct FakeConnection {
    params: ConnectionParams,
    cluster: FakeCluster,
}

impl RepmgrConnection for FakeConnection {
    fn params(&self) -> &ConnectionParams {
        &self.params
    }

    fn query_repmgr(&mut self) -> FailoverResult<TopologySnapshot> {
        let host = self.params.host.clone();
        self.cluster.journal.record(Effect::RepmgrQuery(host.clone()));

        let mut state = self.cluster.state.lock().unwrap();
        if state.failing_queries.contains(&host) {
            return Err(FailoverError::query_failed(format!("{}: relation does not exist", host)));
        }
        Ok(next_scripted(state.views.get_mut(&host)).unwrap_or_default())
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.cluster.journal.record(Effect::Close(self.params.host.clone()));
    }
}

/// In-memory topology cache.
pub struct MemoryTopology {
    cached: Mutex<TopologySnapshot>,
    fail_reads: bool,
    fail_refresh: bool,
    journal: Journal,
}

impl MemoryTopology {
    pub fn new(journal: Journal, cached: TopologySnapshot) -> Self {
        Self {
            cached: Mutex::new(cached),
            fail_reads: false,
            fail_refresh: false,
            journal,
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub fn cached(&self) -> TopologySnapshot {
        self.cached.lock().unwrap().clone()
    }
}

impl TopologyStore for MemoryTopology {
    fn active_members(&self) -> FailoverResult<Vec<ClusterNode>> {
        if self.fail_reads {
            return Err(FailoverError::store_io("failover_databases.yml: permission denied"));
        }
        Ok(self.cached.lock().unwrap().active_members())
    }

    fn refresh(&self, connection: &mut dyn RepmgrConnection) -> FailoverResult<()> {
        self.journal
            .record(Effect::TopologyRefresh(connection.params().host.clone()));
        if self.fail_refresh {
            return Err(FailoverError::store_io("failover_databases.yml: disk full"));
        }

        let live = connection.query_repmgr()?;
        if !live.is_empty() {
            *self.cached.lock().unwrap() = live;
        }
        Ok(())
    }
}

/// In-memory primary pointer.
pub struct MemoryPrimaryConfig {
    current: Mutex<ConnectionParams>,
    fail_writes: bool,
    journal: Journal,
}

impl MemoryPrimaryConfig {
    pub fn new(journal: Journal, current: ConnectionParams) -> Self {
        Self {
            current: Mutex::new(current),
            fail_writes: false,
            journal,
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn current(&self) -> ConnectionParams {
        self.current.lock().unwrap().clone()
    }
}

impl PrimaryConfigStore for MemoryPrimaryConfig {
    fn read(&self) -> FailoverResult<ConnectionParams> {
        Ok(self.current())
    }

    fn write(&self, params: &ConnectionParams) -> FailoverResult<()> {
        if self.fail_writes {
            return Err(FailoverError::store_io("database.yml: read-only file system"));
        }
        self.journal.record(Effect::ConfigWrite(params.host.clone()));
        *self.current.lock().unwrap() = params.clone();
        Ok(())
    }
}

/// Application service that tracks whether it is running.
pub struct FakeService {
    running: Mutex<bool>,
    fail_stop: bool,
    fail_start: bool,
    journal: Journal,
}

impl FakeService {
    pub fn new(journal: Journal, running: bool) -> Self {
        Self {
            running: Mutex::new(running),
            fail_stop: false,
            fail_start: false,
            journal,
        }
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn running(&self) -> bool {
        *self.running.lock().unwrap()
    }
}

impl ServiceController for FakeService {
    fn is_running(&self) -> FailoverResult<bool> {
        Ok(self.running())
    }

    fn stop(&self) -> FailoverResult<()> {
        if self.fail_stop {
            return Err(FailoverError::service_control("systemctl stop evmserverd exited with 1"));
        }
        self.journal.record(Effect::ServiceStop);
        *self.running.lock().unwrap() = false;
        Ok(())
    }

    fn start(&self) -> FailoverResult<()> {
        if self.fail_start {
            return Err(FailoverError::service_control("systemctl start evmserverd exited with 1"));
        }
        self.journal.record(Effect::ServiceStart);
        *self.running.lock().unwrap() = true;
        Ok(())
    }
}

/// One scripted environment with all doubles sharing a journal.
pub struct Harness {
    pub journal: Journal,
    pub cluster: FakeCluster,
    pub topology: MemoryTopology,
    pub config: MemoryPrimaryConfig,
    pub service: FakeService,
}

impl Harness {
    /// Primary `primary` configured, `cached` in the topology cache,
    /// service running, nothing reachable yet.
    pub fn new(primary: &str, cached: Vec<ClusterNode>) -> Self {
        let journal = Journal::default();
        Self {
            cluster: FakeCluster::new(journal.clone()),
            topology: MemoryTopology::new(journal.clone(), snapshot(cached)),
            config: MemoryPrimaryConfig::new(journal.clone(), params(primary)),
            service: FakeService::new(journal.clone(), true),
            journal,
        }
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            probe: &self.cluster,
            recovery: &self.cluster,
            topology: &self.topology,
            primary_config: &self.config,
            service: &self.service,
        }
    }
}
