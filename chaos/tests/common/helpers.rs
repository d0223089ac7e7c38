//! Test helpers, fakes and builder patterns for chaos harness tests

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use chaos::config::{HarnessConfig, HarnessConfigBuilder};
use chaos::core::{CoordinationStore, InstanceRegistry, RunCoordinator, Supervisor};
use chaos::services::{CommandInstanceLauncher, CommandLoadGenerator, LsofPortOwnerLookup, NixSignaller};
use chaos::traits::{ContainerRuntime, ContainerSpec, InstanceControl, MockPortOwnerLookup, PortOwnerLookup, StopOutcome};
use chaos::{HarnessError, HarnessResult};

use super::fixtures::TestFixtures;

/// Container engine kept in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryContainerRuntime {
    state: Arc<Mutex<RuntimeState>>,
}

#[derive(Debug, Default)]
struct RuntimeState {
    containers: BTreeMap<String, ContainerSpec>,
    fail_run: bool,
    history: Vec<String>,
}

impl InMemoryContainerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend a container was left behind by an earlier run
    pub fn with_stale(self, name: &str) -> Self {
        self.state.lock().unwrap().containers.insert(
            name.to_string(),
            ContainerSpec {
                name: name.to_string(),
                image: "stale".to_string(),
                published_ports: Vec::new(),
                env: BTreeMap::new(),
            },
        );
        self
    }

    /// Make every `run_detached` fail as if the daemon were down
    pub fn failing(self) -> Self {
        self.state.lock().unwrap().fail_run = true;
        self
    }

    pub fn containers(&self) -> Vec<String> {
        self.state.lock().unwrap().containers.keys().cloned().collect()
    }

    pub fn history(&self) -> Vec<String> {
        self.state.lock().unwrap().history.clone()
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryContainerRuntime {
    async fn run_detached(&self, spec: &ContainerSpec) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        state.history.push(format!("run {}", spec.name));
        if state.fail_run {
            return Err(HarnessError::ContainerCommandFailed {
                command: format!("docker run --name {}", spec.name),
                stderr: "Cannot connect to the Docker daemon".to_string(),
            });
        }
        if state.containers.contains_key(&spec.name) {
            return Err(HarnessError::ContainerCommandFailed {
                command: format!("docker run --name {}", spec.name),
                stderr: "Conflict. The container name is already in use".to_string(),
            });
        }
        state.containers.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn force_remove(&self, name: &str) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        state.history.push(format!("rm {name}"));
        state.containers.remove(name);
        Ok(())
    }

    async fn exists(&self, name: &str) -> HarnessResult<bool> {
        Ok(self.state.lock().unwrap().containers.contains_key(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetOp {
    Start(u16),
    Stop(u16),
}

/// In-memory fleet: a set of live ports plus an operation log
#[derive(Debug, Clone, Default)]
pub struct FakeFleet {
    state: Arc<Mutex<FleetState>>,
}

#[derive(Debug, Default)]
struct FleetState {
    live: BTreeSet<u16>,
    failing_starts: BTreeSet<u16>,
    ops: Vec<FleetOp>,
}

impl FakeFleet {
    pub fn with_live<I: IntoIterator<Item = u16>>(ports: I) -> Self {
        let fleet = Self::default();
        fleet.state.lock().unwrap().live.extend(ports);
        fleet
    }

    /// Starts on `port` fail with a spawn error
    pub fn failing_start(self, port: u16) -> Self {
        self.state.lock().unwrap().failing_starts.insert(port);
        self
    }

    pub fn ops(&self) -> Vec<FleetOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn live(&self) -> Vec<u16> {
        self.state.lock().unwrap().live.iter().copied().collect()
    }
}

#[async_trait]
impl InstanceControl for FakeFleet {
    async fn start(&self, port: u16) -> HarnessResult<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(FleetOp::Start(port));
        if state.failing_starts.contains(&port) {
            return Err(HarnessError::SpawnFailed {
                port,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "binary missing"),
            });
        }
        state.live.insert(port);
        Ok(())
    }

    async fn stop(&self, port: u16) -> HarnessResult<StopOutcome> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(FleetOp::Stop(port));
        if state.live.remove(&port) {
            Ok(StopOutcome::Stopped {
                listeners_killed: 1,
                reaped: true,
            })
        } else {
            Ok(StopOutcome::NotRegistered)
        }
    }

    async fn stop_all(&self) -> Vec<u16> {
        let mut state = self.state.lock().unwrap();
        let stopped: Vec<u16> = state.live.iter().copied().collect();
        for &port in &stopped {
            state.ops.push(FleetOp::Stop(port));
        }
        state.live.clear();
        stopped
    }

    async fn live_ports(&self) -> Vec<u16> {
        self.live()
    }

    async fn reclaim_port(&self, _port: u16) -> usize {
        0
    }
}

pub type TestSupervisor = Supervisor<CommandInstanceLauncher, MockPortOwnerLookup, NixSignaller>;
pub type TestCoordinator = RunCoordinator<TestSupervisor, InMemoryContainerRuntime, CommandLoadGenerator>;

/// Coordinator over real `sh` instances, an in-memory store and a shell load generator
pub struct TestHarness {
    pub coordinator: TestCoordinator,
    pub registry: InstanceRegistry,
    pub runtime: InMemoryContainerRuntime,
    pub config: HarnessConfig,
    pub log_dir: TempDir,
}

/// Builder pattern for test harnesses with sensible defaults
pub struct HarnessBuilder {
    log_dir: TempDir,
    config: HarnessConfigBuilder,
    runtime: InMemoryContainerRuntime,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        let log_dir = tempfile::tempdir().unwrap();
        let config = HarnessConfigBuilder::from_config(TestFixtures::harness_config(log_dir.path()));
        Self {
            log_dir,
            config,
            runtime: InMemoryContainerRuntime::new(),
        }
    }

    /// Adjust the configuration with a setup function
    pub fn with_config<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(HarnessConfigBuilder) -> HarnessConfigBuilder,
    {
        self.config = setup(self.config);
        self
    }

    pub fn with_runtime(mut self, runtime: InMemoryContainerRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn build(self) -> TestHarness {
        let config = self.config.build();
        config.validate().unwrap();

        // `sh` stand-ins never listen, so socket-owner lookup finds nothing
        let mut lookup = MockPortOwnerLookup::new();
        lookup.expect_listening_pids().returning(|_| Ok(Vec::new()));

        let registry = InstanceRegistry::new();
        let launcher = CommandInstanceLauncher::new(
            config.instances.command.clone(),
            config.store.address(),
            config.instances.log_dir.clone(),
        );
        let supervisor = Supervisor::new(launcher, lookup, NixSignaller, registry.clone())
            .with_stop_wait(config.instances.stop_wait());

        let store = CoordinationStore::new(self.runtime.clone(), config.store.clone());
        let load = CommandLoadGenerator::new(&config.load, config.store.address());
        let coordinator = RunCoordinator::new(Arc::new(supervisor), store, load, config.clone());

        TestHarness {
            coordinator,
            registry,
            runtime: self.runtime,
            config,
            log_dir: self.log_dir,
        }
    }
}

/// Common assertions and process probes
pub struct TestHelpers;

impl TestHelpers {
    /// Whether `pid` still names a live (or unreaped) process
    pub fn pid_alive(pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    /// Whether every named tool resolves on `PATH`
    pub fn tools_available(tools: &[&str]) -> bool {
        tools.iter().all(|tool| {
            std::process::Command::new("sh")
                .args(["-c", &format!("command -v {tool}")])
                .stdout(std::process::Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    /// A TCP port nothing is listening on right now
    pub fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Poll the real socket-owner lookup until `done` holds, for at most 10s
    pub async fn wait_for_listeners<F>(lookup: &LsofPortOwnerLookup, port: u16, done: F) -> Vec<u32>
    where
        F: Fn(&[u32]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let pids = lookup.listening_pids(port).await.unwrap_or_default();
            if done(&pids) || tokio::time::Instant::now() >= deadline {
                return pids;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Assert the registry is empty and the store container is gone
    pub async fn assert_torn_down(harness: &TestHarness) {
        assert!(harness.registry.is_empty().await, "registry not empty: {:?}", harness.registry.ports().await);
        assert!(
            !harness.runtime.containers().contains(&TestFixtures::STORE_NAME.to_string()),
            "store container still present"
        );
    }

    /// Every configured port has a log file
    pub fn assert_logs_present(harness: &TestHarness) {
        for port in &harness.config.instances.ports {
            let path = harness.log_dir.path().join(format!("server_{port}.log"));
            assert!(path.exists(), "missing log {}", path.display());
        }
    }
}
