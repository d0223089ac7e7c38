//! Trait definitions with mockall annotations for testing
//!
//! Every external collaborator of the harness (process spawning, socket
//! ownership, signal delivery, the container engine and the load generator)
//! sits behind one of these traits so the core can be driven by mocks.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::core::registry::InstanceProcess;
use crate::error::HarnessResult;

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Port had no registry entry; nothing was signalled
    NotRegistered,
    /// Kill sequence ran and the entry was removed
    Stopped {
        /// Listening processes found by socket-owner lookup and signalled
        listeners_killed: usize,
        /// Whether the recorded child was reaped within the stop wait
        reaped: bool,
    },
}

/// Exit information of a finished load-generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl LoadOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Container to create for the coordination store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// (host, container) port pairs
    pub published_ports: Vec<(u16, u16)>,
    pub env: BTreeMap<String, String>,
}

/// Spawns one service instance bound to a port
#[mockall::automock]
#[async_trait::async_trait]
pub trait InstanceLauncher: Send + Sync {
    /// Spawn the service configured for `port`, detached in its own process
    /// group, with output appended to the port's log sink
    async fn launch(&self, port: u16) -> HarnessResult<InstanceProcess>;
}

/// Resolves which processes hold a TCP port in LISTEN state
#[mockall::automock]
#[async_trait::async_trait]
pub trait PortOwnerLookup: Send + Sync {
    /// PIDs listening on `port`; empty when nothing listens
    async fn listening_pids(&self, port: u16) -> HarnessResult<Vec<u32>>;

    /// Command line of `pid`, for log records; `None` when it cannot be read
    async fn process_command(&self, pid: u32) -> Option<String>;
}

/// Delivers non-catchable termination signals
#[mockall::automock]
pub trait Signaller: Send + Sync {
    /// SIGKILL a single process
    fn kill(&self, pid: u32) -> HarnessResult<()>;

    /// SIGKILL every process in a process group
    fn kill_group(&self, pgid: u32) -> HarnessResult<()>;
}

/// Container engine operations used to provision the coordination store
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start a container in the background
    async fn run_detached(&self, spec: &ContainerSpec) -> HarnessResult<()>;

    /// Remove a container by name, stopping it first; missing containers are not an error
    async fn force_remove(&self, name: &str) -> HarnessResult<()>;

    /// Whether a container with exactly this name exists (running or not)
    async fn exists(&self, name: &str) -> HarnessResult<bool>;
}

/// External load-generation run
#[mockall::automock]
#[async_trait::async_trait]
pub trait LoadGenerator: Send + Sync {
    /// Launch the load generator and block until it exits
    async fn run(&self) -> HarnessResult<LoadOutcome>;
}

/// Start/stop access to the instance fleet
///
/// Implemented by the supervisor; the fault injector and the run coordinator
/// only ever see the fleet through this trait.
#[mockall::automock]
#[async_trait::async_trait]
pub trait InstanceControl: Send + Sync {
    /// Launch an instance on `port` and register it
    async fn start(&self, port: u16) -> HarnessResult<()>;

    /// Forcefully stop the instance on `port`; no-op when unregistered
    async fn stop(&self, port: u16) -> HarnessResult<StopOutcome>;

    /// Stop every registered instance, returning the ports that were stopped
    async fn stop_all(&self) -> Vec<u16>;

    /// Ports currently believed live, ascending
    async fn live_ports(&self) -> Vec<u16>;

    /// Kill unregistered listeners left on `port` by an earlier run
    async fn reclaim_port(&self, port: u16) -> usize;
}
