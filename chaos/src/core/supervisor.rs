//! Instance supervisor: start and forcefully stop fleet instances
//!
//! Stopping never tries a graceful shutdown. The process currently holding
//! the port is located through socket-owner lookup and SIGKILLed (the
//! recorded pid may only be a wrapper such as `go run`), then the recorded
//! process group is SIGKILLed as well. Lookup and signal failures are
//! swallowed: a process that cannot be found is treated as already dead.

use async_trait::async_trait;
use shared::{actor_debug, actor_error, actor_info, actor_warn, Actor};
use std::time::Duration;
use tokio::time::timeout;

use crate::core::registry::InstanceRegistry;
use crate::error::HarnessResult;
use crate::traits::{InstanceControl, InstanceLauncher, PortOwnerLookup, Signaller, StopOutcome};

/// Default bound on waiting for a killed instance to be reaped
pub const DEFAULT_STOP_WAIT: Duration = Duration::from_secs(1);

pub struct Supervisor<L, P, K>
where
    L: InstanceLauncher,
    P: PortOwnerLookup,
    K: Signaller,
{
    launcher: L,
    lookup: P,
    signaller: K,
    registry: InstanceRegistry,
    stop_wait: Duration,
}

impl<L, P, K> Supervisor<L, P, K>
where
    L: InstanceLauncher,
    P: PortOwnerLookup,
    K: Signaller,
{
    pub fn new(launcher: L, lookup: P, signaller: K, registry: InstanceRegistry) -> Self {
        Self {
            launcher,
            lookup,
            signaller,
            registry,
            stop_wait: DEFAULT_STOP_WAIT,
        }
    }

    /// Configure the reap wait (fluent API)
    pub fn with_stop_wait(mut self, stop_wait: Duration) -> Self {
        self.stop_wait = stop_wait;
        self
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Pids listening on `port`, minus the harness itself. Lookup failures read as "none".
    async fn listener_pids(&self, port: u16) -> Vec<u32> {
        let pids = match self.lookup.listening_pids(port).await {
            Ok(pids) => pids,
            Err(e) => {
                actor_debug!(Actor::Supervisor, "Socket owner lookup for port {} failed, treating as dead: {}", port, e);
                return Vec::new();
            }
        };
        let own_pid = std::process::id();
        pids.into_iter().filter(|pid| *pid != own_pid).collect()
    }

    fn kill_listener(&self, port: u16, pid: u32) -> bool {
        match self.signaller.kill(pid) {
            Ok(()) => true,
            Err(e) => {
                actor_debug!(Actor::Supervisor, "Kill of listener {} on port {} ignored: {}", pid, port, e);
                false
            }
        }
    }

    /// SIGKILL every process listening on `port` except the harness itself
    async fn kill_listeners(&self, port: u16) -> usize {
        let mut killed = 0;
        for pid in self.listener_pids(port).await {
            if self.kill_listener(port, pid) {
                killed += 1;
            }
        }
        killed
    }
}

#[async_trait]
impl<L, P, K> InstanceControl for Supervisor<L, P, K>
where
    L: InstanceLauncher,
    P: PortOwnerLookup,
    K: Signaller,
{
    async fn start(&self, port: u16) -> HarnessResult<()> {
        if self.registry.contains(port).await {
            actor_warn!(Actor::Supervisor, "⚠️ Instance on port {} already registered, not starting another", port);
            return Ok(());
        }

        actor_info!(Actor::Supervisor, "🚀 Starting instance on port {}", port);
        let process = match self.launcher.launch(port).await {
            Ok(process) => process,
            Err(e) => {
                actor_error!(Actor::Supervisor, "❌ Failed to start instance on port {}: {}", port, e);
                return Err(e);
            }
        };

        let pid = process.pid;
        if let Err(mut rejected) = self.registry.insert_if_absent(port, process).await {
            // Another start registered the port while we were spawning
            let _ = self.signaller.kill_group(rejected.pgid);
            if let Some(mut child) = rejected.child.take() {
                let _ = timeout(self.stop_wait, child.wait()).await;
            }
            actor_warn!(Actor::Supervisor, "⚠️ Port {} registered concurrently, discarded pid {}", port, pid);
            return Ok(());
        }

        actor_debug!(Actor::Supervisor, "Instance on port {} running as pid {}", port, pid);
        Ok(())
    }

    async fn stop(&self, port: u16) -> HarnessResult<StopOutcome> {
        let Some((pid, pgid)) = self.registry.pids(port).await else {
            actor_debug!(Actor::Supervisor, "Stop on port {} ignored: not registered", port);
            return Ok(StopOutcome::NotRegistered);
        };

        actor_info!(Actor::Supervisor, "💀 Killing instance on port {} (pid {})", port, pid);

        let listeners_killed = self.kill_listeners(port).await;

        if let Err(e) = self.signaller.kill_group(pgid) {
            actor_debug!(Actor::Supervisor, "Kill of process group {} ignored: {}", pgid, e);
        }

        let reaped = match self.registry.take_child(port).await {
            Some(mut child) => match timeout(self.stop_wait, child.wait()).await {
                Ok(Ok(status)) => {
                    actor_debug!(Actor::Supervisor, "Instance on port {} exited: {}", port, status);
                    true
                }
                Ok(Err(e)) => {
                    actor_debug!(Actor::Supervisor, "Wait on pid {} failed: {}", pid, e);
                    false
                }
                Err(_) => {
                    actor_debug!(Actor::Supervisor, "Pid {} not reaped within {:?}", pid, self.stop_wait);
                    false
                }
            },
            None => false,
        };

        self.registry.remove(port).await;

        Ok(StopOutcome::Stopped {
            listeners_killed,
            reaped,
        })
    }

    async fn stop_all(&self) -> Vec<u16> {
        let mut stopped = Vec::new();
        for port in self.registry.ports().await {
            if let Ok(StopOutcome::Stopped { .. }) = self.stop(port).await {
                stopped.push(port);
            }
        }
        stopped
    }

    async fn live_ports(&self) -> Vec<u16> {
        self.registry.ports().await
    }

    async fn reclaim_port(&self, port: u16) -> usize {
        if self.registry.contains(port).await {
            return 0;
        }
        // Anything listening here is not ours; name it before killing it
        let mut killed = 0;
        for pid in self.listener_pids(port).await {
            let command = self
                .lookup
                .process_command(pid)
                .await
                .unwrap_or_else(|| "<unknown>".to_string());
            actor_warn!(Actor::Supervisor, "🧹 Killing unregistered listener on port {}: pid {} ({})", port, pid, command);
            if self.kill_listener(port, pid) {
                killed += 1;
            }
        }
        killed
    }
}
