//! Run coordinator: bootstrap, chaos under load, guaranteed teardown
//!
//! Ordering of one run:
//! reclaim ports → provision store → start instances → settle →
//! spawn injector → run load → cancel → join injector →
//! stop all instances → destroy store → verify.
//!
//! Everything up to the cancel races the interrupt future. Teardown runs on
//! every path, and a bootstrap error is only returned once it has finished.

use chrono::{DateTime, Utc};
use shared::logging::{log_error, log_progress, log_shutdown, log_startup, log_success};
use shared::{actor_error, actor_info, actor_warn, Actor};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::core::fault_injector::{FaultInjector, InjectorReport};
use crate::core::signal::RunSignal;
use crate::core::store::CoordinationStore;
use crate::error::{HarnessError, HarnessResult};
use crate::traits::{ContainerRuntime, InstanceControl, LoadGenerator, LoadOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Load generator ran to completion (whatever its exit code)
    Completed,
    /// The interrupt future resolved first
    Interrupted,
    /// Bootstrap or load launch failed
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub load: Option<LoadOutcome>,
    pub injector: Option<InjectorReport>,
    /// Ports stopped during teardown
    pub stopped_ports: Vec<u16>,
    /// Store container confirmed absent after teardown
    pub store_removed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Process exit code for the binary; interruption counts as success
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Completed | RunOutcome::Interrupted => 0,
            RunOutcome::Failed(_) => 1,
        }
    }
}

/// Background tasks of one run. Each keeps running if the driving future is
/// dropped, and teardown joins them before stopping instances.
#[derive(Default)]
struct RunTasks {
    starter: Option<JoinHandle<()>>,
    injector: Option<JoinHandle<InjectorReport>>,
}

struct TeardownSummary {
    injector: Option<InjectorReport>,
    stopped_ports: Vec<u16>,
    store_removed: bool,
}

pub struct RunCoordinator<C, R, G>
where
    C: InstanceControl + 'static,
    R: ContainerRuntime,
    G: LoadGenerator,
{
    control: Arc<C>,
    store: CoordinationStore<R>,
    load: G,
    config: HarnessConfig,
    signal: RunSignal,
    run_id: Uuid,
    started: AtomicBool,
}

impl<C, R, G> RunCoordinator<C, R, G>
where
    C: InstanceControl + 'static,
    R: ContainerRuntime,
    G: LoadGenerator,
{
    pub fn new(control: Arc<C>, store: CoordinationStore<R>, load: G, config: HarnessConfig) -> Self {
        Self {
            control,
            store,
            load,
            config,
            signal: RunSignal::new(),
            run_id: Uuid::new_v4(),
            started: AtomicBool::new(false),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Handle on the run signal, for callers that want to observe cancellation
    pub fn signal(&self) -> RunSignal {
        self.signal.clone()
    }

    /// Execute one full run. `interrupt` resolving aborts the run early; teardown still happens.
    ///
    /// The run signal is one-shot, so a coordinator runs once: later calls
    /// return `HarnessError::AlreadyRan` without touching the fleet or store.
    pub async fn run<F>(&self, interrupt: F) -> HarnessResult<RunReport>
    where
        F: Future<Output = ()>,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(HarnessError::AlreadyRan {
                run_id: self.run_id.to_string(),
            });
        }

        let started_at = Utc::now();
        log_startup(
            Actor::Coordinator,
            &format!(
                "run {} ({}): {} instances, {} rounds, store {}",
                self.run_id,
                self.config.run_label,
                self.config.instances.ports.len(),
                self.config.chaos.rounds,
                self.store.address()
            ),
        );

        let mut tasks = RunTasks::default();
        let raced = {
            let main = self.drive(&mut tasks);
            tokio::pin!(interrupt);
            tokio::select! {
                result = main => result.map(Some),
                _ = &mut interrupt => {
                    actor_warn!(Actor::Coordinator, "🛑 Interrupt received, tearing down");
                    Ok(None)
                }
            }
        };

        let teardown = self.teardown(tasks).await;

        let (outcome, load, error) = match raced {
            Ok(Some(load)) => (RunOutcome::Completed, Some(load), None),
            Ok(None) => (RunOutcome::Interrupted, None, None),
            Err(e) => (RunOutcome::Failed(e.to_string()), None, Some(e)),
        };

        let report = RunReport {
            run_id: self.run_id,
            outcome,
            load,
            injector: teardown.injector,
            stopped_ports: teardown.stopped_ports,
            store_removed: teardown.store_removed,
            started_at,
            finished_at: Utc::now(),
        };
        self.log_summary(&report);

        match error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Bootstrap and the chaos-under-load phase. Ends with the signal cancelled.
    async fn drive(&self, tasks: &mut RunTasks) -> HarnessResult<LoadOutcome> {
        let mut reclaimed = 0;
        for &port in &self.config.instances.ports {
            reclaimed += self.control.reclaim_port(port).await;
        }
        if reclaimed > 0 {
            actor_warn!(Actor::Coordinator, "⚠️ Killed {} stale listener(s) left by a previous run", reclaimed);
        }

        self.store.provision().await?;

        log_progress(Actor::Coordinator, "Starting instances", &format!("{:?}", self.config.instances.ports));
        // Spawn and registration must not be split by an interrupt, or a
        // spawned but unregistered instance would outlive teardown
        let starter = tasks.starter.insert(tokio::spawn(start_fleet(
            self.control.clone(),
            self.config.instances.ports.clone(),
            self.signal.clone(),
        )));
        let joined = starter.await;
        tasks.starter = None;
        if let Err(e) = joined {
            let err = HarnessError::TaskJoinError {
                task: "fleet startup",
                message: e.to_string(),
            };
            log_error(Actor::Coordinator, "Instance startup task failed", &err);
        }
        tokio::time::sleep(self.config.instances.settle()).await;

        let live = self.control.live_ports().await;
        actor_info!(Actor::Coordinator, "Fleet up: {}/{} instances live {:?}", live.len(), self.config.instances.ports.len(), live);

        let injector = FaultInjector::new(self.control.clone(), self.config.chaos.clone(), self.signal.clone());
        tasks.injector = Some(injector.spawn());

        log_progress(Actor::Coordinator, "Running load", "chaos loop active");
        let load = self.load.run().await?;
        if load.success() {
            actor_info!(Actor::Load, "✅ Load generator finished in {:.1}s", load.elapsed.as_secs_f64());
        } else {
            actor_warn!(
                Actor::Load,
                "⚠️ Load generator exited with {:?} after {:.1}s",
                load.exit_code,
                load.elapsed.as_secs_f64()
            );
        }

        self.signal.cancel();
        Ok(load)
    }

    async fn teardown(&self, tasks: RunTasks) -> TeardownSummary {
        log_progress(Actor::Coordinator, "Teardown", "stopping chaos loop");
        self.signal.cancel();

        if let Some(starter) = tasks.starter {
            if let Err(e) = starter.await {
                let err = HarnessError::TaskJoinError {
                    task: "fleet startup",
                    message: e.to_string(),
                };
                log_error(Actor::Coordinator, "Instance startup task failed", &err);
            }
        }

        let injector = match tasks.injector {
            Some(handle) => match handle.await {
                Ok(report) => Some(report),
                Err(e) => {
                    let err = HarnessError::TaskJoinError {
                        task: "fault injector",
                        message: e.to_string(),
                    };
                    log_error(Actor::Coordinator, "Fault injector did not finish cleanly", &err);
                    None
                }
            },
            None => None,
        };

        let stopped_ports = self.control.stop_all().await;
        let leftover = self.control.live_ports().await;
        if !leftover.is_empty() {
            actor_error!(Actor::Coordinator, "❌ Instances still registered after teardown: {:?}", leftover);
        }

        self.store.destroy().await;
        let store_removed = match self.store.exists().await {
            Ok(exists) => !exists,
            Err(e) => {
                log_error(Actor::Coordinator, "Could not verify store removal", &e);
                false
            }
        };
        if !store_removed {
            actor_error!(Actor::Coordinator, "❌ Coordination store {} may still exist", self.store.name());
        }

        TeardownSummary {
            injector,
            stopped_ports,
            store_removed,
        }
    }

    fn log_summary(&self, report: &RunReport) {
        let elapsed = report.finished_at - report.started_at;
        if let Some(injector) = &report.injector {
            actor_info!(
                Actor::Coordinator,
                "Chaos summary: {} rounds executed, {} skipped, victims {:?}",
                injector.rounds_executed,
                injector.rounds_skipped,
                injector.victims()
            );
        }
        actor_info!(
            Actor::Coordinator,
            "Teardown summary: stopped {:?}, store removed: {}",
            report.stopped_ports,
            report.store_removed
        );

        match &report.outcome {
            RunOutcome::Completed => log_success(
                Actor::Coordinator,
                &format!(
                    "Run {} completed in {}s (load exit {:?})",
                    report.run_id,
                    elapsed.num_seconds(),
                    report.load.and_then(|l| l.exit_code)
                ),
            ),
            RunOutcome::Interrupted => log_shutdown(Actor::Coordinator, "interrupted by user"),
            RunOutcome::Failed(message) => log_shutdown(Actor::Coordinator, &format!("run failed: {message}")),
        }
    }
}

/// Start every port in order; stops early once the run is cancelled
async fn start_fleet<C: InstanceControl>(control: Arc<C>, ports: Vec<u16>, signal: RunSignal) {
    for port in ports {
        if signal.is_cancelled() {
            actor_warn!(Actor::Coordinator, "Run cancelled, not starting port {}", port);
            continue;
        }
        if let Err(e) = control.start(port).await {
            log_error(Actor::Coordinator, &format!("Instance on port {port} did not start"), &e);
        }
    }
}
