//! Fault injection engine: the timed chaos loop
//!
//! Each round sleeps, picks one live instance uniformly at random, kills it,
//! waits a recovery delay and starts it again on the same port. The live set
//! is re-read every round and the registry is never locked across a sleep.
//! A failing stop or start is logged and recorded; it never ends the loop.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::{actor_debug, actor_error, actor_info, Actor};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ChaosConfig;
use crate::core::signal::RunSignal;
use crate::traits::InstanceControl;

/// Lifecycle of one injector run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectorState {
    Idle,
    Running,
    Stopping,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    Stop,
    Start,
    /// Round skipped because no instance was live
    Skip,
}

#[derive(Debug, Clone)]
pub struct InjectionEvent {
    pub timestamp: DateTime<Utc>,
    pub round: u32,
    pub kind: InjectionKind,
    pub target: Option<u16>,
    pub success: bool,
    pub details: String,
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// All configured rounds ran
    Exhausted,
    /// The run signal was observed
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct InjectorReport {
    /// Rounds that performed a stop/start pair
    pub rounds_executed: u32,
    pub rounds_skipped: u32,
    pub termination: Termination,
    pub events: Vec<InjectionEvent>,
}

impl InjectorReport {
    /// Ports stopped, in order
    pub fn victims(&self) -> Vec<u16> {
        self.events
            .iter()
            .filter(|e| e.kind == InjectionKind::Stop)
            .filter_map(|e| e.target)
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.events.iter().filter(|e| !e.success).count()
    }
}

pub struct FaultInjector<C: InstanceControl> {
    control: Arc<C>,
    config: ChaosConfig,
    signal: RunSignal,
    rng: StdRng,
    state: watch::Sender<InjectorState>,
    events: Vec<InjectionEvent>,
}

impl<C: InstanceControl + 'static> FaultInjector<C> {
    pub fn new(control: Arc<C>, config: ChaosConfig, signal: RunSignal) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (state, _) = watch::channel(InjectorState::Idle);
        Self {
            control,
            config,
            signal,
            rng,
            state,
            events: Vec::new(),
        }
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<InjectorState> {
        self.state.subscribe()
    }

    /// Run the loop as an independent task
    pub fn spawn(self) -> JoinHandle<InjectorReport> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> InjectorReport {
        self.state.send_replace(InjectorState::Running);
        actor_info!(
            Actor::Injector,
            "🌪️ Chaos loop running: {} rounds every {:?}",
            self.config.rounds,
            self.config.round_interval()
        );

        let mut rounds_executed = 0;
        let mut rounds_skipped = 0;
        let mut termination = Termination::Exhausted;

        for round in 1..=self.config.rounds {
            if self.signal.sleep_unless_cancelled(self.config.round_interval()).await {
                termination = Termination::Cancelled;
                break;
            }

            let live = self.control.live_ports().await;
            let Some(&target) = live.choose(&mut self.rng) else {
                actor_debug!(Actor::Injector, "Round {}: no live instance, skipping", round);
                self.record(round, InjectionKind::Skip, None, true, "no live instance".to_string());
                rounds_skipped += 1;
                continue;
            };

            self.chaos_round(round, target).await;
            rounds_executed += 1;
        }

        self.state.send_replace(InjectorState::Stopping);
        let report = InjectorReport {
            rounds_executed,
            rounds_skipped,
            termination,
            events: std::mem::take(&mut self.events),
        };
        actor_info!(
            Actor::Injector,
            "Chaos loop finished ({:?}): {} executed, {} skipped, {} failed actions",
            report.termination,
            report.rounds_executed,
            report.rounds_skipped,
            report.failures()
        );
        self.state.send_replace(InjectorState::Terminated);
        report
    }

    async fn chaos_round(&mut self, round: u32, port: u16) {
        actor_info!(Actor::Injector, "💉 Round {}/{}: killing instance on port {}", round, self.config.rounds, port);

        match self.control.stop(port).await {
            Ok(outcome) => self.record(round, InjectionKind::Stop, Some(port), true, format!("{outcome:?}")),
            Err(e) => {
                actor_error!(Actor::Injector, "❌ Round {}: stop of port {} failed: {}", round, port, e);
                self.record(round, InjectionKind::Stop, Some(port), false, e.to_string());
            }
        }

        // A cancellation shortens the delay but the restart below always runs
        if self.signal.sleep_unless_cancelled(self.config.recovery_delay()).await {
            actor_debug!(Actor::Injector, "Cancelled during recovery, restarting port {} before exiting", port);
        }

        match self.control.start(port).await {
            Ok(()) => {
                actor_info!(Actor::Injector, "♻️ Round {}: restarted instance on port {}", round, port);
                self.record(round, InjectionKind::Start, Some(port), true, "restarted".to_string());
            }
            Err(e) => {
                actor_error!(Actor::Injector, "❌ Round {}: restart of port {} failed: {}", round, port, e);
                self.record(round, InjectionKind::Start, Some(port), false, e.to_string());
            }
        }
    }

    fn record(&mut self, round: u32, kind: InjectionKind, target: Option<u16>, success: bool, details: String) {
        self.events.push(InjectionEvent {
            timestamp: Utc::now(),
            round,
            kind,
            target,
            success,
            details,
        });
    }
}
