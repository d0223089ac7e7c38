//! Harness Configuration Builder
//!
//! Provides a flexible builder pattern for constructing harness configurations

use shared::LogLevel;
use std::path::PathBuf;
use std::time::Duration;

use super::command::CommandTemplate;
use super::harness::{HarnessConfig, Readiness};

pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn run_label<S: Into<String>>(mut self, label: S) -> Self {
        self.config.run_label = label.into();
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Set instance ports
    pub fn ports<I: IntoIterator<Item = u16>>(mut self, ports: I) -> Self {
        self.config.instances.ports = ports.into_iter().collect();
        self
    }

    /// Set the command used to launch one instance
    pub fn instance_command(mut self, command: CommandTemplate) -> Self {
        self.config.instances.command = command;
        self
    }

    pub fn log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.instances.log_dir = dir.into();
        self
    }

    pub fn instance_settle(mut self, settle: Duration) -> Self {
        self.config.instances.settle_ms = millis(settle);
        self
    }

    pub fn stop_wait(mut self, wait: Duration) -> Self {
        self.config.instances.stop_wait_ms = millis(wait);
        self
    }

    /// Set number of chaos rounds
    pub fn rounds(mut self, rounds: u32) -> Self {
        self.config.chaos.rounds = rounds;
        self
    }

    pub fn round_interval(mut self, interval: Duration) -> Self {
        self.config.chaos.round_interval_ms = millis(interval);
        self
    }

    pub fn recovery_delay(mut self, delay: Duration) -> Self {
        self.config.chaos.recovery_delay_ms = millis(delay);
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.chaos.seed = seed;
        self
    }

    pub fn store_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.store.name = name.into();
        self
    }

    pub fn store_port(mut self, port: u16) -> Self {
        self.config.store.port = port;
        self
    }

    pub fn store_readiness(mut self, readiness: Readiness) -> Self {
        self.config.store.readiness = readiness;
        self
    }

    /// Set the command used for the load-generation run
    pub fn load_command(mut self, command: CommandTemplate) -> Self {
        self.config.load.command = command;
        self
    }

    pub fn concurrency(mut self, concurrency: u32) -> Self {
        self.config.load.concurrency = concurrency;
        self
    }

    pub fn requests(mut self, requests: u64) -> Self {
        self.config.load.requests = requests;
        self
    }

    /// Build the configuration
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
