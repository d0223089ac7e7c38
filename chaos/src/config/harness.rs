//! Harness configuration
//!
//! Compiled-in defaults reproduce the reference chaos run: an etcd container
//! on 2379, three instances on 8001-8003, five chaos rounds three seconds
//! apart, and a 50-way / 1M-request load run. A JSON file may overlay any
//! subset of fields.

use serde::{Deserialize, Serialize};
use shared::LogLevel;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::command::{CommandTemplate, INSTANCE_PLACEHOLDERS, LOAD_PLACEHOLDERS};
use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Label prefixed to the run id in logs
    pub run_label: String,
    pub log_level: LogLevel,
    pub store: StoreConfig,
    pub instances: InstanceConfig,
    pub chaos: ChaosConfig,
    pub load: LoadConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            run_label: "chaos".to_string(),
            log_level: LogLevel::Info,
            store: StoreConfig::default(),
            instances: InstanceConfig::default(),
            chaos: ChaosConfig::default(),
            load: LoadConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Create a new builder
    pub fn builder() -> super::builder::HarnessConfigBuilder {
        super::builder::HarnessConfigBuilder::new()
    }

    /// Load a (possibly partial) configuration from a JSON file
    pub fn from_json_file(path: &Path) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> HarnessResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check invariants the run depends on before anything is started
    pub fn validate(&self) -> HarnessResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(HarnessError::config("store.name must not be empty"));
        }
        if self.store.port == 0 {
            return Err(HarnessError::config("store.port must be non-zero"));
        }
        if self.instances.ports.is_empty() {
            return Err(HarnessError::config("instances.ports must not be empty"));
        }
        let mut seen = HashSet::new();
        for &port in &self.instances.ports {
            if port == 0 {
                return Err(HarnessError::config("instances.ports must not contain 0"));
            }
            if port == self.store.port {
                return Err(HarnessError::config(format!(
                    "instances.ports: {port} collides with the store port"
                )));
            }
            if !seen.insert(port) {
                return Err(HarnessError::config(format!("instances.ports: duplicate port {port}")));
            }
        }
        if self.instances.stop_wait_ms == 0 {
            return Err(HarnessError::config("instances.stop_wait_ms must be greater than 0"));
        }
        if self.load.concurrency == 0 {
            return Err(HarnessError::config("load.concurrency must be greater than 0"));
        }
        self.instances.command.validate(INSTANCE_PLACEHOLDERS)?;
        self.load.command.validate(LOAD_PLACEHOLDERS)?;
        Ok(())
    }
}

/// How the harness decides the coordination store is reachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Readiness {
    /// Sleep a fixed interval and assume the store is up
    Settle { settle_ms: u64 },
    /// Poll an HTTP health endpoint until it answers 200
    HttpHealth {
        path: String,
        timeout_ms: u64,
        poll_interval_ms: u64,
    },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::HttpHealth {
            path: "/health".to_string(),
            timeout_ms: 30_000,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Container name; stale containers with this name are force-replaced
    pub name: String,
    pub image: String,
    /// Host the instances and load generator use to reach the store
    pub host: String,
    /// Published client port (host side and container side)
    pub port: u16,
    pub env: BTreeMap<String, String>,
    pub readiness: Readiness,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let mut env = BTreeMap::new();
        env.insert("ALLOW_NONE_AUTHENTICATION".to_string(), "yes".to_string());
        Self {
            name: "etcd-service".to_string(),
            image: "bitnami/etcd:latest".to_string(),
            host: "localhost".to_string(),
            port: 2379,
            env,
            readiness: Readiness::default(),
        }
    }
}

impl StoreConfig {
    /// `host:port` handed to instances and the load generator
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub ports: Vec<u16>,
    pub command: CommandTemplate,
    /// Directory holding one `server_<port>.log` per instance
    pub log_dir: PathBuf,
    /// Delay after starting the fleet so instances can register with the store
    pub settle_ms: u64,
    /// Upper bound on waiting for a killed instance to be reaped
    pub stop_wait_ms: u64,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            ports: vec![8001, 8002, 8003],
            command: CommandTemplate::new(
                "go",
                ["run", "cmd/server/main.go", "-port", "{port}", "-etcd", "{store}"],
            ),
            log_dir: PathBuf::from("."),
            settle_ms: 5_000,
            stop_wait_ms: 1_000,
        }
    }
}

impl InstanceConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn stop_wait(&self) -> Duration {
        Duration::from_millis(self.stop_wait_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub rounds: u32,
    pub round_interval_ms: u64,
    pub recovery_delay_ms: u64,
    /// Fixed seed for reproducible victim selection
    pub seed: Option<u64>,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            rounds: 5,
            round_interval_ms: 3_000,
            recovery_delay_ms: 3_000,
            seed: None,
        }
    }
}

impl ChaosConfig {
    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub command: CommandTemplate,
    pub concurrency: u32,
    pub requests: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            command: CommandTemplate::new(
                "go",
                [
                    "run",
                    "cmd/benchmark/main.go",
                    "-c",
                    "{concurrency}",
                    "-n",
                    "{requests}",
                    "-etcd",
                    "{store}",
                ],
            ),
            concurrency: 50,
            requests: 1_000_000,
        }
    }
}
