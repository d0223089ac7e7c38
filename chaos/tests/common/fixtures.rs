//! Test fixtures and data for chaos harness tests

use std::path::Path;
use std::time::Duration;

use chaos::config::{CommandTemplate, HarnessConfig, Readiness};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Fleet ports, matching the production defaults
    pub const PORTS: [u16; 3] = [8001, 8002, 8003];

    /// Container name distinct from the production store
    pub const STORE_NAME: &'static str = "etcd-service-test";

    pub const ROUNDS: u32 = 5;
    pub const SEED: u64 = 7;
    pub const REQUESTS: u64 = 1000;
    pub const CONCURRENCY: u32 = 4;

    /// Stand-in instance: announces itself in its log, then idles
    pub fn instance_command() -> CommandTemplate {
        CommandTemplate::new("sh", ["-c", "echo instance {port} using {store}; exec sleep 30"])
    }

    /// Stand-in load generator that outlives the chaos rounds
    pub fn load_command(seconds: f32) -> CommandTemplate {
        CommandTemplate::new(
            "sh",
            [
                "-c".to_string(),
                format!("sleep {seconds}; echo sent {{requests}} requests at concurrency {{concurrency}} to {{store}}"),
            ],
        )
    }

    /// Fast configuration: millisecond delays, in-process readiness
    pub fn harness_config(log_dir: &Path) -> HarnessConfig {
        HarnessConfig::builder()
            .run_label("chaos-test")
            .ports(Self::PORTS)
            .instance_command(Self::instance_command())
            .log_dir(log_dir)
            .instance_settle(Duration::from_millis(50))
            .stop_wait(Duration::from_millis(500))
            .rounds(Self::ROUNDS)
            .round_interval(Duration::from_millis(30))
            .recovery_delay(Duration::from_millis(30))
            .seed(Some(Self::SEED))
            .store_name(Self::STORE_NAME)
            .store_readiness(Readiness::Settle { settle_ms: 1 })
            .load_command(Self::load_command(1.5))
            .concurrency(Self::CONCURRENCY)
            .requests(Self::REQUESTS)
            .build()
    }
}
