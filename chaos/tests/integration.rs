//! End-to-end runs of the coordinator over real `sh` instances, a shell load
//! generator and an in-memory container engine

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chaos::core::{RunOutcome, Termination};
use chaos::HarnessError;

mod common;
use common::{HarnessBuilder, InMemoryContainerRuntime, TestFixtures, TestHelpers};

/// Test a full run: 3 instances, 5 chaos rounds, 1000-request load
#[tokio::test]
async fn test_full_run_tears_everything_down() {
    // Arrange
    let harness = HarnessBuilder::new().build();

    // Act
    let report = tokio::time::timeout(
        Duration::from_secs(20),
        harness.coordinator.run(std::future::pending()),
    )
    .await
    .expect("run should finish")
    .unwrap();

    // Assert
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.load.and_then(|l| l.exit_code), Some(0));

    let injector = report.injector.as_ref().unwrap();
    assert_eq!(injector.termination, Termination::Exhausted);
    assert_eq!(injector.rounds_executed, TestFixtures::ROUNDS);
    assert_eq!(injector.failures(), 0);
    assert!(injector.victims().iter().all(|p| TestFixtures::PORTS.contains(p)));

    assert_eq!(report.stopped_ports, TestFixtures::PORTS.to_vec());
    assert!(report.store_removed);
    TestHelpers::assert_torn_down(&harness).await;
    TestHelpers::assert_logs_present(&harness);
}

/// Test an interrupt right after chaos starts still removes instances and store
#[tokio::test]
async fn test_interrupt_mid_chaos_tears_down() {
    // Arrange
    let harness = HarnessBuilder::new()
        .with_config(|c| c.rounds(1_000).load_command(TestFixtures::load_command(30.0)))
        .build();
    let registry = harness.registry.clone();
    let seen_pids = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen_pids.clone();
    let interrupt = async move {
        // Settle is 50ms; interrupt shortly after the injector spawns
        tokio::time::sleep(Duration::from_millis(120)).await;
        for port in registry.ports().await {
            if let Some((pid, _)) = registry.pids(port).await {
                recorder.lock().unwrap().push(pid);
            }
        }
    };

    // Act
    let started = std::time::Instant::now();
    let report = tokio::time::timeout(Duration::from_secs(10), harness.coordinator.run(interrupt))
        .await
        .expect("teardown should be bounded")
        .unwrap();

    // Assert
    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.exit_code(), 0);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.injector.as_ref().unwrap().termination, Termination::Cancelled);
    assert!(report.store_removed);
    TestHelpers::assert_torn_down(&harness).await;

    let pids = seen_pids.lock().unwrap().clone();
    assert!(!pids.is_empty());
    for pid in pids {
        assert!(!TestHelpers::pid_alive(pid), "instance pid {pid} survived teardown");
    }
}

/// Test a non-zero load exit still produces a full teardown
#[tokio::test]
async fn test_failing_load_still_tears_down() {
    // Arrange
    let harness = HarnessBuilder::new()
        .with_config(|c| {
            c.rounds(1).load_command(chaos::config::CommandTemplate::new(
                "sh",
                ["-c", "echo {requests} {concurrency} {store}; exit 7"],
            ))
        })
        .build();

    // Act
    let report = harness.coordinator.run(std::future::pending()).await.unwrap();

    // Assert
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.load.and_then(|l| l.exit_code), Some(7));
    TestHelpers::assert_torn_down(&harness).await;
}

/// Test a store that cannot be created aborts before any instance starts
#[tokio::test]
async fn test_store_failure_is_fatal_after_teardown() {
    // Arrange
    let harness = HarnessBuilder::new()
        .with_runtime(InMemoryContainerRuntime::new().failing())
        .build();

    // Act
    let err = harness.coordinator.run(std::future::pending()).await.unwrap_err();

    // Assert
    assert!(matches!(err, HarnessError::ContainerCommandFailed { .. }));
    assert!(err.is_fatal());
    TestHelpers::assert_torn_down(&harness).await;
    for port in TestFixtures::PORTS {
        assert!(!harness.log_dir.path().join(format!("server_{port}.log")).exists());
    }
    assert_eq!(
        harness.runtime.history(),
        vec![
            format!("rm {}", TestFixtures::STORE_NAME),
            format!("run {}", TestFixtures::STORE_NAME),
            format!("rm {}", TestFixtures::STORE_NAME),
        ]
    );
}

/// Test a container left by an earlier run is replaced, not reused
#[tokio::test]
async fn test_stale_store_is_replaced() {
    // Arrange
    let harness = HarnessBuilder::new()
        .with_config(|c| c.rounds(0).load_command(TestFixtures::load_command(0.1)))
        .with_runtime(InMemoryContainerRuntime::new().with_stale(TestFixtures::STORE_NAME))
        .build();

    // Act
    let report = harness.coordinator.run(std::future::pending()).await.unwrap();

    // Assert
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert!(report.store_removed);
    assert!(harness.runtime.containers().is_empty());
}

/// Test instances that fail to spawn are logged and the run continues
#[tokio::test]
async fn test_unspawnable_instances_are_not_fatal() {
    // Arrange
    let harness = HarnessBuilder::new()
        .with_config(|c| {
            c.rounds(2)
                .instance_command(chaos::config::CommandTemplate::new("no-such-instance-binary", ["{port}"]))
                .load_command(TestFixtures::load_command(0.3))
        })
        .build();

    // Act
    let report = harness.coordinator.run(std::future::pending()).await.unwrap();

    // Assert
    assert_eq!(report.outcome, RunOutcome::Completed);
    let injector = report.injector.as_ref().unwrap();
    assert_eq!(injector.rounds_executed, 0);
    assert_eq!(injector.rounds_skipped, 2);
    assert!(report.stopped_ports.is_empty());
    TestHelpers::assert_torn_down(&harness).await;
}
