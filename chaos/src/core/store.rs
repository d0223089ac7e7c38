//! Coordination store lifecycle (single etcd container)
//!
//! The store is always provisioned fresh: any container left over with the
//! same name is force-removed first. Teardown removes it again and the
//! coordinator verifies it is gone.

use shared::{actor_debug, actor_info, actor_warn, Actor};
use std::time::{Duration, Instant};

use crate::config::{Readiness, StoreConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::traits::{ContainerRuntime, ContainerSpec};

pub struct CoordinationStore<R: ContainerRuntime> {
    runtime: R,
    config: StoreConfig,
}

impl<R: ContainerRuntime> CoordinationStore<R> {
    pub fn new(runtime: R, config: StoreConfig) -> Self {
        Self { runtime, config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// `host:port` handed to instances and the load generator
    pub fn address(&self) -> String {
        self.config.address()
    }

    pub fn container_spec(&self) -> ContainerSpec {
        ContainerSpec {
            name: self.config.name.clone(),
            image: self.config.image.clone(),
            published_ports: vec![(self.config.port, self.config.port)],
            env: self.config.env.clone(),
        }
    }

    /// Replace any stale container, start a fresh one and wait until it is ready
    pub async fn provision(&self) -> HarnessResult<()> {
        actor_info!(Actor::Store, "📦 Provisioning coordination store {} ({})", self.config.name, self.config.image);

        if let Err(e) = self.runtime.force_remove(&self.config.name).await {
            actor_debug!(Actor::Store, "Stale container removal ignored: {}", e);
        }

        self.runtime.run_detached(&self.container_spec()).await?;
        self.wait_ready().await?;

        actor_info!(Actor::Store, "✅ Coordination store ready at {}", self.address());
        Ok(())
    }

    /// Force-remove the container; failures are logged only
    pub async fn destroy(&self) {
        actor_info!(Actor::Store, "🧹 Removing coordination store {}", self.config.name);
        if let Err(e) = self.runtime.force_remove(&self.config.name).await {
            actor_warn!(Actor::Store, "⚠️ Failed to remove coordination store {}: {}", self.config.name, e);
        }
    }

    pub async fn exists(&self) -> HarnessResult<bool> {
        self.runtime.exists(&self.config.name).await
    }

    async fn wait_ready(&self) -> HarnessResult<()> {
        match &self.config.readiness {
            Readiness::Settle { settle_ms } => {
                actor_debug!(Actor::Store, "Waiting {}ms for the store to settle", settle_ms);
                tokio::time::sleep(Duration::from_millis(*settle_ms)).await;
                Ok(())
            }
            Readiness::HttpHealth {
                path,
                timeout_ms,
                poll_interval_ms,
            } => {
                let url = format!("http://{}{}", self.address(), path);
                wait_for_health(
                    &self.config.name,
                    &url,
                    Duration::from_millis(*timeout_ms),
                    Duration::from_millis(*poll_interval_ms),
                )
                .await
            }
        }
    }
}

/// Poll `url` until it answers 200 or `timeout` elapses
async fn wait_for_health(name: &str, url: &str, timeout: Duration, poll_interval: Duration) -> HarnessResult<()> {
    let client = reqwest::Client::builder()
        .timeout(poll_interval.max(Duration::from_millis(250)))
        .build()
        .map_err(|e| HarnessError::config(format!("http client: {e}")))?;

    let started = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match client.get(url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                actor_debug!(Actor::Store, "Health probe {} answered after {} attempts", url, attempts);
                return Ok(());
            }
            Ok(response) => actor_debug!(Actor::Store, "Health probe {} returned {}", url, response.status()),
            Err(e) => actor_debug!(Actor::Store, "Health probe {} not reachable yet: {}", url, e),
        }

        if started.elapsed() >= timeout {
            return Err(HarnessError::StoreNotReady {
                name: name.to_string(),
                waited: started.elapsed(),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}
