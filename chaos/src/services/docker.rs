//! Container engine access through the `docker` CLI

use async_trait::async_trait;
use shared::{actor_debug, Actor};
use std::process::Output;
use tokio::process::Command;

use crate::error::{HarnessError, HarnessResult};
use crate::traits::{ContainerRuntime, ContainerSpec};

#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Use another docker-compatible CLI (e.g. `podman`)
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    async fn execute(&self, args: &[String]) -> HarnessResult<Output> {
        let command = format!("{} {}", self.binary, args.join(" "));
        actor_debug!(Actor::Store, "Running `{}`", command);

        Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| HarnessError::ContainerCommandFailed {
                command,
                stderr: e.to_string(),
            })
    }

    async fn execute_checked(&self, args: &[String]) -> HarnessResult<Output> {
        let output = self.execute(args).await?;
        if !output.status.success() {
            return Err(HarnessError::ContainerCommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

/// `run -d --name NAME -p H:C ... -e K=V ... IMAGE`
pub fn run_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["run".to_string(), "-d".to_string(), "--name".to_string(), spec.name.clone()];
    for (host, container) in &spec.published_ports {
        args.push("-p".to_string());
        args.push(format!("{host}:{container}"));
    }
    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(spec.image.clone());
    args
}

/// Anchored name filter: `docker ps --filter name=` is a substring match otherwise
fn name_filter(name: &str) -> String {
    format!("name=^/{name}$")
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run_detached(&self, spec: &ContainerSpec) -> HarnessResult<()> {
        let output = self.execute_checked(&run_args(spec)).await?;
        let id = String::from_utf8_lossy(&output.stdout);
        actor_debug!(Actor::Store, "Container {} started ({})", spec.name, id.trim());
        Ok(())
    }

    async fn force_remove(&self, name: &str) -> HarnessResult<()> {
        let args = vec!["rm".to_string(), "-f".to_string(), name.to_string()];
        let output = self.execute(&args).await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such container") {
            return Ok(());
        }
        Err(HarnessError::ContainerCommandFailed {
            command: format!("{} rm -f {name}", self.binary),
            stderr: stderr.trim().to_string(),
        })
    }

    async fn exists(&self, name: &str) -> HarnessResult<bool> {
        let args = vec![
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            name_filter(name),
            "--format".to_string(),
            "{{.Names}}".to_string(),
        ];
        let output = self.execute_checked(&args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|line| line.trim() == name))
    }
}
