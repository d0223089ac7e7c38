//! External load generator, run to completion with inherited stdio

use async_trait::async_trait;
use shared::{actor_info, Actor};
use std::process::Stdio;
use std::time::Instant;

use crate::config::{CommandTemplate, LoadConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::traits::{LoadGenerator, LoadOutcome};

pub struct CommandLoadGenerator {
    template: CommandTemplate,
    vars: Vec<(&'static str, String)>,
}

impl CommandLoadGenerator {
    pub fn new(config: &LoadConfig, store_address: impl Into<String>) -> Self {
        Self {
            template: config.command.clone(),
            vars: vec![
                ("store", store_address.into()),
                ("concurrency", config.concurrency.to_string()),
                ("requests", config.requests.to_string()),
            ],
        }
    }

    pub fn command_line(&self) -> String {
        self.template.display(&self.vars)
    }
}

#[async_trait]
impl LoadGenerator for CommandLoadGenerator {
    async fn run(&self) -> HarnessResult<LoadOutcome> {
        let mut cmd = self.template.to_command(&self.vars)?;
        // Dropping the wait (interrupt) must not leave the generator running
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        actor_info!(Actor::Load, "🔥 Starting load: {}", self.command_line());
        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| HarnessError::LoadLaunchFailed { source })?;
        let status = child.wait().await?;

        Ok(LoadOutcome {
            exit_code: status.code(),
            elapsed: started.elapsed(),
        })
    }
}
