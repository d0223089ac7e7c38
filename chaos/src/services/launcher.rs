//! Spawns fleet instances from the configured command template

use async_trait::async_trait;
use shared::{actor_debug, Actor};
use std::path::PathBuf;

use crate::config::CommandTemplate;
use crate::core::registry::InstanceProcess;
use crate::error::{HarnessError, HarnessResult};
use crate::services::log_sink;
use crate::traits::InstanceLauncher;

pub struct CommandInstanceLauncher {
    template: CommandTemplate,
    store_address: String,
    log_dir: PathBuf,
}

impl CommandInstanceLauncher {
    pub fn new(template: CommandTemplate, store_address: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            template,
            store_address: store_address.into(),
            log_dir: log_dir.into(),
        }
    }

    fn vars(&self, port: u16) -> [(&'static str, String); 2] {
        [("port", port.to_string()), ("store", self.store_address.clone())]
    }
}

#[async_trait]
impl InstanceLauncher for CommandInstanceLauncher {
    async fn launch(&self, port: u16) -> HarnessResult<InstanceProcess> {
        let vars = self.vars(port);
        let (log_path, log_file) = log_sink::open(&self.log_dir, port)?;

        let mut cmd = self.template.to_command(&vars)?;
        log_sink::attach(&mut cmd, &log_file, &log_path)?;
        // Group leader, so killpg also reaches children of wrappers like `go run`
        #[cfg(unix)]
        cmd.process_group(0);
        cmd.kill_on_drop(true);

        actor_debug!(
            Actor::Supervisor,
            "Spawning `{}` (log: {})",
            self.template.display(&vars),
            log_path.display()
        );

        let child = cmd.spawn().map_err(|source| HarnessError::SpawnFailed { port, source })?;
        InstanceProcess::from_child(port, child, log_path)
    }
}
