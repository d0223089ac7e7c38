//! Socket-owner lookup through `lsof`, process naming through `ps`

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{HarnessError, HarnessResult};
use crate::traits::PortOwnerLookup;

/// Finds LISTEN-state owners of a TCP port with `lsof -t`
#[derive(Debug, Clone)]
pub struct LsofPortOwnerLookup {
    binary: String,
}

impl LsofPortOwnerLookup {
    pub fn new() -> Self {
        Self {
            binary: "lsof".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for LsofPortOwnerLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortOwnerLookup for LsofPortOwnerLookup {
    async fn listening_pids(&self, port: u16) -> HarnessResult<Vec<u32>> {
        let output = Command::new(&self.binary)
            .arg("-nP")
            .arg(format!("-iTCP:{port}"))
            .arg("-sTCP:LISTEN")
            .arg("-t")
            .output()
            .await
            .map_err(|e| HarnessError::PortLookupError {
                port,
                message: format!("{} not runnable: {e}", self.binary),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            // lsof exits 1 with no output when nothing matches
            if output.status.code() == Some(1) && stdout.trim().is_empty() {
                return Ok(Vec::new());
            }
            return Err(HarnessError::PortLookupError {
                port,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_pids(&stdout).map_err(|message| HarnessError::PortLookupError { port, message })
    }

    async fn process_command(&self, pid: u32) -> Option<String> {
        let output = Command::new("ps")
            .args(["-o", "command=", "-p", &pid.to_string()])
            .output()
            .await
            .ok()?;
        let command = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (output.status.success() && !command.is_empty()).then_some(command)
    }
}

/// One pid per line; duplicates (IPv4 + IPv6 sockets) collapse
fn parse_pids(stdout: &str) -> Result<Vec<u32>, String> {
    let mut pids = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let pid: u32 = line.parse().map_err(|_| format!("unexpected lsof output: {line}"))?;
        if !pids.contains(&pid) {
            pids.push(pid);
        }
    }
    Ok(pids)
}
