//! Command templates for launched processes
//!
//! Arguments may carry `{name}` placeholders that are filled in at launch
//! time (`{port}`, `{store}`, `{concurrency}`, `{requests}`). Commands are
//! executed directly, never through a shell.

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{HarnessError, HarnessResult};

/// Placeholders understood by instance commands
pub const INSTANCE_PLACEHOLDERS: &[&str] = &["port", "store"];

/// Placeholders understood by load-generator commands
pub const LOAD_PLACEHOLDERS: &[&str] = &["store", "concurrency", "requests"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Every placeholder name referenced by the arguments, in order of appearance
    pub fn placeholders(&self) -> Vec<&str> {
        self.args.iter().flat_map(|arg| placeholders_in(arg)).collect()
    }

    /// Reject placeholders outside `allowed`
    pub fn validate(&self, allowed: &[&str]) -> HarnessResult<()> {
        if self.program.trim().is_empty() {
            return Err(HarnessError::config("command program must not be empty"));
        }
        for name in self.placeholders() {
            if !allowed.contains(&name) {
                return Err(HarnessError::config(format!(
                    "unknown placeholder {{{name}}} in command `{}` (allowed: {})",
                    self.program,
                    allowed.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Substitute `vars` into the argument list
    pub fn render_args(&self, vars: &[(&str, String)]) -> HarnessResult<Vec<String>> {
        self.args
            .iter()
            .map(|arg| {
                for name in placeholders_in(arg) {
                    if !vars.iter().any(|(key, _)| *key == name) {
                        return Err(HarnessError::config(format!(
                            "no value for placeholder {{{name}}} in `{arg}`"
                        )));
                    }
                }
                let mut rendered = arg.clone();
                for (key, value) in vars {
                    rendered = rendered.replace(&format!("{{{key}}}"), value);
                }
                Ok(rendered)
            })
            .collect()
    }

    /// Build a ready-to-spawn command with placeholders substituted
    pub fn to_command(&self, vars: &[(&str, String)]) -> HarnessResult<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.render_args(vars)?);
        Ok(cmd)
    }

    /// Human-readable rendering for log lines
    pub fn display(&self, vars: &[(&str, String)]) -> String {
        match self.render_args(vars) {
            Ok(args) if args.is_empty() => self.program.clone(),
            Ok(args) => format!("{} {}", self.program, args.join(" ")),
            Err(_) => format!("{} {}", self.program, self.args.join(" ")),
        }
    }
}

fn placeholders_in(s: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = s;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let name = &after[..close];
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            found.push(name);
        }
        rest = &after[close + 1..];
    }
    found
}
