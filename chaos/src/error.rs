//! Harness-specific error types

use shared::SharedError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to spawn instance on port {port}: {source}")]
    SpawnFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log sink {}: {source}", path.display())]
    LogSinkError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Container command `{command}` failed: {stderr}")]
    ContainerCommandFailed { command: String, stderr: String },

    #[error("Coordination store {name} not ready after {waited:?}")]
    StoreNotReady { name: String, waited: Duration },

    #[error("Failed to launch load generator: {source}")]
    LoadLaunchFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("Socket owner lookup failed for port {port}: {message}")]
    PortLookupError { port: u16, message: String },

    #[error("Signal delivery to {target} failed: {message}")]
    SignalError { target: String, message: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Run {run_id} already started; a coordinator runs once")]
    AlreadyRan { run_id: String },

    #[error("Background task {task} failed: {message}")]
    TaskJoinError { task: &'static str, message: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn config(field: impl Into<String>) -> Self {
        HarnessError::ConfigurationError { field: field.into() }
    }

    pub fn signal(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        HarnessError::SignalError {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Bootstrap failures abort the run; everything else is logged and survived.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::ContainerCommandFailed { .. }
                | HarnessError::StoreNotReady { .. }
                | HarnessError::LoadLaunchFailed { .. }
                | HarnessError::ConfigurationError { .. }
        )
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
