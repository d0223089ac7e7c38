//! Shared logging utilities for consistent tracing across the harness

use crate::errors::{SharedError, SharedResult};
use crate::types::{Actor, LogLevel};
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Build the default filter directive for the harness crates
pub fn filter_directive(level: LogLevel) -> String {
    format!("chaos={level},shared={level},reqwest=warn,hyper=warn")
}

/// Initialize the stdout tracing subscriber.
///
/// `RUST_LOG` wins over `level` when it is set, so a single noisy module can be
/// turned up without touching the harness configuration.
pub fn init_tracing_with_level(level: LogLevel) -> SharedResult<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| SharedError::TracingInit { message: e.to_string() })
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for actor-aware info logging
#[macro_export]
macro_rules! actor_info {
    ($actor:expr, $($arg:tt)*) => {
        $crate::tracing::info!(
            actor = %$actor,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for actor-aware warning logging
#[macro_export]
macro_rules! actor_warn {
    ($actor:expr, $($arg:tt)*) => {
        $crate::tracing::warn!(
            actor = %$actor,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for actor-aware error logging
#[macro_export]
macro_rules! actor_error {
    ($actor:expr, $($arg:tt)*) => {
        $crate::tracing::error!(
            actor = %$actor,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for actor-aware debug logging
#[macro_export]
macro_rules! actor_debug {
    ($actor:expr, $($arg:tt)*) => {
        $crate::tracing::debug!(
            actor = %$actor,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(actor: Actor, details: &str) {
    info!(
        actor = %actor,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(actor: Actor, reason: &str) {
    info!(
        actor = %actor,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(actor: Actor, context: &str, error: &dyn std::fmt::Display) {
    error!(
        actor = %actor,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(actor: Actor, message: &str) {
    info!(
        actor = %actor,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

/// Contextual logging helper for progress updates
pub fn log_progress(actor: Actor, action: &str, details: &str) {
    info!(
        actor = %actor,
        timestamp = format_timestamp(),
        "📋 {}: {}",
        action,
        details
    );
}
