//! Configuration Management
//!
//! This module provides configuration structures and builders for the harness.

pub mod builder;
pub mod command;
pub mod harness;

// Re-export main types
pub use builder::HarnessConfigBuilder;
pub use command::CommandTemplate;
pub use harness::{ChaosConfig, HarnessConfig, InstanceConfig, LoadConfig, Readiness, StoreConfig};
