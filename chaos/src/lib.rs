//! Chaos harness for a fleet of service instances sharing an etcd store
//!
//! A run provisions the coordination store, starts one instance per
//! configured port, then repeatedly kills and restarts random instances while
//! an external load generator drives traffic. Teardown of every instance and
//! of the store is guaranteed on completion, failure and interruption.

pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::config::{HarnessConfig, HarnessConfigBuilder};
pub use crate::core::{
    CoordinationStore, FaultInjector, InjectorReport, InstanceRegistry, RunCoordinator, RunOutcome, RunReport, RunSignal,
    Supervisor,
};
pub use crate::error::{HarnessError, HarnessResult};
pub use crate::traits::{ContainerRuntime, InstanceControl, InstanceLauncher, LoadGenerator, PortOwnerLookup, Signaller};
