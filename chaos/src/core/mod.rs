//! Core harness logic, independent of the OS and container engine

pub mod coordinator;
pub mod fault_injector;
pub mod registry;
pub mod signal;
pub mod store;
pub mod supervisor;

pub use coordinator::{RunCoordinator, RunOutcome, RunReport};
pub use fault_injector::{FaultInjector, InjectionEvent, InjectionKind, InjectorReport, InjectorState, Termination};
pub use registry::{InstanceProcess, InstanceRegistry};
pub use signal::RunSignal;
pub use store::CoordinationStore;
pub use supervisor::Supervisor;
