//! Real implementations of the trait seams: processes, sockets, signals, docker

pub mod docker;
pub mod launcher;
pub mod load_generator;
pub mod log_sink;
pub mod port_lookup;
pub mod signaller;

pub use docker::DockerCli;
pub use launcher::CommandInstanceLauncher;
pub use load_generator::CommandLoadGenerator;
pub use port_lookup::LsofPortOwnerLookup;
pub use signaller::NixSignaller;

use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::core::{CoordinationStore, InstanceRegistry, RunCoordinator, Supervisor};

/// Supervisor backed by real processes, `lsof` and `nix`
pub type RealSupervisor = Supervisor<CommandInstanceLauncher, LsofPortOwnerLookup, NixSignaller>;

pub type RealCoordinator = RunCoordinator<RealSupervisor, DockerCli, CommandLoadGenerator>;

/// Wire the real services for one run of `config`
pub fn real_coordinator(config: HarnessConfig) -> RealCoordinator {
    let store_address = config.store.address();

    let launcher = CommandInstanceLauncher::new(
        config.instances.command.clone(),
        store_address.clone(),
        config.instances.log_dir.clone(),
    );
    let supervisor = Supervisor::new(launcher, LsofPortOwnerLookup::new(), NixSignaller, InstanceRegistry::new())
        .with_stop_wait(config.instances.stop_wait());

    let store = CoordinationStore::new(DockerCli::new(), config.store.clone());
    let load = CommandLoadGenerator::new(&config.load, store_address);

    RunCoordinator::new(Arc::new(supervisor), store, load, config)
}
