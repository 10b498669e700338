#[allow(clippy::module_inception)]
mod executor;
mod spawner;

pub use executor::Executor;
pub use spawner::{ForkSpawner, Spawner};

#[cfg(test)]
pub use executor::COMMAND_NOT_FOUND;
#[cfg(test)]
pub use spawner::{ChildHandle, SpawnError, SpawnRequest};
