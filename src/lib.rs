pub mod error;
pub mod flush;
pub mod id;
pub mod model;
pub mod rng;
pub mod sim;
pub mod worldgen;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{ContentError, SimError, SnapshotError};
pub use id::IdGenerator;
pub use model::{CellGroup, Polity, World, WorldDate, WorldPosition};
pub use sim::{ContentRegistry, RunStats, SimConfig, Simulation};
pub use worldgen::WorldGenConfig;
