#[macro_use]
mod macros;

pub mod biome;
pub mod cluster;
pub mod culture;
pub mod date;
pub mod discovery;
pub mod group;
pub mod language;
pub mod polity;
pub mod position;
pub mod region;
pub mod route;
pub mod terrain;
pub mod world;

pub use biome::Biome;
pub use cluster::PolityProminenceCluster;
pub use culture::Culture;
pub use date::{DATE_ID_FACTOR, GENERATION_SPAN, MAX_SUPPORTED_DATE, WorldDate, date_after};
pub use discovery::DiscoveryKind;
pub use group::{CellGroup, MigratingGroup, PolityProminence};
pub use language::Language;
pub use polity::{Faction, FactionKind, Polity, PolityKind};
pub use position::{Direction, WorldPosition};
pub use region::Region;
pub use route::Route;
pub use terrain::{Terrain, TerrainCell};
pub use world::{World, WorldPhase};
