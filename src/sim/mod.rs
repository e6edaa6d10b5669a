mod content;
mod context;
pub mod discovery;
pub mod event;
pub mod group_update;
pub mod migration;
pub mod polity;
mod queue;
mod runner;

pub use content::{CellGroupEventGenerator, ContentRegistry, KnowledgeBoostGenerator};
pub use context::EventContext;
pub use event::{EventKind, EventState, EventTarget, WorldEvent, type_ids};
pub use queue::EventQueue;
pub use runner::{EventOutcome, RunStats, SimConfig, Simulation, initialize_world};
