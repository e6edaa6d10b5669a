use thiserror::Error;

use crate::id::{ClusterId, GroupId, PolityId};
use crate::model::{WorldDate, WorldPosition};

/// Fatal simulation errors. Any of these aborts the current step; the world
/// should not be advanced further once one has been returned.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("invariant violated in {operation} on {entity} at date {date}: {detail}")]
    Invariant {
        entity: String,
        date: WorldDate,
        operation: &'static str,
        detail: String,
    },

    #[error("event {event_id} scheduled in the past: trigger date {trigger_date} <= current date {current_date}")]
    EventInPast {
        event_id: i64,
        trigger_date: WorldDate,
        current_date: WorldDate,
    },

    #[error("event {event_id} trigger date {trigger_date} exceeds the maximum supported date")]
    UnsupportedDate { event_id: i64, trigger_date: WorldDate },

    #[error("no terrain cell at {0}")]
    MissingCell(WorldPosition),

    #[error("group {0} not found")]
    MissingGroup(GroupId),

    #[error("polity {0} not found")]
    MissingPolity(PolityId),

    #[error("prominence cluster {0} not found")]
    MissingCluster(ClusterId),

    #[error("event generator '{0}' is not registered")]
    MissingGenerator(String),

    #[error("world grid {width}x{height} is outside 1..={max} cells per side")]
    GridSize { width: u32, height: u32, max: u32 },
}

impl SimError {
    pub fn invariant(
        entity: impl ToString,
        date: WorldDate,
        operation: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        SimError::Invariant {
            entity: entity.to_string(),
            date,
            operation,
            detail: detail.into(),
        }
    }
}

/// Malformed content rejected while building the registry, before the
/// simulation starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContentError {
    #[error("event generator id must not be empty")]
    EmptyGeneratorId,

    #[error("event generator '{0}' is registered twice")]
    DuplicateGenerator(String),

    #[error("event generator '{0}' exceeds the available event type ids")]
    TooManyGenerators(String),

    #[error("malformed content: {0}")]
    Malformed(String),
}

/// Snapshot save/load failures.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error in {file}: {source}")]
    Serde {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("snapshot rejected: {0}")]
    Sim(#[from] SimError),
}

pub type Result<T> = std::result::Result<T, SimError>;
