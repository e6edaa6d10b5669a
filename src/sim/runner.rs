use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::content::ContentRegistry;
use super::context::EventContext;
use super::event::EventState;
use super::{group_update, polity};
use crate::error::{SimError, SnapshotError};
use crate::flush::save_snapshot;
use crate::id::GroupId;
use crate::model::group::optimal_population;
use crate::model::{CellGroup, Culture, World, WorldDate, WorldPhase, WorldPosition};
use crate::worldgen::{WorldGenConfig, generate_world};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Population of the founding group.
    pub initial_population: u64,
    /// Cell for the founding group. The most habitable cell when unset.
    pub start_position: Option<WorldPosition>,
    /// Date the run stops at, inclusive.
    pub end_date: WorldDate,
    /// If set, save a snapshot every N years.
    pub snapshot_interval: Option<WorldDate>,
    /// Directory to write snapshots into.
    pub output_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_population: 1_000,
            start_position: None,
            end_date: 10_000,
            snapshot_interval: None,
            output_dir: None,
        }
    }
}

/// Counters over every popped event. Two runs with the same seed, content
/// and end date produce identical stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub events_popped: u64,
    pub fired: u64,
    /// Popped after their target moved on or disappeared.
    pub discarded: u64,
    /// Still valid but not ready to trigger.
    pub not_triggered: u64,
}

/// What happened to one popped event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOutcome {
    pub id: i64,
    pub type_id: i64,
    pub trigger_date: WorldDate,
    pub fired: bool,
    /// Lifecycle state the event ended in: `Fired` or `Discarded`.
    pub state: EventState,
}

/// A world plus the content driving it.
#[derive(Debug)]
pub struct Simulation {
    pub world: World,
    pub content: ContentRegistry,
    pub stats: RunStats,
}

impl Simulation {
    /// Wrap a world that is already set up, such as a resolved snapshot.
    pub fn new(mut world: World, content: ContentRegistry) -> Self {
        world.phase = WorldPhase::Running;
        Self {
            world,
            content,
            stats: RunStats::default(),
        }
    }

    /// Generate terrain, place the founding group, and start the clock.
    pub fn generate(
        worldgen: &WorldGenConfig,
        config: &SimConfig,
        content: ContentRegistry,
    ) -> Result<Self, SimError> {
        let mut world = generate_world(worldgen)?;
        initialize_world(&mut world, &content, config)?;
        Ok(Self::new(world, content))
    }

    /// Pop and process the next event. `None` once the queue is empty.
    pub fn step(&mut self) -> Result<Option<EventOutcome>, SimError> {
        let Some(mut event) = self.world.queue.pop_next() else {
            return Ok(None);
        };
        if event.trigger_date < self.world.current_date {
            return Err(SimError::EventInPast {
                event_id: event.id,
                trigger_date: event.trigger_date,
                current_date: self.world.current_date,
            });
        }
        self.stats.events_popped += 1;
        self.world.current_date = event.trigger_date;

        let mut outcome = EventOutcome {
            id: event.id,
            type_id: event.type_id,
            trigger_date: event.trigger_date,
            fired: false,
            state: EventState::Discarded,
        };

        let mut ctx = EventContext::new(&mut self.world, &self.content);
        if !event.is_still_valid(ctx.world) {
            event.discard();
            self.stats.discarded += 1;
            debug!(id = event.id, type_id = event.type_id, date = event.trigger_date, "stale event dropped");
            event.cleanup(&mut ctx)?;
            return Ok(Some(outcome));
        }
        if event.can_trigger(ctx.world, ctx.content) {
            event.trigger(&mut ctx)?;
            self.stats.fired += 1;
            outcome.fired = true;
        } else {
            event.discard();
            self.stats.not_triggered += 1;
        }
        outcome.state = event.state;
        debug!(
            id = event.id,
            type_id = event.type_id,
            date = event.trigger_date,
            fired = outcome.fired,
            "event processed"
        );
        event.cleanup(&mut ctx)?;

        group_update::remove_dead_groups(&mut self.world)?;
        polity::refresh_polities(&mut self.world)?;
        Ok(Some(outcome))
    }

    /// Process every event dated at or before `end_date`.
    pub fn run_until(&mut self, end_date: WorldDate) -> Result<RunStats, SimError> {
        while self.world.queue.peek_date().is_some_and(|d| d <= end_date) {
            self.step()?;
        }
        if self.world.current_date < end_date {
            self.world.current_date = end_date;
        }
        Ok(self.stats)
    }

    /// Run to `config.end_date`, saving a snapshot every
    /// `config.snapshot_interval` years and at the end.
    pub fn run(&mut self, config: &SimConfig) -> Result<RunStats, SnapshotError> {
        let checkpoints = match (config.snapshot_interval, &config.output_dir) {
            (Some(interval), Some(dir)) if interval > 0 => Some((interval, dir)),
            _ => None,
        };
        let Some((interval, dir)) = checkpoints else {
            let stats = self.run_until(config.end_date)?;
            self.log_summary();
            return Ok(stats);
        };

        let mut next = self.world.current_date;
        while next < config.end_date {
            next = next.saturating_add(interval).min(config.end_date);
            self.run_until(next)?;
            let checkpoint_dir = dir.join(format!("date_{next:09}"));
            save_snapshot(&self.world, &checkpoint_dir)?;
            info!(date = next, dir = %checkpoint_dir.display(), "snapshot saved");
        }
        self.log_summary();
        Ok(self.stats)
    }

    pub fn log_summary(&self) {
        info!(
            date = self.world.current_date,
            groups = self.world.groups.len(),
            population = self.world.total_population(),
            polities = self.world.polities.len(),
            regions = self.world.regions.len(),
            events_popped = self.stats.events_popped,
            fired = self.stats.fired,
            queued = self.world.queue.len(),
            "simulation summary"
        );
    }
}

/// Place the founding group and queue its first events.
pub fn initialize_world(
    world: &mut World,
    content: &ContentRegistry,
    config: &SimConfig,
) -> Result<GroupId, SimError> {
    world.phase = WorldPhase::Initializing;
    let position = match config.start_position {
        Some(p) => p,
        None => most_habitable_cell(world).ok_or_else(|| {
            SimError::invariant("world", world.current_date, "initialize_world", "no habitable cell")
        })?,
    };
    let cell = world.cell(position)?;
    let culture = Culture::founding(cell, world.config.starting_skill, None);
    let id = world.new_group_id();
    let group = CellGroup::new(
        id,
        position,
        config.initial_population,
        culture,
        world.current_date,
    );
    group_update::spawn_group(world, content, group)?;
    info!(group = %id, %position, population = config.initial_population, "founding group placed");
    Ok(id)
}

/// Land cell with the highest carrying capacity for a founding culture.
/// Ties go to the first cell in row-major order.
fn most_habitable_cell(world: &World) -> Option<WorldPosition> {
    let mut best: Option<(u64, WorldPosition)> = None;
    for cell in world.terrain.cells() {
        if cell.water_presence() >= 1.0 {
            continue;
        }
        let culture = Culture::founding(cell, world.config.starting_skill, None);
        let capacity = optimal_population(&culture, cell);
        if capacity > 0 && best.is_none_or(|(c, _)| capacity > c) {
            best = Some((capacity, cell.position));
        }
    }
    best.map(|(_, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{EventKind, EventTarget, WorldEvent};
    use crate::testutil::{grass_world, island_world, place_group};

    fn small_config() -> SimConfig {
        SimConfig {
            initial_population: 500,
            end_date: 2_000,
            ..SimConfig::default()
        }
    }

    #[test]
    fn founding_group_lands_on_habitable_cell() {
        let mut world = island_world();
        let content = ContentRegistry::new();
        let id = initialize_world(&mut world, &content, &small_config()).unwrap();
        let group = world.group(id).unwrap();
        assert!(world.cell(group.position).unwrap().water_presence() < 1.0);
        let pending = world.queue.pending_for(EventTarget::Group(id));
        assert!(pending.iter().any(|e| e.kind == EventKind::UpdateCellGroup { group: id }));
    }

    #[test]
    fn empty_queue_is_a_noop() {
        let world = grass_world(3, 3);
        let mut sim = Simulation::new(world, ContentRegistry::new());
        assert_eq!(sim.step().unwrap(), None);
        let stats = sim.run_until(500).unwrap();
        assert_eq!(stats, RunStats::default());
        assert_eq!(sim.world.current_date, 500);
    }

    #[test]
    fn clock_never_moves_backward() {
        let mut world = grass_world(6, 4);
        let content = ContentRegistry::new();
        initialize_world(&mut world, &content, &small_config()).unwrap();
        let mut sim = Simulation::new(world, content);
        let mut last = 0;
        for _ in 0..200 {
            let Some(outcome) = sim.step().unwrap() else { break };
            assert!(outcome.trigger_date >= last);
            assert_eq!(sim.world.current_date, outcome.trigger_date);
            last = outcome.trigger_date;
        }
        assert!(sim.stats.events_popped > 0);
        assert_eq!(
            sim.stats.events_popped,
            sim.stats.fired + sim.stats.discarded + sim.stats.not_triggered
        );
    }

    #[test]
    fn stale_update_is_discarded() {
        let mut world = grass_world(3, 3);
        let pos = WorldPosition::new(1, 1);
        let id = place_group(&mut world, pos, 200);
        world.group_mut(id).unwrap().next_update_date = 101;
        let event =
            WorldEvent::for_group(EventKind::UpdateCellGroup { group: id }, pos, 0, 100).unwrap();
        world.insert_event(event).unwrap();

        let mut sim = Simulation::new(world, ContentRegistry::new());
        let outcome = sim.step().unwrap().unwrap();
        assert!(!outcome.fired);
        assert_eq!(outcome.trigger_date, 100);
        assert_eq!(sim.stats.discarded, 1);
        assert_eq!(outcome.state, EventState::Discarded);
        assert!(sim.world.queue.is_empty());
        assert_eq!(sim.world.group(id).unwrap().population, 200);
        assert_eq!(sim.world.group(id).unwrap().next_update_date, 101);
    }

    #[test]
    fn stale_generated_event_leaves_newer_marker() {
        let mut world = grass_world(3, 3);
        let pos = WorldPosition::new(1, 1);
        let id = place_group(&mut world, pos, 200);
        let group = world.group_mut(id).unwrap();
        group.next_update_date = WorldDate::MAX;
        group.generator_events.insert("boost".into(), 150);
        group.flags.insert("boost_set".into());
        let kind = EventKind::Generated {
            group: id,
            generator: "boost".into(),
            type_id: crate::sim::type_ids::GENERATOR_BASE,
        };
        let event = WorldEvent::for_group(kind, pos, 0, 100).unwrap();
        world.insert_event(event).unwrap();

        let mut sim = Simulation::new(world, ContentRegistry::new());
        let outcome = sim.step().unwrap().unwrap();
        assert!(!outcome.fired);
        assert_eq!(outcome.state, EventState::Discarded);
        assert_eq!(sim.stats.discarded, 1);

        let group = sim.world.group(id).unwrap();
        assert_eq!(group.generator_events.get("boost"), Some(&150));
        assert!(group.flags.contains("boost_set"));
    }

    #[test]
    fn run_until_stops_at_end_date() {
        let mut world = grass_world(6, 4);
        let content = ContentRegistry::new();
        initialize_world(&mut world, &content, &small_config()).unwrap();
        let mut sim = Simulation::new(world, content);
        sim.run_until(1_000).unwrap();
        assert_eq!(sim.world.current_date, 1_000);
        assert!(sim.world.queue.peek_date().is_none_or(|d| d > 1_000));
    }

    #[test]
    fn config_reads_partial_toml() {
        let config: SimConfig = toml::from_str("end_date = 50\ninitial_population = 20").unwrap();
        assert_eq!(config.end_date, 50);
        assert_eq!(config.initial_population, 20);
        assert_eq!(config.snapshot_interval, None);
    }
}
