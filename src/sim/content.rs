use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use super::event::type_ids;
use crate::error::{ContentError, SimError};
use crate::id::GroupId;
use crate::model::culture::entry_rng_offset;
use crate::model::{CellGroup, DiscoveryKind, World, WorldDate, date_after};
use crate::rng::offsets;

/// A pluggable source of group events.
///
/// Every group consults every registered generator when it schedules its
/// next update. Implementations must be deterministic in the world state
/// they are given.
pub trait CellGroupEventGenerator: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    /// Flag set on a group while one of this generator's events is pending.
    fn event_set_flag(&self) -> String {
        format!("{}_set", self.id())
    }

    fn can_assign_to(&self, group: &CellGroup, world: &World) -> bool;

    /// `None` when no supported date can be computed.
    fn calculate_trigger_date(&self, group: &CellGroup, world: &World) -> Option<WorldDate>;

    fn can_trigger(&self, group: &CellGroup, world: &World) -> bool;

    fn trigger(&self, group: GroupId, world: &mut World) -> Result<(), SimError>;
}

struct Registered {
    type_id: i64,
    generator: Box<dyn CellGroupEventGenerator>,
}

/// Event generators keyed by id. Built before the run and read-only after.
#[derive(Default)]
pub struct ContentRegistry {
    entries: Vec<Registered>,
    by_id: BTreeMap<String, usize>,
}

impl fmt::Debug for ContentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentRegistry")
            .field("generators", &self.by_id.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator and return the event type id assigned to it.
    pub fn register(
        &mut self,
        generator: Box<dyn CellGroupEventGenerator>,
    ) -> Result<i64, ContentError> {
        let id = generator.id().to_string();
        if id.trim().is_empty() {
            return Err(ContentError::EmptyGeneratorId);
        }
        if self.by_id.contains_key(&id) {
            return Err(ContentError::DuplicateGenerator(id));
        }
        let type_id = type_ids::GENERATOR_BASE + self.entries.len() as i64;
        if type_id > type_ids::GENERATOR_MAX {
            return Err(ContentError::TooManyGenerators(id));
        }
        self.by_id.insert(id, self.entries.len());
        self.entries.push(Registered { type_id, generator });
        Ok(type_id)
    }

    pub fn generator(&self, id: &str) -> Option<&dyn CellGroupEventGenerator> {
        self.by_id
            .get(id)
            .map(|&i| self.entries[i].generator.as_ref())
    }

    pub fn type_id_of(&self, id: &str) -> Option<i64> {
        self.by_id.get(id).map(|&i| self.entries[i].type_id)
    }

    /// Generators in registration order with their type ids.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &dyn CellGroupEventGenerator)> {
        self.entries
            .iter()
            .map(|e| (e.type_id, e.generator.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a registry from a TOML document of `[[knowledge_boost]]` tables.
    pub fn from_toml_str(source: &str) -> Result<Self, ContentError> {
        let file: ContentFile =
            toml::from_str(source).map_err(|e| ContentError::Malformed(e.to_string()))?;
        let mut registry = Self::new();
        for generator in file.knowledge_boost {
            generator.validate()?;
            registry.register(Box::new(generator))?;
        }
        Ok(registry)
    }
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    #[serde(default)]
    knowledge_boost: Vec<KnowledgeBoostGenerator>,
}

/// Data-driven generator: a group that meets the prerequisites eventually
/// gains a boost to one knowledge.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBoostGenerator {
    pub id: String,
    pub knowledge: String,
    pub knowledge_name: String,
    /// Mean years until the event triggers.
    pub mean_span: f64,
    #[serde(default)]
    pub min_population: u64,
    pub boost: f64,
    #[serde(default = "default_limit")]
    pub limit: f64,
    #[serde(default)]
    pub required_discovery: Option<DiscoveryKind>,
}

fn default_limit() -> f64 {
    1.0
}

impl KnowledgeBoostGenerator {
    fn validate(&self) -> Result<(), ContentError> {
        if self.knowledge.trim().is_empty() {
            return Err(ContentError::Malformed(format!(
                "generator '{}' names no knowledge",
                self.id
            )));
        }
        if !(self.mean_span.is_finite() && self.mean_span > 0.0) {
            return Err(ContentError::Malformed(format!(
                "generator '{}' needs a positive mean_span",
                self.id
            )));
        }
        if !(0.0..=1.0).contains(&self.boost) || !(0.0..=1.0).contains(&self.limit) {
            return Err(ContentError::Malformed(format!(
                "generator '{}' boost and limit must be within 0..=1",
                self.id
            )));
        }
        Ok(())
    }
}

impl CellGroupEventGenerator for KnowledgeBoostGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn can_assign_to(&self, group: &CellGroup, _world: &World) -> bool {
        group.population >= self.min_population
            && group.culture.knowledge_value(&self.knowledge) < self.limit
            && self
                .required_discovery
                .is_none_or(|d| group.culture.has_discovery(d))
    }

    fn calculate_trigger_date(&self, group: &CellGroup, world: &World) -> Option<WorldDate> {
        let cell = world.terrain.cell(group.position)?;
        let r = cell.random_float(
            world.seed,
            world.current_date,
            offsets::GENERATOR_DATE + entry_rng_offset(&self.id),
        );
        let span = (self.mean_span * (0.5 + r)).max(1.0);
        date_after(world.current_date, span)
    }

    fn can_trigger(&self, group: &CellGroup, _world: &World) -> bool {
        group.population >= self.min_population
    }

    fn trigger(&self, group: GroupId, world: &mut World) -> Result<(), SimError> {
        let culture = &mut world.group_mut(group)?.culture;
        culture.add_knowledge(&self.knowledge, &self.knowledge_name, 0.0, self.limit);
        if let Some(k) = culture.knowledges.get_mut(&self.knowledge) {
            k.value = (k.value + self.boost).min(self.limit.max(k.value));
        }
        Ok(())
    }
}
