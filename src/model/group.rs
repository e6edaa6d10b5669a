use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::culture::Culture;
use super::date::{GENERATION_SPAN, WorldDate, date_after};
use super::discovery::DiscoveryKind;
use super::position::WorldPosition;
use super::terrain::TerrainCell;
use crate::id::{ClusterId, GroupId, PolityId, RouteId};

// --- Constants ---

pub const NATURAL_DEATH_RATE: f64 = 0.03;
pub const NATURAL_BIRTH_RATE: f64 = 0.105;
/// Net growth per generation for a group below its optimal population.
pub const NATURAL_GROWTH_RATE: f64 = NATURAL_BIRTH_RATE - NATURAL_DEATH_RATE;

/// People supported per unit of area at full foraging and survivability.
pub const POPULATION_CONSTANT: f64 = 10.0;

/// Base update interval weight in the next-update-date formula.
pub const UPDATE_INTERVAL_BASE: f64 = 2000.0;

/// Core distance assigned to prominences not reachable from their core.
pub const MAX_CORE_DISTANCE: f64 = 1.0e12;

// ---------------------------------------------------------------------------
// Polity prominence
// ---------------------------------------------------------------------------

/// A polity's influence over one group. Identified by `(group, polity)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolityProminence {
    pub polity: PolityId,
    /// 0..1 share of the group's allegiance.
    pub value: f64,
    /// Kilometres along the prominence graph to the polity's core group.
    pub core_distance: f64,
    pub cluster: Option<ClusterId>,
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// A population split in flight from its source group to a target cell.
/// Lives on the source group until the arrival event consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratingGroup {
    pub target: WorldPosition,
    /// Share of the source population that leaves when the event fires.
    pub percentage: f64,
    pub trigger_date: WorldDate,
}

// ---------------------------------------------------------------------------
// CellGroup
// ---------------------------------------------------------------------------

/// A population living in one terrain cell.
///
/// Everything needed to rebuild this group's pending events after a reload is
/// kept here: the next update date, the in-flight migration, pending
/// discovery and tribe formation dates, and generator event dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellGroup {
    pub id: GroupId,
    pub position: WorldPosition,
    pub population: u64,
    pub culture: Culture,
    pub last_update_date: WorldDate,
    pub next_update_date: WorldDate,
    pub optimal_population: u64,
    pub still_present: bool,

    pub prominences: BTreeMap<PolityId, PolityProminence>,
    pub pending_migration: Option<MigratingGroup>,
    pub pending_discoveries: BTreeMap<DiscoveryKind, WorldDate>,
    pub tribe_formation_date: Option<WorldDate>,
    /// Generator id to trigger date, one per generator currently set.
    pub generator_events: BTreeMap<String, WorldDate>,
    /// "Event set" flags raised by content generators.
    pub flags: BTreeSet<String>,
    pub sea_route: Option<RouteId>,
}

impl CellGroup {
    pub fn new(
        id: GroupId,
        position: WorldPosition,
        population: u64,
        culture: Culture,
        date: WorldDate,
    ) -> Self {
        Self {
            id,
            position,
            population,
            culture,
            last_update_date: date,
            next_update_date: date,
            optimal_population: 0,
            still_present: true,
            prominences: BTreeMap::new(),
            pending_migration: None,
            pending_discoveries: BTreeMap::new(),
            tribe_formation_date: None,
            generator_events: BTreeMap::new(),
            flags: BTreeSet::new(),
            sea_route: None,
        }
    }

    /// `population / optimal` clamped to `[0, 1]`.
    pub fn population_stress(&self) -> f64 {
        (self.population as f64 / self.optimal_population.max(1) as f64).clamp(0.0, 1.0)
    }

    pub fn total_prominence(&self) -> f64 {
        self.prominences.values().map(|p| p.value).sum()
    }

    /// Polity with the largest prominence value; ties go to the lower id.
    pub fn highest_prominence(&self) -> Option<&PolityProminence> {
        let mut best: Option<&PolityProminence> = None;
        for p in self.prominences.values() {
            if best.is_none_or(|b| p.value > b.value) {
                best = Some(p);
            }
        }
        best
    }

    pub fn prominence_value(&self, polity: PolityId) -> f64 {
        self.prominences.get(&polity).map_or(0.0, |p| p.value)
    }
}

// ---------------------------------------------------------------------------
// Update math
// ---------------------------------------------------------------------------

/// Foraging capacity and survivability of a culture in a cell.
///
/// Only biomes the culture has a survival skill for contribute.
pub fn calculate_adaption(culture: &Culture, cell: &TerrainCell) -> (f64, f64) {
    let mut foraging = 0.0;
    let mut survivability = 0.0;
    for skill in culture.skills.values() {
        let Some(biome) = skill.biome else { continue };
        let presence = cell.biome_presence(biome);
        if presence <= 0.0 {
            continue;
        }
        let base = biome.survivability();
        foraging += biome.foraging_capacity() * skill.value * presence;
        survivability += (base + skill.value * (1.0 - base)) * presence;
    }
    (foraging, survivability)
}

pub fn optimal_population(culture: &Culture, cell: &TerrainCell) -> u64 {
    let (foraging, survivability) = calculate_adaption(culture, cell);
    let optimal = POPULATION_CONSTANT * cell.area * foraging * survivability;
    if optimal.is_finite() && optimal > 0.0 {
        optimal.floor() as u64
    } else {
        0
    }
}

/// Presence-weighted biome skill of a culture in a cell, in `[0, 1]`.
pub fn skill_adaptation_level(culture: &Culture, cell: &TerrainCell) -> f64 {
    cell.biome_presences
        .iter()
        .map(|(biome, presence)| culture.skill_value(*biome) * presence)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// Closed-form population after `time_span` years.
///
/// Below optimal the population follows a logistic-like approach; above it
/// decays exponentially. Handles arbitrarily long spans in constant time.
pub fn population_after_time(population: u64, optimal: u64, time_span: WorldDate) -> u64 {
    if time_span <= 0 || population == optimal {
        return population;
    }
    let pop = population as f64;
    let opt = optimal as f64;
    let time_factor = NATURAL_GROWTH_RATE * time_span as f64 / GENERATION_SPAN as f64;

    if population < optimal {
        let base = 1.0 - pop / opt;
        let exponent = 2f64.powf(time_factor);
        let value = opt * (1.0 - base.powf(exponent));
        return value.floor().clamp(0.0, opt) as u64;
    }

    let value = opt + (pop - opt) * (-time_factor).exp();
    value.floor().max(0.0) as u64
}

/// Adaptive next update date. The interval shrinks when the population is
/// far from optimal and grows with skill adaptation near equilibrium.
pub fn next_update_date(
    current: WorldDate,
    population: u64,
    optimal: u64,
    adaptation_level: f64,
) -> Option<WorldDate> {
    let skill_level_factor = (1.0 + 99.0 * adaptation_level) / 100.0;
    let opt = optimal as f64;
    let distance = (opt - population as f64).abs();
    let mix = skill_level_factor * (UPDATE_INTERVAL_BASE + opt) / (1.0 + distance);
    let final_factor = mix.max(1.0).floor();
    date_after(current, GENERATION_SPAN as f64 * final_factor)
}
