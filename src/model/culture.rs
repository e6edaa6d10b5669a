use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::biome::Biome;
use super::date::{GENERATION_SPAN, WorldDate};
use super::discovery::DiscoveryKind;
use super::terrain::TerrainCell;
use crate::id::LanguageId;
use crate::rng::offsets;

// --- Constants ---

/// Years for a cultural value to close half the gap to its random target.
pub const TIME_EFFECT_CONSTANT: f64 = (GENERATION_SPAN * 500) as f64;

/// Knowledge moves an order of magnitude faster than customs.
pub const KNOWLEDGE_TIME_EFFECT_CONSTANT: f64 = (GENERATION_SPAN * 50) as f64;

/// Largest fraction of the remaining range a single update may aim for.
pub const MAX_CHANGE_DELTA: f64 = 0.2;

/// Population at which social organization knowledge can reach its maximum.
pub const SOCIAL_ORGANIZATION_POPULATION_SCALE: f64 = 5_000.0;

/// Shipbuilding knowledge ceiling for groups away from the coast.
pub const INLAND_SHIPBUILDING_LIMIT: f64 = 0.2;

/// Well-known cultural entry ids.
pub mod ids {
    pub const AUTHORITY: &str = "authority";
    pub const COHESION: &str = "cohesion";

    pub const FORAGING: &str = "foraging";
    pub const FISHING: &str = "fishing";
    pub const FARMING: &str = "farming";

    pub const SHIPBUILDING: &str = "shipbuilding";
    pub const SOCIAL_ORGANIZATION: &str = "social_organization";
    pub const AGRICULTURE: &str = "agriculture";
}

/// Stable per-entry offset into the owning cell's random stream (FNV-1a).
pub fn entry_rng_offset(id: &str) -> u32 {
    let mut hash: u32 = 0x811C_9DC5;
    for byte in id.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash % 1000
}

/// Move `value` toward a random target inside `[min, max]` over `time_span`
/// years, then clamp to `[0, 1]`.
///
/// `random` is a draw in `[0, 1)`; values above one half pull down, below
/// one half push up.
pub fn drift_value(
    value: f64,
    random: f64,
    min: f64,
    max: f64,
    time_span: WorldDate,
    time_effect_constant: f64,
) -> f64 {
    let modifier = 1.0 - random * 2.0;
    let factor = MAX_CHANGE_DELTA * modifier;
    let target = if factor > 0.0 {
        value + (max - value) * factor
    } else {
        value - (min - value) * factor
    };
    let t = time_span as f64;
    let time_effect = t / (t + time_effect_constant);
    let new_value = value * (1.0 - time_effect) + target * time_effect;
    new_value.clamp(0.0, 1.0)
}

fn blend(own: f64, other: f64, percentage: f64) -> f64 {
    (own * (1.0 - percentage) + other * percentage).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalPreference {
    pub id: String,
    pub name: String,
    pub rng_offset: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalActivity {
    pub id: String,
    pub name: String,
    pub rng_offset: u32,
    pub value: f64,
    /// Share of the group's effort; recomputed from values after each update.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalSkill {
    pub id: String,
    pub name: String,
    pub rng_offset: u32,
    pub value: f64,
    /// Set for biome survival skills.
    pub biome: Option<Biome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalKnowledge {
    pub id: String,
    pub name: String,
    pub rng_offset: u32,
    pub value: f64,
    /// Ceiling the value approaches; recomputed from the group's situation.
    pub limit: f64,
}

// ---------------------------------------------------------------------------
// Culture
// ---------------------------------------------------------------------------

/// Values, skills, and discoveries owned by one group. Every collection is
/// keyed by a stable id and never holds two entries with the same id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Culture {
    pub language: Option<LanguageId>,
    pub preferences: BTreeMap<String, CulturalPreference>,
    pub activities: BTreeMap<String, CulturalActivity>,
    pub skills: BTreeMap<String, CulturalSkill>,
    pub knowledges: BTreeMap<String, CulturalKnowledge>,
    pub discoveries: BTreeSet<DiscoveryKind>,
}

/// What a culture update needs to know about the group owning it.
pub struct CultureEnvironment<'a> {
    pub world_seed: u64,
    pub date: WorldDate,
    pub cell: &'a TerrainCell,
    pub population: u64,
    /// `(prominence value, core group culture)` per polity influencing the group.
    pub polity_influences: Vec<(f64, &'a Culture)>,
}

impl Culture {
    /// Culture of a group founded from nothing in `cell`.
    pub fn founding(cell: &TerrainCell, starting_skill: f64, language: Option<LanguageId>) -> Self {
        let mut culture = Culture {
            language,
            ..Culture::default()
        };
        culture.add_activity(ids::FORAGING, "Foraging", 1.0, 1.0);
        culture.add_knowledge(ids::SOCIAL_ORGANIZATION, "Social Organization", 0.1, 1.0);
        for &(biome, presence) in &cell.biome_presences {
            if !biome.is_water() {
                culture.add_biome_skill(biome, starting_skill.min(presence));
            }
        }
        culture
    }

    pub fn add_preference(&mut self, id: &str, name: &str, value: f64) -> bool {
        if self.preferences.contains_key(id) {
            return false;
        }
        self.preferences.insert(
            id.to_string(),
            CulturalPreference {
                id: id.to_string(),
                name: name.to_string(),
                rng_offset: entry_rng_offset(id),
                value,
            },
        );
        true
    }

    pub fn add_activity(&mut self, id: &str, name: &str, value: f64, contribution: f64) -> bool {
        if self.activities.contains_key(id) {
            return false;
        }
        self.activities.insert(
            id.to_string(),
            CulturalActivity {
                id: id.to_string(),
                name: name.to_string(),
                rng_offset: entry_rng_offset(id),
                value,
                contribution,
            },
        );
        true
    }

    pub fn add_biome_skill(&mut self, biome: Biome, value: f64) -> bool {
        let id = biome.skill_id();
        if self.skills.contains_key(&id) {
            return false;
        }
        self.skills.insert(
            id.clone(),
            CulturalSkill {
                rng_offset: entry_rng_offset(&id),
                name: format!("{} Survival", biome.region_noun()),
                id,
                value,
                biome: Some(biome),
            },
        );
        true
    }

    pub fn add_knowledge(&mut self, id: &str, name: &str, value: f64, limit: f64) -> bool {
        if self.knowledges.contains_key(id) {
            return false;
        }
        self.knowledges.insert(
            id.to_string(),
            CulturalKnowledge {
                id: id.to_string(),
                name: name.to_string(),
                rng_offset: entry_rng_offset(id),
                value,
                limit,
            },
        );
        true
    }

    pub fn has_discovery(&self, kind: DiscoveryKind) -> bool {
        self.discoveries.contains(&kind)
    }

    /// Add a discovery and its consequences. Returns false if already held.
    pub fn gain_discovery(&mut self, kind: DiscoveryKind) -> bool {
        if !self.discoveries.insert(kind) {
            return false;
        }
        kind.on_gain(self);
        true
    }

    /// Remove every discovery the culture can no longer sustain.
    pub fn drop_unholdable_discoveries(&mut self) -> Vec<DiscoveryKind> {
        let mut lost = Vec::new();
        loop {
            let Some(kind) = self
                .discoveries
                .iter()
                .copied()
                .find(|k| !k.can_be_held(self))
            else {
                break;
            };
            self.discoveries.remove(&kind);
            kind.on_loss(self);
            lost.push(kind);
        }
        lost
    }

    pub fn knowledge_value(&self, id: &str) -> f64 {
        self.knowledges.get(id).map_or(0.0, |k| k.value)
    }

    pub fn skill_value(&self, biome: Biome) -> f64 {
        self.skills.get(&biome.skill_id()).map_or(0.0, |s| s.value)
    }

    /// Add zero-valued survival skills for every land biome in `cell`.
    pub fn initialize_biome_skills(&mut self, cell: &TerrainCell) {
        for &(biome, _) in &cell.biome_presences {
            if !biome.is_water() {
                self.add_biome_skill(biome, 0.0);
            }
        }
    }

    /// Evolve every valued entry over `time_span` years.
    pub fn update(&mut self, env: &CultureEnvironment<'_>, time_span: WorldDate) {
        if time_span <= 0 {
            return;
        }
        let draw = |offset: u32| env.cell.random_float(env.world_seed, env.date, offset);

        for p in self.preferences.values_mut() {
            let r = draw(offsets::CULTURE_PREFERENCE + p.rng_offset);
            p.value = drift_value(p.value, r, 0.0, 1.0, time_span, TIME_EFFECT_CONSTANT);
        }

        for a in self.activities.values_mut() {
            let r = draw(offsets::CULTURE_ACTIVITY + a.rng_offset);
            a.value = drift_value(a.value, r, 0.0, 1.0, time_span, TIME_EFFECT_CONSTANT);
        }

        for s in self.skills.values_mut() {
            let max = s.biome.map_or(1.0, |b| env.cell.biome_presence(b));
            let r = draw(offsets::CULTURE_SKILL + s.rng_offset);
            s.value = drift_value(s.value, r, 0.0, max, time_span, TIME_EFFECT_CONSTANT);
        }

        for k in self.knowledges.values_mut() {
            k.limit = match k.id.as_str() {
                ids::SOCIAL_ORGANIZATION => {
                    (env.population as f64 / SOCIAL_ORGANIZATION_POPULATION_SCALE).clamp(0.1, 1.0)
                }
                ids::SHIPBUILDING if !env.cell.is_part_of_coastline => INLAND_SHIPBUILDING_LIMIT,
                _ => 1.0,
            };
            let r = draw(offsets::CULTURE_KNOWLEDGE + k.rng_offset);
            // Knowledge only ever aims at its limit; the draw scales the pace.
            let t = time_span as f64;
            let time_effect = t / (t + KNOWLEDGE_TIME_EFFECT_CONSTANT);
            k.value = (k.value + (k.limit - k.value) * time_effect * (0.5 + r)).clamp(0.0, 1.0);
        }

        self.apply_polity_influence(env, time_span);
        self.recompute_contributions();
    }

    /// Pull activities and preferences toward the cultures of influencing
    /// polities' core groups, adopting entries this culture lacks.
    fn apply_polity_influence(&mut self, env: &CultureEnvironment<'_>, time_span: WorldDate) {
        let t = time_span as f64;
        let time_effect = t / (t + TIME_EFFECT_CONSTANT);
        for (i, (prominence, core)) in env.polity_influences.iter().enumerate() {
            if *prominence <= 0.0 {
                continue;
            }
            let r = env
                .cell
                .random_float(env.world_seed, env.date, offsets::CULTURE_POLITY_INFLUENCE + i as u32);
            let pull = (prominence * time_effect * r).clamp(0.0, 1.0);

            for (id, theirs) in &core.activities {
                self.add_activity(id, &theirs.name, 0.0, 0.0);
                if let Some(ours) = self.activities.get_mut(id) {
                    ours.value = blend(ours.value, theirs.value, pull);
                }
            }
            for (id, theirs) in &core.preferences {
                self.add_preference(id, &theirs.name, 0.0);
                if let Some(ours) = self.preferences.get_mut(id) {
                    ours.value = blend(ours.value, theirs.value, pull);
                }
            }
        }
    }

    fn recompute_contributions(&mut self) {
        let total: f64 = self.activities.values().map(|a| a.value).sum();
        for a in self.activities.values_mut() {
            a.contribution = if total > 0.0 { a.value / total } else { 0.0 };
        }
    }

    /// Blend `other` into this culture, where `percentage` is the share of
    /// the merged population that `other` represents.
    pub fn merge(&mut self, other: &Culture, percentage: f64) {
        let p = percentage.clamp(0.0, 1.0);

        for a in self.preferences.values_mut() {
            let theirs = other.preferences.get(&a.id).map_or(0.0, |o| o.value);
            a.value = blend(a.value, theirs, p);
        }
        for (id, o) in &other.preferences {
            if self.add_preference(id, &o.name, 0.0) {
                self.preferences.entry(id.clone()).and_modify(|e| e.value = o.value * p);
            }
        }

        for a in self.activities.values_mut() {
            let theirs = other.activities.get(&a.id).map_or(0.0, |o| o.value);
            a.value = blend(a.value, theirs, p);
        }
        for (id, o) in &other.activities {
            if self.add_activity(id, &o.name, 0.0, 0.0) {
                self.activities.entry(id.clone()).and_modify(|e| e.value = o.value * p);
            }
        }

        for s in self.skills.values_mut() {
            let theirs = other.skills.get(&s.id).map_or(0.0, |o| o.value);
            s.value = blend(s.value, theirs, p);
        }
        for (id, o) in &other.skills {
            if !self.skills.contains_key(id) {
                let mut skill = o.clone();
                skill.value = o.value * p;
                self.skills.insert(id.clone(), skill);
            }
        }

        for k in self.knowledges.values_mut() {
            let theirs = other.knowledges.get(&k.id).map_or(0.0, |o| o.value);
            k.value = blend(k.value, theirs, p);
        }
        for (id, o) in &other.knowledges {
            if !self.knowledges.contains_key(id) {
                let mut knowledge = o.clone();
                knowledge.value = o.value * p;
                self.knowledges.insert(id.clone(), knowledge);
            }
        }

        self.discoveries.extend(other.discoveries.iter().copied());
        self.recompute_contributions();
    }
}
