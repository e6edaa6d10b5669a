use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::date::WorldDate;
use crate::id::{ClusterId, FactionId, GroupId, LanguageId, PolityId, RegionId};
use crate::rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PolityKind {
    Tribe,
}

string_enum!(PolityKind {
    Tribe => "tribe",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FactionKind {
    Clan,
}

string_enum!(FactionKind {
    Clan => "clan",
});

/// A political entity whose influence is spread over groups as prominences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polity {
    pub id: PolityId,
    pub kind: PolityKind,
    pub name: String,
    pub core_group: GroupId,
    pub core_region: Option<RegionId>,
    pub language: LanguageId,
    pub formation_date: WorldDate,
    pub parent: Option<PolityId>,
    pub still_present: bool,

    pub factions: BTreeSet<FactionId>,
    pub dominant_faction: Option<FactionId>,
    pub clusters: BTreeSet<ClusterId>,

    /// Trigger date of the pending tribe split event, if one is scheduled.
    pub split_event_date: Option<WorldDate>,

    // Aggregates refreshed after every event that touches the polity.
    pub total_population: f64,
    pub prominence_area: usize,
    pub administrative_cost: f64,
}

impl Polity {
    pub fn new(
        id: PolityId,
        kind: PolityKind,
        name: String,
        core_group: GroupId,
        language: LanguageId,
        formation_date: WorldDate,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            core_group,
            core_region: None,
            language,
            formation_date,
            parent: None,
            still_present: true,
            factions: BTreeSet::new(),
            dominant_faction: None,
            clusters: BTreeSet::new(),
            split_event_date: None,
            total_population: 0.0,
            prominence_area: 0,
            administrative_cost: 0.0,
        }
    }

    pub fn rng_key(&self) -> u64 {
        rng::polity_key(self.id.raw())
    }

    pub fn random_float(&self, world_seed: u64, date: WorldDate, offset: u32) -> f64 {
        rng::local_random_float(world_seed, self.rng_key(), date, offset)
    }
}

/// A sub-polity political unit holding part of the polity's prominence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub kind: FactionKind,
    pub name: String,
    pub polity: PolityId,
    pub core_group: GroupId,
    /// Share of the polity's internal influence, 0..1.
    pub influence: f64,
    pub still_present: bool,
}
