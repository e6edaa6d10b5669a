use serde::{Deserialize, Serialize};

use super::culture::{Culture, ids};
use super::terrain::TerrainCell;

// --- Constants ---

/// Shipbuilding knowledge needed to discover and keep sailing.
pub const SAILING_MIN_SHIPBUILDING: f64 = 0.3;

/// Social organization knowledge needed to discover and keep tribalism.
pub const TRIBALISM_MIN_SOCIAL_ORGANIZATION: f64 = 0.4;

/// Presence of arable biomes needed before plant cultivation can be found.
pub const PLANT_CULTIVATION_MIN_ARABLE: f64 = 0.5;

/// Knowledge values below this count as lost.
pub const MIN_KNOWLEDGE_VALUE: f64 = 0.01;

/// A culture-wide breakthrough. Each kind has its own discovery event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DiscoveryKind {
    BoatMaking,
    Sailing,
    Tribalism,
    PlantCultivation,
}

string_enum!(DiscoveryKind {
    BoatMaking => "boat_making",
    Sailing => "sailing",
    Tribalism => "tribalism",
    PlantCultivation => "plant_cultivation",
});

impl DiscoveryKind {
    pub const ALL: [DiscoveryKind; 4] = [
        DiscoveryKind::BoatMaking,
        DiscoveryKind::Sailing,
        DiscoveryKind::Tribalism,
        DiscoveryKind::PlantCultivation,
    ];

    /// Mean years until a group that qualifies actually makes the discovery.
    pub fn mean_discovery_span(self) -> f64 {
        match self {
            DiscoveryKind::BoatMaking => 2_000.0,
            DiscoveryKind::Sailing => 4_000.0,
            DiscoveryKind::Tribalism => 1_000.0,
            DiscoveryKind::PlantCultivation => 8_000.0,
        }
    }

    /// Whether a group with `culture` living in `cell` may start working
    /// toward this discovery.
    pub fn can_be_discovered(self, culture: &Culture, cell: &TerrainCell) -> bool {
        if culture.has_discovery(self) {
            return false;
        }
        match self {
            DiscoveryKind::BoatMaking => cell.is_part_of_coastline,
            DiscoveryKind::Sailing => {
                culture.has_discovery(DiscoveryKind::BoatMaking)
                    && culture.knowledge_value(ids::SHIPBUILDING) >= SAILING_MIN_SHIPBUILDING
            }
            DiscoveryKind::Tribalism => {
                culture.knowledge_value(ids::SOCIAL_ORGANIZATION)
                    >= TRIBALISM_MIN_SOCIAL_ORGANIZATION
            }
            DiscoveryKind::PlantCultivation => {
                let arable = cell.biome_presence(super::Biome::Grassland)
                    + cell.biome_presence(super::Biome::Forest);
                arable >= PLANT_CULTIVATION_MIN_ARABLE
            }
        }
    }

    /// Whether a culture that already holds the discovery keeps it.
    pub fn can_be_held(self, culture: &Culture) -> bool {
        match self {
            DiscoveryKind::BoatMaking => {
                culture.knowledge_value(ids::SHIPBUILDING) >= MIN_KNOWLEDGE_VALUE
            }
            DiscoveryKind::Sailing => {
                culture.has_discovery(DiscoveryKind::BoatMaking)
                    && culture.knowledge_value(ids::SHIPBUILDING) >= SAILING_MIN_SHIPBUILDING
            }
            DiscoveryKind::Tribalism => {
                culture.knowledge_value(ids::SOCIAL_ORGANIZATION)
                    >= TRIBALISM_MIN_SOCIAL_ORGANIZATION
            }
            DiscoveryKind::PlantCultivation => {
                culture.knowledge_value(ids::AGRICULTURE) >= MIN_KNOWLEDGE_VALUE
            }
        }
    }

    /// Apply the cultural consequences of gaining this discovery.
    pub fn on_gain(self, culture: &mut Culture) {
        match self {
            DiscoveryKind::BoatMaking => {
                culture.add_knowledge(ids::SHIPBUILDING, "Shipbuilding", 0.1, 1.0);
                culture.add_activity(ids::FISHING, "Fishing", 0.0, 0.0);
            }
            DiscoveryKind::Sailing => {}
            DiscoveryKind::Tribalism => {
                culture.add_preference(ids::AUTHORITY, "Authority", 0.5);
                culture.add_preference(ids::COHESION, "Cohesion", 0.5);
            }
            DiscoveryKind::PlantCultivation => {
                culture.add_knowledge(ids::AGRICULTURE, "Agriculture", 0.1, 1.0);
                culture.add_activity(ids::FARMING, "Farming", 0.0, 0.0);
            }
        }
    }

    /// Apply the cultural consequences of losing this discovery.
    pub fn on_loss(self, culture: &mut Culture) {
        match self {
            DiscoveryKind::BoatMaking => {
                culture.discoveries.remove(&DiscoveryKind::Sailing);
            }
            DiscoveryKind::Sailing => {}
            DiscoveryKind::Tribalism => {
                culture.preferences.remove(ids::AUTHORITY);
            }
            DiscoveryKind::PlantCultivation => {
                culture.activities.remove(ids::FARMING);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Biome, WorldPosition};

    fn cell(biome: Biome, coast: bool) -> TerrainCell {
        let mut cell = TerrainCell::new(WorldPosition::new(0, 0), 10.0, 900.0, 14.0, vec![(biome, 1.0)]);
        cell.is_part_of_coastline = coast;
        cell
    }

    #[test]
    fn boat_making_needs_coast() {
        let culture = Culture::default();
        assert!(DiscoveryKind::BoatMaking.can_be_discovered(&culture, &cell(Biome::Grassland, true)));
        assert!(!DiscoveryKind::BoatMaking.can_be_discovered(&culture, &cell(Biome::Grassland, false)));
    }

    #[test]
    fn sailing_needs_boats_and_knowledge() {
        let coast = cell(Biome::Grassland, true);
        let mut culture = Culture::default();
        assert!(!DiscoveryKind::Sailing.can_be_discovered(&culture, &coast));

        culture.gain_discovery(DiscoveryKind::BoatMaking);
        assert!(!DiscoveryKind::Sailing.can_be_discovered(&culture, &coast));

        culture.knowledges.get_mut(ids::SHIPBUILDING).unwrap().value = 0.5;
        assert!(DiscoveryKind::Sailing.can_be_discovered(&culture, &coast));
    }

    #[test]
    fn tribalism_lost_when_social_organization_drops() {
        let mut culture = Culture::default();
        culture.add_knowledge(ids::SOCIAL_ORGANIZATION, "Social Organization", 0.5, 1.0);
        culture.gain_discovery(DiscoveryKind::Tribalism);
        assert!(DiscoveryKind::Tribalism.can_be_held(&culture));

        culture.knowledges.get_mut(ids::SOCIAL_ORGANIZATION).unwrap().value = 0.2;
        let lost = culture.drop_unholdable_discoveries();
        assert_eq!(lost, vec![DiscoveryKind::Tribalism]);
        assert!(!culture.has_discovery(DiscoveryKind::Tribalism));
        assert!(culture.preferences.get(ids::AUTHORITY).is_none());
    }

    #[test]
    fn plant_cultivation_needs_arable_land() {
        let culture = Culture::default();
        assert!(DiscoveryKind::PlantCultivation.can_be_discovered(&culture, &cell(Biome::Forest, false)));
        assert!(!DiscoveryKind::PlantCultivation.can_be_discovered(&culture, &cell(Biome::Tundra, false)));
    }
}
