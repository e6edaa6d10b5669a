use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Biome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Biome {
    IceCap,
    Ocean,
    Grassland,
    Forest,
    Taiga,
    Tundra,
    Desert,
    Rainforest,
}

string_enum!(Biome {
    IceCap => "ice_cap",
    Ocean => "ocean",
    Grassland => "grassland",
    Forest => "forest",
    Taiga => "taiga",
    Tundra => "tundra",
    Desert => "desert",
    Rainforest => "rainforest",
});

impl Biome {
    pub const ALL: [Biome; 8] = [
        Biome::IceCap,
        Biome::Ocean,
        Biome::Grassland,
        Biome::Forest,
        Biome::Taiga,
        Biome::Tundra,
        Biome::Desert,
        Biome::Rainforest,
    ];

    /// Base chance of surviving in this biome without any specific skill.
    pub fn survivability(self) -> f64 {
        match self {
            Biome::IceCap => 0.0,
            Biome::Ocean => 0.0,
            Biome::Grassland => 1.0,
            Biome::Forest => 0.8,
            Biome::Taiga => 0.5,
            Biome::Tundra => 0.3,
            Biome::Desert => 0.2,
            Biome::Rainforest => 0.6,
        }
    }

    /// Food a fully skilled forager can extract per unit area.
    pub fn foraging_capacity(self) -> f64 {
        match self {
            Biome::IceCap => 0.0,
            Biome::Ocean => 0.0,
            Biome::Grassland => 0.5,
            Biome::Forest => 0.6,
            Biome::Taiga => 0.3,
            Biome::Tundra => 0.15,
            Biome::Desert => 0.1,
            Biome::Rainforest => 0.8,
        }
    }

    pub fn is_water(self) -> bool {
        matches!(self, Biome::Ocean)
    }

    /// Stable id of the survival skill a culture develops for this biome.
    pub fn skill_id(self) -> String {
        format!("{}_survival", self.as_str())
    }

    /// Noun used when naming a region of this biome.
    pub fn region_noun(self) -> &'static str {
        match self {
            Biome::IceCap => "Ice",
            Biome::Ocean => "Sea",
            Biome::Grassland => "Plains",
            Biome::Forest => "Woods",
            Biome::Taiga => "Pines",
            Biome::Tundra => "Barrens",
            Biome::Desert => "Sands",
            Biome::Rainforest => "Jungle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biome_string_round_trip() {
        for biome in Biome::ALL {
            let s: String = biome.into();
            assert_eq!(Biome::try_from(s).unwrap(), biome);
        }
    }

    #[test]
    fn water_biomes_are_not_survivable() {
        for biome in Biome::ALL.into_iter().filter(|b| b.is_water()) {
            assert_eq!(biome.survivability(), 0.0);
            assert_eq!(biome.foraging_capacity(), 0.0);
        }
    }

    #[test]
    fn skill_ids_unique() {
        let mut ids: Vec<String> = Biome::ALL.iter().map(|b| b.skill_id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Biome::ALL.len());
    }
}
