use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::biome::Biome;
use super::position::WorldPosition;
use super::terrain::{Terrain, TerrainCell};
use crate::id::{LanguageId, RegionId};

/// Aggregate statistics of a region, recomputed from its cell set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionAttributes {
    pub total_area: f64,
    pub average_altitude: f64,
    pub average_rainfall: f64,
    pub average_temperature: f64,
    pub average_survivability: f64,
    pub average_foraging_capacity: f64,
    pub average_outer_border_altitude: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub water_percentage: f64,
    pub coast_percentage: f64,
    /// Area-weighted biome presence, normalized by total area.
    pub biome_presences: BTreeMap<Biome, f64>,
    pub most_biome_presence: f64,
    pub biome_with_most_presence: Option<Biome>,
}

/// A contiguous set of cells sharing a dominant biome.
///
/// The cell set is authoritative; `TerrainCell::region` is the back-reference
/// and is rebuilt from it on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub biome: Biome,
    pub name: String,
    pub language: Option<LanguageId>,
    pub cells: BTreeSet<WorldPosition>,
    #[serde(skip)]
    pub inner_border: BTreeSet<WorldPosition>,
    #[serde(skip)]
    pub outer_border: BTreeSet<WorldPosition>,
    #[serde(skip)]
    pub most_centered_cell: Option<WorldPosition>,
    #[serde(skip)]
    pub attributes: RegionAttributes,
}

impl Region {
    pub fn new(id: RegionId, biome: Biome, name: String, language: Option<LanguageId>) -> Self {
        Self {
            id,
            biome,
            name,
            language,
            cells: BTreeSet::new(),
            inner_border: BTreeSet::new(),
            outer_border: BTreeSet::new(),
            most_centered_cell: None,
            attributes: RegionAttributes::default(),
        }
    }

    /// Recompute borders, averages, and the biome histogram in one pass.
    /// Cell membership must already be reflected in `TerrainCell::region`.
    pub fn evaluate_attributes(&mut self, terrain: &Terrain) {
        let mut attrs = RegionAttributes {
            min_altitude: f64::MAX,
            max_altitude: f64::MIN,
            ..RegionAttributes::default()
        };
        let mut presence_area: BTreeMap<Biome, f64> = BTreeMap::new();
        let mut water_area = 0.0;
        let mut outer_border_area = 0.0;
        let mut coastal_outer_border_area = 0.0;

        self.inner_border.clear();
        self.outer_border.clear();

        for cell in self.cells.iter().filter_map(|p| terrain.cell(*p)) {
            let area = cell.area;
            let not_fully_water = cell.water_presence() < 1.0;
            let mut is_inner_border = false;

            for (_, npos) in &cell.neighbors {
                let Some(ncell) = terrain.cell(*npos) else { continue };
                if ncell.region == Some(self.id) {
                    continue;
                }
                is_inner_border = true;
                if self.outer_border.insert(*npos) {
                    outer_border_area += ncell.area;
                    attrs.average_outer_border_altitude += ncell.altitude * ncell.area;
                    if not_fully_water && ncell.water_presence() >= 1.0 {
                        coastal_outer_border_area += ncell.area;
                    }
                }
            }
            if is_inner_border {
                self.inner_border.insert(cell.position);
            }

            attrs.min_altitude = attrs.min_altitude.min(cell.altitude);
            attrs.max_altitude = attrs.max_altitude.max(cell.altitude);
            attrs.average_altitude += cell.altitude * area;
            attrs.average_rainfall += cell.rainfall * area;
            attrs.average_temperature += cell.temperature * area;
            attrs.average_survivability += cell.survivability() * area;
            attrs.average_foraging_capacity += cell.foraging_capacity() * area;

            for &(biome, presence) in &cell.biome_presences {
                *presence_area.entry(biome).or_default() += presence * area;
                if biome.is_water() {
                    water_area += presence * area;
                }
            }
            attrs.total_area += area;
        }

        if attrs.total_area > 0.0 {
            let total = attrs.total_area;
            attrs.average_altitude /= total;
            attrs.average_rainfall /= total;
            attrs.average_temperature /= total;
            attrs.average_survivability /= total;
            attrs.average_foraging_capacity /= total;
            attrs.water_percentage = water_area / total;

            for (biome, area) in presence_area {
                let presence = area / total;
                attrs.biome_presences.insert(biome, presence);
                if attrs.most_biome_presence < presence {
                    attrs.most_biome_presence = presence;
                    attrs.biome_with_most_presence = Some(biome);
                }
            }
        } else {
            attrs.min_altitude = 0.0;
            attrs.max_altitude = 0.0;
        }

        if outer_border_area > 0.0 {
            attrs.average_outer_border_altitude /= outer_border_area;
            attrs.coast_percentage = coastal_outer_border_area / outer_border_area;
        }

        self.attributes = attrs;
        self.most_centered_cell = self.calculate_most_centered_cell();
    }

    /// Member cell with the smallest Manhattan distance to the mean position.
    fn calculate_most_centered_cell(&self) -> Option<WorldPosition> {
        if self.cells.is_empty() {
            return None;
        }
        let n = self.cells.len() as i64;
        let center_lon = self.cells.iter().map(|p| p.longitude as i64).sum::<i64>() / n;
        let center_lat = self.cells.iter().map(|p| p.latitude as i64).sum::<i64>() / n;
        self.cells
            .iter()
            .min_by_key(|p| {
                (p.longitude as i64 - center_lon).abs() + (p.latitude as i64 - center_lat).abs()
            })
            .copied()
    }
}

/// A cell can join a biome region if it is unclaimed and `biome` dominates it.
pub fn can_add_cell_to_biome_region(cell: &TerrainCell, biome: Biome) -> bool {
    cell.region.is_none() && cell.most_present_biome() == Some(biome)
}

/// Flood fill outward from `start`, collecting the cells of a new region of
/// `biome`.
///
/// Cells next to a rejected neighbour trigger a border walk that follows the
/// boundary, feeding cells away from the boundary back into the main queue.
/// Does not check `start` itself; the caller decides whether it qualifies.
pub fn try_generate_biome_region(
    terrain: &Terrain,
    start: WorldPosition,
    biome: Biome,
) -> BTreeSet<WorldPosition> {
    let mut explore = RegionExploration {
        terrain,
        biome,
        accepted: BTreeSet::new(),
        explored: BTreeSet::from([start]),
        to_explore: VecDeque::from([start]),
    };

    while let Some(pos) = explore.to_explore.pop_front() {
        let Some(cell) = terrain.cell(pos) else { continue };
        let mut found_rejected = false;
        for (_, npos) in &cell.neighbors {
            if !explore.explored.insert(*npos) {
                continue;
            }
            match terrain.cell(*npos) {
                Some(ncell) if can_add_cell_to_biome_region(ncell, biome) => {
                    explore.to_explore.push_back(*npos);
                }
                _ => found_rejected = true,
            }
        }

        if found_rejected {
            explore.explore_border(pos);
        } else {
            explore.accepted.insert(pos);
        }
    }

    explore.accepted
}

struct RegionExploration<'a> {
    terrain: &'a Terrain,
    biome: Biome,
    accepted: BTreeSet<WorldPosition>,
    explored: BTreeSet<WorldPosition>,
    to_explore: VecDeque<WorldPosition>,
}

impl RegionExploration<'_> {
    fn explore_border(&mut self, start: WorldPosition) {
        let mut border_explored = BTreeSet::from([start]);
        let mut border_queue = VecDeque::from([start]);
        self.explored.insert(start);

        while let Some(pos) = border_queue.pop_front() {
            let Some(cell) = self.terrain.cell(pos) else { continue };
            let mut in_border = Vec::new();
            let mut out_border = BTreeSet::new();

            for (_, npos) in &cell.neighbors {
                if !border_explored.insert(*npos) {
                    continue;
                }
                self.explored.insert(*npos);
                match self.terrain.cell(*npos) {
                    Some(ncell) if can_add_cell_to_biome_region(ncell, self.biome) => {
                        in_border.push(*npos)
                    }
                    _ => {
                        out_border.insert(*npos);
                    }
                }
            }

            for cell_in in in_border {
                if self.accepted.contains(&cell_in) {
                    continue;
                }
                let touches_outside = self
                    .terrain
                    .cell(cell_in)
                    .is_some_and(|c| c.neighbors.iter().any(|(_, n)| out_border.contains(n)));
                if touches_outside {
                    border_queue.push_back(cell_in);
                } else {
                    self.to_explore.push_back(cell_in);
                }
            }

            self.accepted.insert(pos);
        }
    }
}
