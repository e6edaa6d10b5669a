use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::jsonl::{read_json, read_jsonl, write_json, write_jsonl};
use super::resolve::resolve;
use crate::error::SnapshotError;
use crate::id::{GroupId, IdGenerator};
use crate::model::{
    CellGroup, Faction, Language, Polity, PolityProminenceCluster, Region, Route, World,
    WorldDate, WorldPhase,
};
use crate::sim::ContentRegistry;
use crate::worldgen::{WorldGenConfig, generate_terrain};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const WORLD_FILE: &str = "world.json";
const GROUPS_FILE: &str = "groups.jsonl";
const POLITIES_FILE: &str = "polities.jsonl";
const FACTIONS_FILE: &str = "factions.jsonl";
const CLUSTERS_FILE: &str = "clusters.jsonl";
const REGIONS_FILE: &str = "regions.jsonl";
const ROUTES_FILE: &str = "routes.jsonl";
const LANGUAGES_FILE: &str = "languages.jsonl";

/// Scalar world state stored in `world.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMeta {
    pub format_version: u32,
    pub seed: u64,
    pub current_date: WorldDate,
    pub config: WorldGenConfig,
    pub id_gen: IdGenerator,
    pub most_populous_group: Option<GroupId>,
}

/// Save the world to JSONL files in `output_dir`.
///
/// Creates the output directory if it does not exist. Writes:
/// - `world.json`: seed, date, generation config, and id counter
/// - one JSONL file per arena (groups, polities, factions, clusters,
///   regions, routes, languages)
///
/// Terrain and the event queue are not written. Terrain is regenerated from
/// the config; events are rebuilt from the pending dates on each entity.
pub fn save_snapshot(world: &World, output_dir: &Path) -> Result<(), SnapshotError> {
    fs::create_dir_all(output_dir)?;

    let meta = WorldMeta {
        format_version: SNAPSHOT_FORMAT_VERSION,
        seed: world.seed,
        current_date: world.current_date,
        config: world.config.clone(),
        id_gen: world.id_gen.clone(),
        most_populous_group: world.most_populous_group,
    };
    write_json(&output_dir.join(WORLD_FILE), &meta)?;
    write_jsonl(&output_dir.join(GROUPS_FILE), world.groups.values())?;
    write_jsonl(&output_dir.join(POLITIES_FILE), world.polities.values())?;
    write_jsonl(&output_dir.join(FACTIONS_FILE), world.factions.values())?;
    write_jsonl(&output_dir.join(CLUSTERS_FILE), world.clusters.values())?;
    write_jsonl(&output_dir.join(REGIONS_FILE), world.regions.values())?;
    write_jsonl(
        &output_dir.join(ROUTES_FILE),
        world.routes.values().filter(|r| r.consolidated),
    )?;
    write_jsonl(&output_dir.join(LANGUAGES_FILE), world.languages.values())?;
    Ok(())
}

/// Load a snapshot written by [`save_snapshot`] and resolve it into a
/// running world. `content` must register the same generators as the run
/// that saved it.
pub fn load_snapshot(dir: &Path, content: &ContentRegistry) -> Result<World, SnapshotError> {
    let meta: WorldMeta = read_json(&dir.join(WORLD_FILE))?;
    if meta.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(SnapshotError::Version {
            found: meta.format_version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }

    meta.config.validate()?;
    let terrain = generate_terrain(&meta.config);
    let mut world = World::new(meta.config, terrain);
    world.seed = meta.seed;
    world.current_date = meta.current_date;
    world.id_gen = meta.id_gen;
    world.most_populous_group = meta.most_populous_group;
    world.phase = WorldPhase::Loading;

    world.groups = by_id(read_jsonl::<CellGroup>(&dir.join(GROUPS_FILE))?, |g| g.id);
    world.polities = by_id(read_jsonl::<Polity>(&dir.join(POLITIES_FILE))?, |p| p.id);
    world.factions = by_id(read_jsonl::<Faction>(&dir.join(FACTIONS_FILE))?, |f| f.id);
    world.clusters = by_id(
        read_jsonl::<PolityProminenceCluster>(&dir.join(CLUSTERS_FILE))?,
        |c| c.id,
    );
    world.regions = by_id(read_jsonl::<Region>(&dir.join(REGIONS_FILE))?, |r| r.id);
    world.routes = by_id(read_jsonl::<Route>(&dir.join(ROUTES_FILE))?, |r| r.id);
    world.languages = by_id(read_jsonl::<Language>(&dir.join(LANGUAGES_FILE))?, |l| l.id);

    resolve(&mut world, content)?;
    info!(
        dir = %dir.display(),
        date = world.current_date,
        groups = world.groups.len(),
        polities = world.polities.len(),
        events = world.queue.len(),
        "snapshot loaded"
    );
    Ok(world)
}

fn by_id<K: Ord, T>(items: Vec<T>, key: impl Fn(&T) -> K) -> BTreeMap<K, T> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}
