#![allow(dead_code)]

use deep_history::model::World;
use deep_history::{ContentRegistry, SimConfig, Simulation, WorldGenConfig};

pub fn small_worldgen(seed: u64) -> WorldGenConfig {
    WorldGenConfig {
        seed,
        width: 32,
        height: 16,
        num_continents: 3,
        continent_radius: 0.2,
        ..WorldGenConfig::default()
    }
}

pub fn sim_config(end_date: i64) -> SimConfig {
    SimConfig {
        initial_population: 2_000,
        end_date,
        ..SimConfig::default()
    }
}

pub fn new_sim(seed: u64, content: ContentRegistry) -> Simulation {
    Simulation::generate(&small_worldgen(seed), &sim_config(0), content).unwrap()
}

pub fn fire_content() -> ContentRegistry {
    ContentRegistry::from_toml_str(
        r#"
        [[knowledge_boost]]
        id = "fire_mastery"
        knowledge = "fire"
        knowledge_name = "Fire"
        mean_span = 60.0
        boost = 0.1
        "#,
    )
    .unwrap()
}

/// Serialized entity arenas. Equal fingerprints mean equal simulated state.
pub fn fingerprint(world: &World) -> String {
    let state = serde_json::json!({
        "date": world.current_date,
        "groups": world.groups.values().collect::<Vec<_>>(),
        "polities": world.polities.values().collect::<Vec<_>>(),
        "factions": world.factions.values().collect::<Vec<_>>(),
        "clusters": world.clusters.values().collect::<Vec<_>>(),
        "regions": world.regions.values().collect::<Vec<_>>(),
        "routes": world.routes.values().collect::<Vec<_>>(),
        "languages": world.languages.values().collect::<Vec<_>>(),
        "id_gen": world.id_gen,
    });
    state.to_string()
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
