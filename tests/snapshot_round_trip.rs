mod common;

use common::{fingerprint, fire_content, new_sim, read_lines, sim_config};
use deep_history::error::SnapshotError;
use deep_history::flush::{SNAPSHOT_FORMAT_VERSION, load_snapshot, save_snapshot};
use deep_history::Simulation;

#[test]
fn snapshot_writes_one_file_per_arena() {
    let mut sim = new_sim(11, fire_content());
    sim.run_until(600).unwrap();
    let dir = tempfile::tempdir().unwrap();
    save_snapshot(&sim.world, dir.path()).unwrap();

    for file in [
        "world.json",
        "groups.jsonl",
        "polities.jsonl",
        "factions.jsonl",
        "clusters.jsonl",
        "regions.jsonl",
        "routes.jsonl",
        "languages.jsonl",
    ] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }

    let groups = read_lines(&dir.path().join("groups.jsonl"));
    assert_eq!(groups.len(), sim.world.groups.len());
    for line in &groups {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(v.get("id").is_some());
        assert!(v.get("population").is_some());
        assert!(v.get("next_update_date").is_some());
    }
}

#[test]
fn loaded_world_matches_saved_world() {
    let mut sim = new_sim(11, fire_content());
    sim.run_until(900).unwrap();
    let dir = tempfile::tempdir().unwrap();
    save_snapshot(&sim.world, dir.path()).unwrap();

    let loaded = load_snapshot(dir.path(), &fire_content()).unwrap();
    assert_eq!(fingerprint(&loaded), fingerprint(&sim.world));
    for group in loaded.groups.values() {
        assert_eq!(loaded.cell(group.position).unwrap().group, Some(group.id));
    }
    assert!(!loaded.queue.is_empty());
}

#[test]
fn resumed_run_equals_uninterrupted_run() {
    let mut whole = new_sim(23, fire_content());
    whole.run_until(2_000).unwrap();

    let mut first = new_sim(23, fire_content());
    first.run_until(700).unwrap();
    let dir = tempfile::tempdir().unwrap();
    save_snapshot(&first.world, dir.path()).unwrap();
    drop(first);

    let world = load_snapshot(dir.path(), &fire_content()).unwrap();
    let mut resumed = Simulation::new(world, fire_content());
    resumed.run_until(2_000).unwrap();

    assert_eq!(fingerprint(&resumed.world), fingerprint(&whole.world));
}

#[test]
fn run_writes_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = sim_config(300);
    config.snapshot_interval = Some(100);
    config.output_dir = Some(dir.path().to_path_buf());

    let mut sim = new_sim(2, fire_content());
    sim.run(&config).unwrap();

    for date in [100, 200, 300] {
        let checkpoint = dir.path().join(format!("date_{date:09}"));
        assert!(checkpoint.join("world.json").exists(), "{}", checkpoint.display());
    }
    let last = load_snapshot(&dir.path().join("date_000000300"), &fire_content()).unwrap();
    assert_eq!(last.current_date, 300);
    assert_eq!(fingerprint(&last), fingerprint(&sim.world));
}

#[test]
fn newer_format_is_rejected() {
    let sim = new_sim(2, fire_content());
    let dir = tempfile::tempdir().unwrap();
    save_snapshot(&sim.world, dir.path()).unwrap();

    let meta_path = dir.path().join("world.json");
    let mut meta: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&meta_path).unwrap()).unwrap();
    meta["format_version"] = serde_json::json!(SNAPSHOT_FORMAT_VERSION + 1);
    std::fs::write(&meta_path, meta.to_string()).unwrap();

    let err = load_snapshot(dir.path(), &fire_content()).unwrap_err();
    assert!(matches!(err, SnapshotError::Version { expected, .. } if expected == SNAPSHOT_FORMAT_VERSION));
}

#[test]
fn missing_generator_fails_the_load() {
    let mut sim = new_sim(2, fire_content());
    sim.run_until(50).unwrap();
    let dir = tempfile::tempdir().unwrap();
    save_snapshot(&sim.world, dir.path()).unwrap();

    let pending = sim.world.groups.values().any(|g| !g.generator_events.is_empty());
    let result = load_snapshot(dir.path(), &deep_history::ContentRegistry::new());
    if pending {
        assert!(matches!(result, Err(SnapshotError::Sim(_))));
    } else {
        assert!(result.is_ok());
    }
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_snapshot(&dir.path().join("nope"), &fire_content()).unwrap_err();
    assert!(matches!(err, SnapshotError::Io(_)));
}
