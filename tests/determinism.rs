mod common;

use common::{fingerprint, fire_content, new_sim};
use deep_history::ContentRegistry;

#[test]
fn same_seed_same_history() {
    let mut a = new_sim(17, fire_content());
    let mut b = new_sim(17, fire_content());
    let stats_a = a.run_until(1_500).unwrap();
    let stats_b = b.run_until(1_500).unwrap();

    assert_eq!(stats_a, stats_b);
    assert!(stats_a.fired > 0, "nothing happened in 1500 years");
    assert_eq!(fingerprint(&a.world), fingerprint(&b.world));
}

#[test]
fn step_outcomes_match_event_for_event() {
    let mut a = new_sim(3, ContentRegistry::new());
    let mut b = new_sim(3, ContentRegistry::new());
    for _ in 0..2_000 {
        let x = a.step().unwrap();
        let y = b.step().unwrap();
        assert_eq!(x, y);
        if x.is_none() {
            break;
        }
    }
}

#[test]
fn different_seeds_diverge() {
    let mut a = new_sim(1, ContentRegistry::new());
    let mut b = new_sim(2, ContentRegistry::new());
    a.run_until(500).unwrap();
    b.run_until(500).unwrap();
    assert_ne!(fingerprint(&a.world), fingerprint(&b.world));
}

#[test]
fn split_run_equals_single_run() {
    let mut whole = new_sim(9, ContentRegistry::new());
    whole.run_until(1_200).unwrap();

    let mut halves = new_sim(9, ContentRegistry::new());
    halves.run_until(400).unwrap();
    halves.run_until(1_200).unwrap();

    assert_eq!(whole.stats, halves.stats);
    assert_eq!(fingerprint(&whole.world), fingerprint(&halves.world));
}
