mod common;

use common::{fire_content, new_sim};
use deep_history::error::ContentError;
use deep_history::sim::type_ids;
use deep_history::ContentRegistry;

#[test]
fn toml_generators_get_type_ids() {
    let registry = ContentRegistry::from_toml_str(
        r#"
        [[knowledge_boost]]
        id = "fire_mastery"
        knowledge = "fire"
        knowledge_name = "Fire"
        mean_span = 60.0
        boost = 0.1

        [[knowledge_boost]]
        id = "star_lore"
        knowledge = "astronomy"
        knowledge_name = "Astronomy"
        mean_span = 400.0
        min_population = 5000
        boost = 0.05
        limit = 0.5
        required_discovery = "sailing"
        "#,
    )
    .unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.type_id_of("fire_mastery"), Some(type_ids::GENERATOR_BASE));
    assert_eq!(registry.type_id_of("star_lore"), Some(type_ids::GENERATOR_BASE + 1));
}

#[test]
fn empty_document_gives_empty_registry() {
    let registry = ContentRegistry::from_toml_str("").unwrap();
    assert!(registry.is_empty());
}

#[test]
fn malformed_content_is_rejected() {
    let duplicate = r#"
        [[knowledge_boost]]
        id = "a"
        knowledge = "fire"
        knowledge_name = "Fire"
        mean_span = 10.0
        boost = 0.1

        [[knowledge_boost]]
        id = "a"
        knowledge = "fire"
        knowledge_name = "Fire"
        mean_span = 10.0
        boost = 0.1
    "#;
    assert_eq!(
        ContentRegistry::from_toml_str(duplicate).unwrap_err(),
        ContentError::DuplicateGenerator("a".into())
    );

    let bad_span = r#"
        [[knowledge_boost]]
        id = "b"
        knowledge = "fire"
        knowledge_name = "Fire"
        mean_span = 0.0
        boost = 0.1
    "#;
    assert!(matches!(
        ContentRegistry::from_toml_str(bad_span),
        Err(ContentError::Malformed(_))
    ));

    assert!(matches!(
        ContentRegistry::from_toml_str("[[knowledge_boost]]\nid = 3"),
        Err(ContentError::Malformed(_))
    ));
}

#[test]
fn generated_events_fire_and_boost_knowledge() {
    let mut sim = new_sim(19, fire_content());
    let mut fired = 0;
    while let Some(outcome) = sim.step().unwrap() {
        if outcome.type_id == type_ids::GENERATOR_BASE && outcome.fired {
            fired += 1;
        }
        if sim.world.current_date > 600 {
            break;
        }
    }
    assert!(fired > 0, "no knowledge boost fired in 600 years");
    assert!(
        sim.world
            .groups
            .values()
            .any(|g| g.culture.knowledge_value("fire") > 0.0)
    );
}

#[test]
fn content_does_not_disturb_unrelated_seed_state() {
    let mut plain = new_sim(19, ContentRegistry::new());
    let mut with_content = new_sim(19, fire_content());
    let founder_plain = plain.world.groups.values().next().unwrap().position;
    let founder_content = with_content.world.groups.values().next().unwrap().position;
    assert_eq!(founder_plain, founder_content);

    plain.run_until(100).unwrap();
    with_content.run_until(100).unwrap();
    assert!(plain.world.groups.values().all(|g| g.generator_events.is_empty()));
    assert!(with_content.stats.events_popped >= plain.stats.events_popped);
}
