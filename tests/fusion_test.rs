mod helpers;

use helpers::{test_vault, test_config, write_note};
use std::collections::HashSet;

/// Seed a corpus large enough that exploration always has unseen notes.
fn seed_corpus(vault: &tempfile::TempDir, n: usize) {
    for i in 0..n {
        write_note(
            vault,
            &format!("note{i:02}"),
            &format!("topic{i} body with some shared vocabulary"),
        );
    }
}

#[test]
fn exploration_replaces_the_exact_tail_budget() {
    let mut config = test_config();
    config.retrieval.exploration_budget = 0.20;
    let (vault, engine) = helpers::test_vault_with(config);
    seed_corpus(&vault, 30);
    engine.index_build(false).unwrap();

    let response = engine.query_ranked("shared vocabulary", Some(10)).unwrap();
    assert_eq!(response.results.len(), 10);

    let explored: Vec<&str> = response
        .results
        .iter()
        .filter(|r| r.exploration)
        .map(|r| r.title.as_str())
        .collect();
    assert_eq!(explored.len(), 2, "expected exactly floor(10 * 0.2) = 2");

    // Exploration entries score zero and never duplicate ranked titles
    let ranked: HashSet<&str> = response
        .results
        .iter()
        .filter(|r| !r.exploration)
        .map(|r| r.title.as_str())
        .collect();
    for title in &explored {
        assert!(!ranked.contains(title));
    }
    for r in response.results.iter().filter(|r| r.exploration) {
        assert_eq!(r.score, 0.0);
    }
}

#[test]
fn zero_budget_disables_exploration() {
    let mut config = test_config();
    config.retrieval.exploration_budget = 0.0;
    let (vault, engine) = helpers::test_vault_with(config);
    seed_corpus(&vault, 15);
    engine.index_build(false).unwrap();

    let response = engine.query_ranked("shared vocabulary", Some(5)).unwrap();
    assert!(response.results.iter().all(|r| !r.exploration));
}

#[test]
fn small_corpus_fills_shortfall_with_ranked_tail() {
    let mut config = test_config();
    config.retrieval.exploration_budget = 0.5;
    let (vault, engine) = helpers::test_vault_with(config);
    // Every note will be served, so there are no unseen titles
    seed_corpus(&vault, 4);
    engine.index_build(false).unwrap();

    let response = engine.query_ranked("shared vocabulary", Some(4)).unwrap();
    assert_eq!(response.results.len(), 4);
    assert!(response.results.iter().all(|r| !r.exploration));
}

#[test]
fn every_serve_appends_a_ledger_event() {
    let (vault, engine) = test_vault();
    seed_corpus(&vault, 5);
    engine.index_build(false).unwrap();

    engine.query_ranked("shared vocabulary", Some(3)).unwrap();
    engine.query_ranked("topic1", Some(3)).unwrap();

    let log_path = vault.path().join("ops").join("access.jsonl");
    assert!(log_path.exists());
    let lines = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(lines.lines().count(), 2);

    // Served propensities are written as zero
    for line in lines.lines() {
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        for entry in event["results"].as_array().unwrap() {
            assert_eq!(entry["propensity"].as_f64().unwrap(), 0.0);
        }
    }
}

#[test]
fn propensities_are_floored_and_reflect_serves() {
    let (vault, engine) = test_vault();
    seed_corpus(&vault, 6);
    engine.index_build(false).unwrap();

    for _ in 0..4 {
        engine.query_ranked("shared vocabulary", Some(3)).unwrap();
    }

    let propensities = engine.propensities().unwrap();
    assert!(!propensities.is_empty());
    for &p in propensities.values() {
        assert!(p >= 0.01, "propensity below epsilon floor: {p}");
        assert!(p <= 1.0);
    }
}

#[test]
fn disabled_ips_writes_no_ledger() {
    let mut config = test_config();
    config.ips.enabled = false;
    let (vault, engine) = helpers::test_vault_with(config);
    seed_corpus(&vault, 3);
    engine.index_build(false).unwrap();

    engine.query_ranked("shared vocabulary", Some(3)).unwrap();
    assert!(!vault.path().join("ops").join("access.jsonl").exists());
}
