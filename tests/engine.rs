//! End-to-end scenarios against a seeded in-memory vocabulary store,
//! exercising the full `Engine::map_term`/`batch_map_terms`/`add_synonym`
//! path. External adapters get no network in a sandboxed test run, so
//! they fall through to local matching exactly as if mocked to return
//! nothing.

use std::time::Instant;

use termmap::{Concept, Engine, EngineConfig, InMemoryVocabularyStore, TermStatus, Vocabulary};

fn concept(code: &str, term: &str, display: &str) -> Concept {
    Concept {
        code: code.to_string(),
        term: term.to_string(),
        display: display.to_string(),
    }
}

fn fixture_store() -> InMemoryVocabularyStore {
    InMemoryVocabularyStore::new()
        .with_rows(
            Vocabulary::Snomed,
            vec![
                concept("22298006", "Myocardial Infarction", "Myocardial infarction"),
                concept("73211009", "Diabetes", "Diabetes"),
                concept("69896004", "Rheumatoid Arthritis", "Rheumatoid arthritis"),
                concept("999", "pneumonoultramicroscopicsilicovolcanoconiosis", "Pneumonoultramicroscopicsilicovolcanoconiosis"),
            ],
        )
        .with_rows(
            Vocabulary::Loinc,
            vec![concept("4548-4", "Hemoglobin A1c", "Hemoglobin A1c/Hemoglobin.total in Blood")],
        )
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_synonyms_path("/nonexistent/termmap-test-synonyms.json")
        .with_fuzzy_threshold(0.70)
}

#[tokio::test]
async fn abbreviation_resolves_mi_to_myocardial_infarction() {
    let engine = Engine::build(&fixture_store(), config()).await;
    let results = engine.map_term("MI", &[Vocabulary::Snomed], None, 5).await;

    let rows = &results[&Vocabulary::Snomed];
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].code, "22298006");
    assert_eq!(rows[0].display, "Myocardial infarction");
    assert_eq!(rows[0].confidence, 1.0);
    assert_eq!(rows[0].match_type, "variation");
}

#[tokio::test]
async fn context_cue_boosts_a_near_typo_match_above_floor() {
    let engine = Engine::build(&fixture_store(), config()).await;
    // "diabetis" is a one-letter typo of the fixture's "Diabetes": close
    // enough to clear the token-sort/token-set thresholds via edit ratio,
    // but not an exact variation, so the context boost is observable.
    let results = engine
        .map_term("diabetis", &[Vocabulary::Snomed], Some("HbA1c elevated, on metformin"), 5)
        .await;

    let rows = &results[&Vocabulary::Snomed];
    assert_eq!(rows[0].code, "73211009");
    assert!(rows[0].context_enhanced);
    assert_eq!(rows[0].context_term.as_deref(), Some("metformin"));
    assert!(rows[0].confidence >= 0.92);
}

#[tokio::test]
async fn length_gate_rejects_long_candidate_in_favor_of_abbreviation_hit() {
    let engine = Engine::build(&fixture_store(), config()).await;
    let results = engine.map_term("ra", &[Vocabulary::Snomed], None, 5).await;

    let rows = &results[&Vocabulary::Snomed];
    assert_eq!(rows[0].code, "69896004");
    assert_eq!(rows[0].confidence, 1.0);
}

#[tokio::test]
async fn typo_resolves_via_edit_ratio() {
    let engine = Engine::build(&fixture_store(), config()).await;
    let results = engine.map_term("hemaglobin a1c", &[Vocabulary::Loinc], None, 5).await;

    let rows = &results[&Vocabulary::Loinc];
    assert_eq!(rows[0].code, "4548-4");
    assert!(rows[0].confidence >= 0.93);
}

#[tokio::test]
async fn batch_preserves_order_and_isolates_an_empty_term() {
    let engine = Engine::build(&fixture_store(), config()).await;

    let mut terms: Vec<String> = (0..12).map(|i| format!("term-{i}")).collect();
    terms[0] = "MI".to_string();
    terms[1] = "ra".to_string();
    terms[7] = String::new(); // falls through to an empty result, not a raise

    let started = Instant::now();
    let results = engine.batch_map_terms(&terms, &[Vocabulary::Snomed], None, 5).await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 12);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.term, terms[i]);
    }
    assert_eq!(results[7].status, TermStatus::NoMappings);
    assert!(results[7].error.is_none());
    assert_eq!(results[0].status, TermStatus::Success);
    assert_eq!(results[1].status, TermStatus::Success);

    // 12 terms / chunk size 5 = 3 chunks, 2 inter-chunk delays of 500ms.
    assert!(elapsed.as_millis() >= 1000);
}

#[tokio::test]
async fn add_synonym_makes_lookup_consistent_across_cluster_members() {
    let engine = Engine::build(&fixture_store(), config()).await;

    let persisted = engine.add_synonym("covid-19", &["sars-cov-2".to_string(), "coronavirus disease 2019".to_string()]);
    assert!(!persisted, "no backing file for covid-19 synonyms in this fixture, persist should fail cleanly");

    // The cluster is still live in memory even though persistence failed,
    // so both spellings should resolve consistently for a term present in
    // the index under either name. Seed a concept that matches via one
    // spelling and confirm the other resolves through the synonym cluster.
    let store = fixture_store().with_rows(
        Vocabulary::Snomed,
        vec![concept("840539006", "COVID-19", "COVID-19")],
    );
    let engine = Engine::build(&store, config()).await;
    engine.add_synonym("covid-19", &["sars-cov-2".to_string()]);

    let by_synonym = engine.map_term("sars-cov-2", &[Vocabulary::Snomed], None, 5).await;
    let by_original = engine.map_term("covid-19", &[Vocabulary::Snomed], None, 5).await;

    assert_eq!(by_synonym[&Vocabulary::Snomed][0].code, "840539006");
    assert_eq!(by_synonym[&Vocabulary::Snomed][0].code, by_original[&Vocabulary::Snomed][0].code);
}
