//! Cross-module round trip: ingest a training password, finalize a model,
//! persist it to SQLite, reload it into fresh in-memory types, and confirm
//! best-first PCFG enumeration reproduces the original password.

use std::sync::atomic::AtomicBool;

use pwcrack::pcfg::{PCFGGuesser, PcfgEnumerator};
use pwcrack_store::SqliteStore;
use pwcrack_training::{TrainConfig, TrainingSession};
use tempdir::TempDir;

// Digits 6/9 avoid both the leet-decode table (0/1/3/4/5/7/8/@/$/!, which
// would fork a second leet-decoded training variant off the same password)
// and the year pattern (19|20)\d\d, keeping this down to one clean "A6D4"
// base structure.
const TRAINING_PASSWORD: &str = "dragon6699";

#[test]
fn trained_model_round_trips_through_sqlite_and_reproduces_the_training_password() {
    let mut config = TrainConfig::default();
    config.needed_appear = 1;
    let ngram = config.ngram;

    let mut session = TrainingSession::new(config);
    for _ in 0..5 {
        session.ingest(TRAINING_PASSWORD);
    }
    let model = session.finalize(10);
    model.grammar.validate().unwrap();

    let dir = TempDir::new("pwcrack-roundtrip-test").unwrap();
    let db_path = dir.path().join("grammar.db");
    {
        let store = SqliteStore::create(&db_path).unwrap();
        store.write_grammar_categories(&model.grammar).unwrap();
        store.write_base_structures(&model.base_structures).unwrap();
        store.write_unigram_probs(&model.unigram_probs).unwrap();
        store
            .write_omen_grammar(&model.omen_grammar, &model.keyspace, &model.passwords_per_level)
            .unwrap();
        let ngram_str = ngram.to_string();
        store
            .write_config(&[("ngram", ngram_str.as_str()), ("markov_proportion", "1.0")])
            .unwrap();
    }

    let store = SqliteStore::open_readonly(&db_path).unwrap();
    let grammar = store.load_grammar().unwrap();
    let base_structures = store.load_base_structures().unwrap();
    let omen_grammar = store.load_omen_grammar(ngram, 10).unwrap();

    // `validate()` exempts the OMEN-derived `M` symbol (a per-level weight
    // table, not a probability simplex) from the sum-to-1 check, so this
    // passes even though the grammar carries a populated `M` symbol.
    grammar.validate().unwrap();

    assert_eq!(base_structures.structures.len(), 1);
    let (structure, prob) = base_structures.structures.iter().next().unwrap();
    assert!((*prob - 1.0).abs() < 1e-9);

    let mut pcfg_guesser = PCFGGuesser::new(&grammar);
    let items = pcfg_guesser.initial_items(&base_structures).unwrap();
    assert_eq!(items.len(), 1, "a single repeated password yields a single base structure");

    let exit = AtomicBool::new(false);
    let candidates: Vec<String> = PcfgEnumerator::new(&grammar, Some(&omen_grammar), &items[0], &exit)
        .unwrap()
        .collect();

    assert!(
        candidates.contains(&TRAINING_PASSWORD.to_string()),
        "expected {TRAINING_PASSWORD:?} among reconstructed candidates for structure {structure:?}, got {candidates:?}"
    );
}
