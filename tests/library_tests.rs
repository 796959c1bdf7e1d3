//! Library on disk -> suite -> engine -> state file.

mod common;

use std::fs;
use std::path::Path;

use pattern_qa::app::PatternRunner;
use pattern_qa::library::{FsPatternLibrary, PatternLibrary};
use pattern_qa::quality::tester::SimulatedExecutor;
use pattern_qa::quality::suite::SIMULATED_OUTPUT_CAP;
use pattern_qa::quality::{Category, CertificationTier, QualityEngine, SubTest};
use pattern_qa::state_store::{FileStateStore, StateStore};

use common::{complete_pattern, pattern_without_instructions};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn library_fixture(root: &Path) {
    write(root, "extract_wisdom/system.md", &complete_pattern());
    write(
        root,
        "extract_wisdom/samples.json",
        r#"[
            {"id": "essay", "content": "An essay on how small habits compound."},
            {"id": "talk", "content": "A talk transcript about team feedback loops."}
        ]"#,
    );
    write(
        root,
        "extract_wisdom/usage.json",
        r#"{"user_rating": 4.4, "usage_count": 180}"#,
    );

    write(root, "summarize/system.md", &pattern_without_instructions());
    write(root, "summarize/samples/one.md", "A short news article.");
}

#[test]
fn assesses_a_library_and_persists_state() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("patterns");
    library_fixture(&root);

    let library = FsPatternLibrary::new(&root);
    let mut engine = QualityEngine::default();
    let suite = engine.suite_runner().with_parallelism(2);

    let names = library.list_patterns().unwrap();
    assert_eq!(names, vec!["extract_wisdom", "summarize"]);

    for name in &names {
        let input = PatternRunner::new(&library, &suite, &SimulatedExecutor).prepare(name);
        assert!(!input.suite.is_failed());
        assert_eq!(input.suite.sub_tests.len(), SubTest::ALL.len());
        engine.assess_pattern_quality(input);
    }

    let complete = engine.assessment("extract_wisdom").unwrap();
    let partial = engine.assessment("summarize").unwrap();
    assert_eq!(complete.scores[Category::Syntax], 100.0);
    assert!(partial.scores[Category::Syntax] < 100.0);
    assert!(partial.scores[Category::Structure] < 100.0);

    let store = FileStateStore::new(dir.path().join("state"));
    store.save(&engine.export_quality_data()).unwrap();

    let mut reloaded = QualityEngine::default();
    reloaded
        .import_quality_data(store.load().unwrap().unwrap())
        .unwrap();
    assert_eq!(
        reloaded.assessment("extract_wisdom"),
        engine.assessment("extract_wisdom")
    );
    assert_eq!(reloaded.history("summarize").len(), 1);
}

#[test]
fn samples_run_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    library_fixture(dir.path());

    let library = FsPatternLibrary::new(dir.path());
    let suite = QualityEngine::default().suite_runner().with_parallelism(4);
    let input = PatternRunner::new(&library, &suite, &SimulatedExecutor).prepare("extract_wisdom");

    let ids: Vec<&str> = input
        .suite
        .test_results
        .iter()
        .map(|r| r.sample_id.as_str())
        .collect();
    assert_eq!(ids, vec!["essay", "talk"]);
    assert!(input.usage.is_some());
}

#[test]
fn unknown_pattern_yields_failed_assessment() {
    let dir = tempfile::tempdir().unwrap();
    library_fixture(dir.path());

    let library = FsPatternLibrary::new(dir.path());
    let mut engine = QualityEngine::default();
    let suite = engine.suite_runner();
    let input = PatternRunner::new(&library, &suite, &SimulatedExecutor).prepare("ghost");

    let assessment = engine.assess_pattern_quality(input);
    assert_eq!(assessment.overall_score, 0);
    assert!(engine.history("ghost").is_empty());
}

#[test]
fn simulated_run_stays_marked_through_to_state() {
    let dir = tempfile::tempdir().unwrap();
    library_fixture(dir.path());

    let library = FsPatternLibrary::new(dir.path());
    let mut engine = QualityEngine::default();
    let suite = engine.suite_runner();
    let input = PatternRunner::new(&library, &suite, &SimulatedExecutor).prepare("extract_wisdom");
    let assessment = engine.assess_pattern_quality(input);

    assert_eq!(assessment.simulated_samples, 2);
    assert!(assessment.scores[Category::Output] <= SIMULATED_OUTPUT_CAP);
    assert!(!assessment.certification.certified);
    assert_eq!(assessment.certification.tier, CertificationTier::None);

    let state = engine.export_quality_data();
    assert_eq!(state.assessments["extract_wisdom"].simulated_samples, 2);
    assert!(state.history["extract_wisdom"][0].simulated);
    assert_eq!(engine.quality_metrics().simulated_patterns, 1);
}
