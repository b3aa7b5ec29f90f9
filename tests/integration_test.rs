// End-to-end tests for reach over both record stores
use reach::{
    Aggregator, BatchConfig, BatchOrchestrator, CheckpointFile, Error, FilterCondition,
    IncludeAll, LmdbStore, MemoryStore, Operation, ReachConfig, ReachJob, Record, RecordId,
    RecordStore, Statistic, TraitKind, TraitRegistry, Vocabulary, NO_DATA,
};
use serde_json::json;
use std::io::Write;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn family() -> Vec<Record> {
    vec![
        Record::new("R").with_children(["C1", "C2"]).with_field("doc_vec", json!([1.0, 0.0])),
        Record::new("C1").with_field("doc_vec", json!([1.0, 0.0])),
        Record::new("C2").with_field("doc_vec", json!([0.0, 1.0])),
        // children exist but carry no vectors
        Record::new("E").with_children(["N1", "N2"]).with_field("doc_vec", json!([0.5, 0.5])),
        Record::new("N1"),
        Record::new("N2").with_children(["N1"]),
    ]
}

fn field(store: &dyn RecordStore, id: &str, name: &str) -> Option<f64> {
    let record = store
        .find_one(&RecordId::from(id), &reach::Projection::all())
        .unwrap()?;
    record.get(name).and_then(|v| v.as_f64())
}

#[test]
fn test_reach_on_memory_store() {
    let store = MemoryStore::from_records(family());
    let registry = TraitRegistry::new();
    let agg = Aggregator::new(&store, &registry);

    let stats = agg
        .parent_child_distance(&"R".into(), TraitKind::SemanticVector, 1, &IncludeAll)
        .unwrap();
    assert!(close(stats.field("1_gen_sum_dist_w2v").unwrap(), 1.0));
    assert!(close(stats.field("1_gen_avg_dist_w2v").unwrap(), 0.5));

    let childless = agg
        .parent_child_distance(&"C1".into(), TraitKind::SemanticVector, 3, &IncludeAll)
        .unwrap();
    assert_eq!(childless.get(3, Statistic::Sum, TraitKind::SemanticVector), Some(0.0));
    assert_eq!(childless.get(3, Statistic::Avg, TraitKind::SemanticVector), Some(0.0));

    let untraited = agg
        .parent_child_distance(&"E".into(), TraitKind::SemanticVector, 2, &IncludeAll)
        .unwrap();
    assert_eq!(untraited.get(2, Statistic::Sum, TraitKind::SemanticVector), Some(NO_DATA));
    assert_eq!(untraited.get(2, Statistic::Avg, TraitKind::SemanticVector), Some(NO_DATA));

    let missing = agg.parent_child_distance(&"ghost".into(), TraitKind::SemanticVector, 1, &IncludeAll);
    assert!(matches!(missing, Err(Error::NoSuchRecord(_))));
}

#[test]
fn test_variance_on_memory_store() {
    let store = MemoryStore::from_records(family());
    let registry = TraitRegistry::new();
    let agg = Aggregator::new(&store, &registry);

    let stats = agg
        .trait_variance(&"R".into(), TraitKind::SemanticVector, 1, &IncludeAll)
        .unwrap();
    // each component is {1, 1, 0} in some order: population variance 2/9
    let expected = (2.0f64).sqrt() * 2.0 / 9.0;
    assert!(close(stats.field("1_gen_variance_dist_w2v").unwrap(), expected));

    // a lone root has zero variance
    let lone = agg
        .trait_variance(&"C2".into(), TraitKind::SemanticVector, 4, &IncludeAll)
        .unwrap();
    assert!(close(lone.field("4_gen_variance_dist_w2v").unwrap(), 0.0));

    let lda = agg.trait_variance(&"R".into(), TraitKind::TopicMixture, 1, &IncludeAll);
    assert!(matches!(lda, Err(Error::UnsupportedTraitForVariance(_))));
}

#[test]
fn test_term_set_reach_and_variance() {
    let store = MemoryStore::from_records([
        Record::new(1u64)
            .with_children([2u64, 3])
            .with_field("top_tf-idf", json!(["laser", "optic", "beam"])),
        Record::new(2u64).with_field("top_tf-idf", json!(["laser", "optic", "lens"])),
        Record::new(3u64).with_field("top_tf-idf", json!(["gene", "cell", "unknownstem"])),
    ]);
    let vocabulary = Vocabulary::from_terms(["laser", "optic", "beam", "lens", "gene", "cell"]);
    let registry = TraitRegistry::new().with_vocabulary(vocabulary);
    let agg = Aggregator::new(&store, &registry);

    let stats = agg
        .parent_child_distance(&1u64.into(), TraitKind::TermSet, 1, &IncludeAll)
        .unwrap();
    // (20 - 2*2) + (20 - 0)
    assert!(close(stats.field("1_gen_sum_dist_tf-idf").unwrap(), 36.0));
    assert!(close(stats.field("1_gen_avg_dist_tf-idf").unwrap(), 18.0));

    let variance = agg
        .trait_variance(&1u64.into(), TraitKind::TermSet, 1, &IncludeAll)
        .unwrap()
        .field("1_gen_variance_dist_tf-idf")
        .unwrap();
    assert!(variance > 0.0);
}

#[test]
fn test_topic_mixture_reach() {
    let store = MemoryStore::from_records([
        Record::new("P").with_children(["Q"]).with_field("lda_topics", json!([[0, 0.7]])),
        Record::new("Q").with_field("lda_topics", json!([[0, 0.7]])),
    ]);
    let registry = TraitRegistry::new().with_topic_count(4);
    let stats = Aggregator::new(&store, &registry)
        .parent_child_distance(&"P".into(), TraitKind::TopicMixture, 1, &IncludeAll)
        .unwrap();
    assert!(close(stats.field("1_gen_sum_dist_lda").unwrap(), 0.0));
}

#[test]
fn test_min_citation_predicate_prunes_lineage() {
    let store = MemoryStore::from_records([
        Record::new("R").with_children(["A", "B"]).with_field("doc_vec", json!([1.0, 0.0])),
        Record::new("A").with_children(["X", "Y"]).with_field("doc_vec", json!([1.0, 0.0])),
        Record::new("B").with_field("doc_vec", json!([0.0, 1.0])),
        Record::new("X").with_field("doc_vec", json!([1.0, 0.0])),
        Record::new("Y").with_field("doc_vec", json!([1.0, 0.0])),
    ]);
    let registry = TraitRegistry::new();
    let predicate = FilterCondition::length_greater_than("citedby", 1);
    let stats = Aggregator::new(&store, &registry)
        .parent_child_distance(&"R".into(), TraitKind::SemanticVector, 2, &predicate)
        .unwrap();
    // only A survives; its children are never reached
    assert!(close(stats.field("2_gen_sum_dist_w2v").unwrap(), 0.0));
    assert!(close(stats.field("2_gen_avg_dist_w2v").unwrap(), 0.0));
}

#[test]
fn test_store_run_on_lmdb() {
    let dir = tempfile::tempdir().unwrap();
    let store = LmdbStore::open(dir.path()).unwrap();
    assert_eq!(store.insert_batch(family()).unwrap(), 6);

    let registry = TraitRegistry::new();
    let config = BatchConfig {
        batch_size: 2,
        workers: Some(2),
        checkpoint: Some(dir.path().join("reach.checkpoint")),
        ..BatchConfig::default()
    };
    let orchestrator = BatchOrchestrator::new(&store, &registry, config);
    let report = orchestrator
        .run_store(&ReachJob::reach(TraitKind::SemanticVector, 1), &IncludeAll)
        .unwrap();

    // R, C1, C2, E carry vectors
    assert_eq!(report.processed, 4);
    assert_eq!(report.updated, 4);
    assert_eq!(report.failed, 0);
    assert!(!report.cancelled);

    assert!(close(field(&store, "R", "1_gen_avg_dist_w2v").unwrap(), 0.5));
    assert_eq!(field(&store, "C2", "1_gen_avg_dist_w2v"), Some(0.0));
    assert_eq!(field(&store, "E", "1_gen_sum_dist_w2v"), Some(NO_DATA));
    assert_eq!(field(&store, "N1", "1_gen_sum_dist_w2v"), None);

    // finished scans leave no checkpoint behind
    let checkpoint = CheckpointFile::new(dir.path().join("reach.checkpoint"));
    assert!(checkpoint.load().unwrap().is_none());

    // results survive reopening
    drop(orchestrator);
    drop(store);
    let reopened = LmdbStore::open(dir.path()).unwrap();
    assert!(close(field(&reopened, "R", "1_gen_sum_dist_w2v").unwrap(), 1.0));
}

#[test]
fn test_family_run_counts_missing_roots() {
    let store = MemoryStore::from_records(family());
    let registry = TraitRegistry::new();
    let orchestrator = BatchOrchestrator::new(&store, &registry, BatchConfig::default());
    let roots = [RecordId::from("R"), RecordId::from("ghost")];
    let report = orchestrator
        .run_family(&roots, &ReachJob::variance(TraitKind::SemanticVector, 1), &IncludeAll)
        .unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.updated, 1);
    assert_eq!(report.missing, 1);
    assert!(field(&store, "R", "1_gen_variance_dist_w2v").is_some());
}

#[test]
fn test_config_drives_a_run() {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    for record in family() {
        writeln!(input, "{}", serde_json::to_string(&record).unwrap()).unwrap();
    }
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"{{"trait": "w2v", "generations": 1, "operation": "reach", "ids": ["R"]}}"#
    )
    .unwrap();

    let config = ReachConfig::load(config_file.path()).unwrap();
    assert_eq!(config.operation, Operation::Reach);

    let store = MemoryStore::from_json_lines(input.path()).unwrap();
    let registry = config.registry().unwrap();
    let predicate = config.predicate();
    let report = BatchOrchestrator::new(&store, &registry, config.batch_config())
        .run_family(&config.ids, &config.job(), predicate.as_ref())
        .unwrap();
    assert_eq!(report.updated, 1);

    let output = tempfile::NamedTempFile::new().unwrap();
    store.write_json_lines(output.path()).unwrap();
    let reloaded = MemoryStore::from_json_lines(output.path()).unwrap();
    assert!(close(field(&reloaded, "R", "1_gen_avg_dist_w2v").unwrap(), 0.5));
}
