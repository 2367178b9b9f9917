use rstest::rstest;

use perfbench::adapter::{AdapterKind, BenchAdapter, SqliteAdapter, UNINDEXED_QUERY_LIMIT};
use perfbench::bench::{OperationType, ResultSink};
use perfbench::runner::{RunConfiguration, SuiteOutcome};
use perfbench::testutil::Harness;

const ENTITIES: usize = 200;

fn phases_of(lines: &[String]) -> Vec<&str> {
    lines.iter().map(|l| l.split('\t').next().unwrap()).collect()
}

#[rstest]
#[case(OperationType::Crud, &["insert", "update", "load", "access", "delete"])]
#[case(OperationType::CrudScalars, &["insert", "update", "load", "access", "delete"])]
#[case(OperationType::CrudIndexed, &["insert", "update", "load", "access", "delete"])]
#[case(OperationType::QueryString, &["insert", "query"])]
#[case(OperationType::QueryStringIndexed, &["insert", "query"])]
#[case(OperationType::QueryInteger, &["insert", "query"])]
#[case(OperationType::QueryIntegerIndexed, &["insert", "query"])]
#[case(OperationType::QueryId, &["insert", "query"])]
#[case(OperationType::QueryIdRandom, &["insert", "query"])]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_backends_record_expected_phases(
    #[case] operation: OperationType,
    #[case] expected: &[&str],
) {
    let harness = Harness::new();
    let config = RunConfiguration {
        operation,
        runs: 2,
        entities: ENTITIES,
    };
    let adapters = AdapterKind::create_all(&["memory", "sqlite"]).unwrap();

    let report = harness.run(config, adapters).await;

    assert_eq!(report.outcome, SuiteOutcome::Completed);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.committed_runs, 4);

    let twice: Vec<&str> = expected.iter().chain(expected.iter()).copied().collect();
    for kind in AdapterKind::ALL {
        let file = ResultSink::file_name(kind.name(), operation, ENTITIES);
        let lines = harness.result_lines(&file);
        assert_eq!(phases_of(&lines), twice, "{file}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_reports_found_entities() {
    let harness = Harness::new();
    let config = RunConfiguration {
        operation: OperationType::QueryStringIndexed,
        runs: 1,
        entities: ENTITIES,
    };

    harness
        .run(config, AdapterKind::create_all(&["memory"]).unwrap())
        .await;

    let found: Vec<usize> = harness
        .lines()
        .iter()
        .filter_map(|l| l.text.strip_prefix("Entities found: "))
        .map(|n| n.parse().unwrap())
        .collect();
    assert_eq!(found.len(), 1);
    assert!(found[0] >= ENTITIES);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unindexed_query_skipped_above_limit() {
    let harness = Harness::new();
    let entities = UNINDEXED_QUERY_LIMIT + 1;
    let config = RunConfiguration {
        operation: OperationType::QueryInteger,
        runs: 1,
        entities,
    };

    let report = harness
        .run(config, AdapterKind::create_all(&["memory"]).unwrap())
        .await;

    assert_eq!(report.outcome, SuiteOutcome::Completed);
    assert_eq!(report.committed_runs, 1);
    let file = ResultSink::file_name("memory", OperationType::QueryInteger, entities);
    assert!(harness.result_lines(&file).is_empty());
    assert!(
        harness
            .lines()
            .iter()
            .any(|l| l.text.starts_with("Reduce number of entities to 10000"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sqlite_deletes_database_after_each_run() {
    let harness = Harness::new();
    let config = RunConfiguration {
        operation: OperationType::QueryId,
        runs: 2,
        entities: 20,
    };

    harness
        .run(config, AdapterKind::create_all(&["sqlite"]).unwrap())
        .await;

    let texts: Vec<String> = harness.lines().into_iter().map(|l| l.text).collect();
    assert_eq!(
        texts.iter().filter(|t| *t == "DB deleted: true").count(),
        2
    );
    assert!(!texts.iter().any(|t| t == "DB existed before start - deleted"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sqlite_removes_stale_database() {
    let harness = Harness::new();
    let db_dir = tempfile::TempDir::new().unwrap();
    let db = db_dir.path().join("stale.sqlite");
    std::fs::write(&db, b"left over").unwrap();
    std::fs::write(db_dir.path().join("stale.sqlite-wal"), b"").unwrap();
    let config = RunConfiguration {
        operation: OperationType::QueryId,
        runs: 2,
        entities: 5,
    };
    let adapters: Vec<Box<dyn BenchAdapter>> = vec![Box::new(SqliteAdapter::at(&db))];

    let report = harness.run(config, adapters).await;

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.committed_runs, 2);
    let texts: Vec<String> = harness.lines().into_iter().map(|l| l.text).collect();
    assert_eq!(
        texts
            .iter()
            .filter(|t| *t == "DB existed before start - deleted")
            .count(),
        1
    );
    assert!(!db.exists());
    assert!(!db_dir.path().join("stale.sqlite-wal").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_entities() {
    let harness = Harness::new();
    let config = RunConfiguration {
        operation: OperationType::QueryIdRandom,
        runs: 1,
        entities: 0,
    };

    let report = harness
        .run(config, AdapterKind::create_all(&["memory", "sqlite"]).unwrap())
        .await;

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(
        phases_of(&harness.result_lines("memory-query_id_random-0.tsv")),
        vec!["insert", "query"]
    );
}
