use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use perfbench::bench::OperationType;
use perfbench::conf::Config;

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("perfbench.toml");
    fs::write(
        &path,
        r#"
        [suite]
        adapters = ["memory"]
        operation = "crud_indexed"
        runs = 5

        [results]
        dir = "/srv/results"
        fallback_dir = "/tmp/perfbench-private"

        [progress]
        timeout = "30s"
        "#,
    )
    .unwrap();

    let config = Config::load(path.to_str()).unwrap();
    assert_eq!(config.suite.adapters, vec!["memory"]);
    assert_eq!(config.suite.operation, OperationType::CrudIndexed);
    assert_eq!(config.suite.runs, 5);
    assert_eq!(config.suite.entities, 100_000);
    assert_eq!(config.results.dir, PathBuf::from("/srv/results"));
    assert_eq!(config.progress.timeout, Duration::from_secs(30));
    assert_eq!(config.progress.settle, Duration::from_millis(20));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(Config::load(path.to_str()).is_err());
}
