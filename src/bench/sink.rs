use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::bench::{OperationType, TimingSample};
use crate::conf::ResultsConfig;
use crate::core::BenchError;

/// Append-only `.tsv` file holding the timing samples of every committed run
/// for one (adapter, operation, entity count) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSink {
    path: PathBuf,
    fallback_note: Option<String>,
}

impl ResultSink {
    pub fn file_name(adapter: &str, operation: OperationType, entities: usize) -> String {
        format!("{}-{}-{}.tsv", adapter, operation.short_name(), entities)
    }

    /// Sink writing to an explicit path, no fallback handling.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback_note: None,
        }
    }

    /// Places the file in the preferred directory, or in the fallback
    /// directory when the preferred one cannot be written.
    pub fn locate(config: &ResultsConfig, file_name: &str) -> Result<Self, BenchError> {
        let preferred = config.dir.join(file_name);
        let reason = match probe_writable(&config.dir) {
            Ok(()) => return Ok(Self::at(preferred)),
            Err(reason) => reason,
        };

        fs::create_dir_all(&config.fallback_dir).map_err(|e| {
            BenchError::IoError(format!(
                "creating fallback directory {}: {}",
                config.fallback_dir.display(),
                e
            ))
        })?;
        let fallback = config.fallback_dir.join(file_name);
        let note = format!(
            "Using file {} because {} is not writable ({})",
            fallback.display(),
            preferred.display(),
            reason
        );
        info!("{note}");
        Ok(Self {
            path: fallback,
            fallback_note: Some(note),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set when `locate` had to fall back to the private directory.
    pub fn fallback_note(&self) -> Option<&str> {
        self.fallback_note.as_deref()
    }

    pub fn append(&self, samples: &[TimingSample]) -> Result<(), BenchError> {
        if samples.is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BenchError::IoError(format!("opening {}: {}", self.path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        for sample in samples {
            writeln!(writer, "{}", sample.to_line())?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn probe_writable(dir: &Path) -> Result<(), String> {
    if !dir.is_dir() {
        return Err("not a directory".to_string());
    }
    let probe = dir.join(".perfbench_write_probe");
    let result = fs::write(&probe, b"").map_err(|e| e.to_string());
    let _ = fs::remove_file(&probe);
    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn sample(phase: &str, ms: u64) -> TimingSample {
        TimingSample {
            phase: phase.to_string(),
            elapsed: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            ResultSink::file_name("sqlite", OperationType::CrudIndexed, 1000),
            "sqlite-crud_indexed-1000.tsv"
        );
        assert_eq!(
            ResultSink::file_name("memory", OperationType::Crud, 0),
            "memory-crud-0.tsv"
        );
    }

    #[test]
    fn test_locate_preferred_dir() {
        let dir = TempDir::new().unwrap();
        let config = ResultsConfig {
            dir: dir.path().to_path_buf(),
            fallback_dir: dir.path().join("private"),
        };
        let sink = ResultSink::locate(&config, "a-crud-1.tsv").unwrap();
        assert_eq!(sink.path(), dir.path().join("a-crud-1.tsv"));
        assert!(sink.fallback_note().is_none());
    }

    #[test]
    fn test_locate_falls_back_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = ResultsConfig {
            dir: dir.path().join("does-not-exist"),
            fallback_dir: dir.path().join("private"),
        };
        let sink = ResultSink::locate(&config, "a-crud-1.tsv").unwrap();
        assert_eq!(sink.path(), dir.path().join("private").join("a-crud-1.tsv"));
        let note = sink.fallback_note().unwrap();
        assert!(note.contains("not a directory"), "{note}");
    }

    #[test]
    fn test_append_without_separator() {
        let dir = TempDir::new().unwrap();
        let sink = ResultSink::at(dir.path().join("x.tsv"));
        sink.append(&[sample("insert", 5), sample("delete", 7)]).unwrap();
        sink.append(&[sample("insert", 6)]).unwrap();
        let content = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "insert\t5\ndelete\t7\ninsert\t6\n");
    }

    #[test]
    fn test_append_nothing_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let sink = ResultSink::at(dir.path().join("x.tsv"));
        sink.append(&[]).unwrap();
        assert!(!sink.path().exists());
    }
}
