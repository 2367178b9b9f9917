use std::path::PathBuf;

use config::Config as CConfig;
use serde::{Deserialize, Serialize};

use crate::conf::{ProgressConfig, ResultsConfig, SuiteConfig};
use crate::core::BenchError::{self, ConfigParsingError};

const ENV_PREFIX: &str = "PERFBENCH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub suite: SuiteConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, BenchError> {
        let config = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        Ok(config)
    }

    /// Loads the optional TOML file, then applies `PERFBENCH_*` environment
    /// overrides, e.g. `PERFBENCH_SUITE__RUNS=3`.
    pub fn load(path: Option<&str>) -> Result<Config, BenchError> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(PathBuf::from(path)));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bench::OperationType;

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [suite]
        adapters = ["sqlite"]
        operation = "query_id_random"
        runs = 3
        entities = 1000

        [progress]
        timeout = "2s"
        settle = "0ms"
        "#;
        let conf = Config::from_str(toml).unwrap();
        assert_eq!(
            conf.suite,
            SuiteConfig {
                adapters: vec!["sqlite".to_string()],
                operation: OperationType::QueryIdRandom,
                runs: 3,
                entities: 1000,
            }
        );
        assert_eq!(conf.progress.timeout, Duration::from_secs(2));
        assert_eq!(conf.progress.settle, Duration::ZERO);
        assert_eq!(conf.results, ResultsConfig::default());
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let conf = Config::from_str("").unwrap();
        assert_eq!(conf, Config::default());
    }

    #[test]
    fn unknown_operation_rejected() {
        let toml = r#"
        [suite]
        operation = "bulk"
        "#;
        assert!(matches!(
            Config::from_str(toml),
            Err(BenchError::ConfigParsingError(_))
        ));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml = r#"
        [server]
        port = 3000
        "#;
        assert!(Config::from_str(toml).is_err());
    }
}
