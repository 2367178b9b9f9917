use serde::{Deserialize, Serialize};

use crate::bench::OperationType;

/// Defaults for what to run when the command line does not say otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    #[serde(default = "SuiteConfig::default_adapters")]
    pub adapters: Vec<String>,
    #[serde(default)]
    pub operation: OperationType,
    #[serde(default = "SuiteConfig::default_runs")]
    pub runs: u32,
    #[serde(default = "SuiteConfig::default_entities")]
    pub entities: usize,
}

impl SuiteConfig {
    fn default_adapters() -> Vec<String> {
        vec![String::from("memory"), String::from("sqlite")]
    }

    fn default_runs() -> u32 {
        1
    }

    fn default_entities() -> usize {
        100_000
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            adapters: Self::default_adapters(),
            operation: OperationType::default(),
            runs: Self::default_runs(),
            entities: Self::default_entities(),
        }
    }
}
