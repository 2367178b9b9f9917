use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResultsConfig {
    /// Preferred location for `.tsv` result files.
    #[serde(default = "ResultsConfig::default_dir")]
    pub dir: PathBuf,
    /// Private location used when `dir` is not writable.
    #[serde(default = "ResultsConfig::default_fallback_dir")]
    pub fallback_dir: PathBuf,
}

impl ResultsConfig {
    fn default_dir() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    fn default_fallback_dir() -> PathBuf {
        std::env::temp_dir().join("perfbench")
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            fallback_dir: Self::default_fallback_dir(),
        }
    }
}
