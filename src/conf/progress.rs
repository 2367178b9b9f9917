use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProgressConfig {
    /// How long the worker waits for a posted line to be rendered.
    #[serde(with = "humantime_serde", default = "ProgressConfig::default_timeout")]
    pub timeout: Duration,
    /// Pause after each rendered line so presentation work does not bleed
    /// into the next measured phase.
    #[serde(with = "humantime_serde", default = "ProgressConfig::default_settle")]
    pub settle: Duration,
}

impl ProgressConfig {
    fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn default_settle() -> Duration {
        Duration::from_millis(20)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            timeout: Self::default_timeout(),
            settle: Self::default_settle(),
        }
    }
}
