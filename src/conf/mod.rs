mod config;
mod progress;
mod results;
mod suite;

pub use config::Config;
pub use progress::ProgressConfig;
pub use results::ResultsConfig;
pub use suite::SuiteConfig;
