mod args;
pub mod device;
mod error;
mod logger;

pub use args::CliArgs;
pub use error::BenchError;
pub use logger::setup_logging;
