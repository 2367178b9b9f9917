mod orchestrator;
mod state;

pub use orchestrator::{Orchestrator, RunConfiguration};
pub use state::{SuiteOutcome, SuiteReport, SuiteState};
