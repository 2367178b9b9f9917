//! Contract every storage backend under test implements, plus the registry
//! of backends the harness knows how to build.

use std::fmt;
use std::str::FromStr;

use crate::bench::{OperationType, Recorder};
use crate::core::BenchError;
use crate::progress::ProgressSender;

pub mod entity;
mod memory;
mod scenario;
mod sqlite;

pub use memory::MemoryAdapter;
pub use scenario::{EntityKind, EntityStore, UNINDEXED_QUERY_LIMIT};
pub use sqlite::SqliteAdapter;

/// What an adapter gets to see while a run is in progress: the phase
/// recorder and the progress stream.
pub struct RunContext<'a> {
    recorder: &'a mut Recorder,
    progress: &'a ProgressSender,
}

impl<'a> RunContext<'a> {
    pub fn new(recorder: &'a mut Recorder, progress: &'a ProgressSender) -> Self {
        Self { recorder, progress }
    }

    pub fn log(&self, text: &str) -> Result<(), BenchError> {
        self.progress.info(text)
    }

    pub fn start(&mut self, phase: &str) {
        self.recorder.start(phase);
    }

    /// Closes the open phase and posts its duration.
    pub fn stop(&mut self) -> Result<(), BenchError> {
        let line = self.recorder.stop()?;
        self.progress.info(&line)
    }

    /// Times `f` as a single phase.
    pub fn measure<T>(
        &mut self,
        phase: &str,
        f: impl FnOnce() -> Result<T, BenchError>,
    ) -> Result<T, BenchError> {
        self.start(phase);
        let value = f()?;
        self.stop()?;
        Ok(value)
    }
}

/// A storage backend under test.
///
/// For every run the orchestrator calls `set_up`, `dispatch` and `tear_down`
/// in that order; `tear_down` is called even when `dispatch` failed.
pub trait BenchAdapter: Send {
    /// Stable identifier used in result file names and logs.
    fn name(&self) -> &str;

    fn configure(&mut self, entity_count: usize);

    /// Opens backend resources and clears any state left from earlier runs.
    fn set_up(&mut self, ctx: &mut RunContext<'_>) -> Result<(), BenchError>;

    /// Performs the phases implied by `operation`, timing each through `ctx`.
    /// Fails with `UnsupportedOperation` for scenarios the backend lacks.
    fn dispatch(
        &mut self,
        operation: OperationType,
        ctx: &mut RunContext<'_>,
    ) -> Result<(), BenchError>;

    /// Releases everything `set_up` acquired, including files on disk.
    fn tear_down(&mut self, ctx: &mut RunContext<'_>) -> Result<(), BenchError>;

    /// Called once after the last repetition for this adapter.
    fn on_suite_complete(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Memory,
    Sqlite,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 2] = [AdapterKind::Memory, AdapterKind::Sqlite];

    pub fn name(&self) -> &'static str {
        match self {
            AdapterKind::Memory => "memory",
            AdapterKind::Sqlite => "sqlite",
        }
    }

    pub fn create(&self) -> Box<dyn BenchAdapter> {
        match self {
            AdapterKind::Memory => Box::new(MemoryAdapter::new()),
            AdapterKind::Sqlite => Box::new(SqliteAdapter::new()),
        }
    }

    /// Builds fresh adapters for the given names, keeping their order.
    pub fn create_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Box<dyn BenchAdapter>>, BenchError> {
        names
            .iter()
            .map(|name| name.as_ref().parse::<AdapterKind>().map(|kind| kind.create()))
            .collect()
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdapterKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdapterKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| BenchError::UnknownAdapter(s.to_string()))
    }
}
