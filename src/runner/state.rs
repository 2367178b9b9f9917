use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::core::BenchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SuiteState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Aborted = 3,
}

impl SuiteState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SuiteState::Running,
            2 => SuiteState::Completed,
            3 => SuiteState::Aborted,
            _ => SuiteState::Idle,
        }
    }
}

/// How a suite ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteOutcome {
    /// Every adapter ran; some may have failed individually.
    Completed,
    /// Stopped early by `Orchestrator::destroy`.
    Cancelled,
    /// Stopped by an error that made further progress reporting impossible.
    Aborted(BenchError),
}

impl SuiteOutcome {
    pub fn state(&self) -> SuiteState {
        match self {
            SuiteOutcome::Completed => SuiteState::Completed,
            SuiteOutcome::Cancelled | SuiteOutcome::Aborted(_) => SuiteState::Aborted,
        }
    }
}

/// Handed to the completion callback and returned from the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub outcome: SuiteOutcome,
    /// Number of runs whose samples were committed, across all adapters.
    pub committed_runs: u32,
    /// Adapters that stopped early, with the error that stopped them.
    pub failures: Vec<(String, BenchError)>,
}

impl SuiteReport {
    pub(crate) fn new() -> Self {
        Self {
            outcome: SuiteOutcome::Completed,
            committed_runs: 0,
            failures: Vec::new(),
        }
    }
}

/// Flags shared between the worker and whoever owns the orchestrator.
#[derive(Debug)]
pub(crate) struct SuiteFlags {
    state: AtomicU8,
    destroyed: AtomicBool,
}

impl SuiteFlags {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(SuiteState::Idle as u8),
            destroyed: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> SuiteState {
        SuiteState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Moves to `Running` unless a suite is already running.
    pub(crate) fn try_start(&self) -> Result<(), BenchError> {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if current == SuiteState::Running as u8 {
                return Err(BenchError::AlreadyRunning);
            }
            match self.state.compare_exchange(
                current,
                SuiteState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn finish(&self, state: SuiteState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}
