//! Phase stopwatch that collects the timing samples of one run and commits
//! them to a [`ResultSink`].
//!
//! Starting a phase while another one is open replaces it without emitting a
//! sample, like restarting a stopwatch.

use std::time::{Duration, Instant};

use log::debug;

use crate::bench::ResultSink;
use crate::core::BenchError;

#[derive(Debug, Clone, PartialEq)]
pub struct TimingSample {
    pub phase: String,
    pub elapsed: Duration,
}

impl TimingSample {
    /// Tab separated form used in result files. Tabs, newlines and
    /// backslashes in the phase name are escaped so every sample stays on
    /// one two-column line.
    pub fn to_line(&self) -> String {
        format!("{}\t{}", escape_phase(&self.phase), self.elapsed.as_millis())
    }
}

fn escape_phase(phase: &str) -> String {
    let mut escaped = String::with_capacity(phase.len());
    for c in phase.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Samples of exactly one (adapter, repetition) execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRecord {
    pub run: u32,
    pub samples: Vec<TimingSample>,
}

pub struct Recorder {
    sink: ResultSink,
    open: Option<(String, Instant)>,
    record: RunRecord,
}

impl Recorder {
    pub fn new(sink: ResultSink) -> Self {
        Self {
            sink,
            open: None,
            record: RunRecord::default(),
        }
    }

    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Resets the in-memory record for the given run ordinal.
    pub fn begin_run(&mut self, run: u32) {
        self.open = None;
        self.record = RunRecord {
            run,
            samples: Vec::new(),
        };
    }

    pub fn start(&mut self, phase: &str) {
        if let Some((previous, _)) = &self.open {
            debug!("phase '{previous}' replaced by '{phase}' before stop");
        }
        self.open = Some((phase.to_string(), Instant::now()));
    }

    /// Closes the open phase and returns a `phase: N ms` line for display.
    pub fn stop(&mut self) -> Result<String, BenchError> {
        let (phase, started) = self.open.take().ok_or(BenchError::InvalidTimerState)?;
        let elapsed = started.elapsed();
        let line = format!("{}: {} ms", phase, elapsed.as_millis());
        self.record.samples.push(TimingSample { phase, elapsed });
        Ok(line)
    }

    /// Appends the current run's samples to the result file and clears them.
    pub fn commit(&mut self) -> Result<(), BenchError> {
        self.sink.append(&self.record.samples)?;
        debug!(
            "committed {} samples of run {} to {}",
            self.record.samples.len(),
            self.record.run,
            self.sink.path().display()
        );
        self.record.samples.clear();
        self.open = None;
        Ok(())
    }

    /// Drops whatever the current run has recorded so far.
    pub fn discard(&mut self) {
        self.record.samples.clear();
        self.open = None;
    }
}
