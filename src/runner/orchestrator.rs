//! Drives a suite: every selected adapter, every repetition, one at a time on
//! a single blocking worker so backends never compete for CPU or disk.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Local;
use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::adapter::{BenchAdapter, RunContext};
use crate::bench::{OperationType, Recorder, ResultSink};
use crate::conf::ResultsConfig;
use crate::core::BenchError;
use crate::progress::ProgressSender;
use crate::runner::state::{SuiteFlags, SuiteOutcome, SuiteReport, SuiteState};

const RUN_SEPARATOR: &str = "------------------------------";

/// What to run. Ranges are validated by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfiguration {
    pub operation: OperationType,
    pub runs: u32,
    pub entities: usize,
}

pub struct Orchestrator {
    flags: Arc<SuiteFlags>,
    progress: ProgressSender,
    results: ResultsConfig,
    device_info: String,
}

impl Orchestrator {
    pub fn new(progress: ProgressSender, results: ResultsConfig, device_info: String) -> Self {
        Self {
            flags: Arc::new(SuiteFlags::new()),
            progress,
            results,
            device_info,
        }
    }

    pub fn state(&self) -> SuiteState {
        self.flags.state()
    }

    pub fn is_running(&self) -> bool {
        self.flags.state() == SuiteState::Running
    }

    /// Requests cancellation. The running operation is not interrupted, but
    /// no further repetition or adapter starts. Cancellation is permanent for
    /// this orchestrator.
    pub fn destroy(&self) {
        info!("suite cancellation requested");
        self.flags.destroy();
    }

    /// Starts a suite on a blocking worker. `on_complete` fires exactly once
    /// when the suite ends, whatever the outcome.
    pub fn run<F>(
        &self,
        config: RunConfiguration,
        adapters: Vec<Box<dyn BenchAdapter>>,
        on_complete: F,
    ) -> Result<JoinHandle<SuiteReport>, BenchError>
    where
        F: FnOnce(&SuiteReport) + Send + 'static,
    {
        self.flags.try_start()?;
        info!(
            "starting suite: {} adapters, operation '{}', {} runs, {} entities",
            adapters.len(),
            config.operation.short_name(),
            config.runs,
            config.entities
        );

        let suite = Suite {
            flags: Arc::clone(&self.flags),
            progress: self.progress.clone(),
            results: self.results.clone(),
            device_info: self.device_info.clone(),
            config,
        };
        let handle = self.progress.runtime().spawn_blocking(move || {
            let report = panic::catch_unwind(AssertUnwindSafe(|| suite.execute(adapters)))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload);
                    error!("suite worker {message}");
                    let mut report = SuiteReport::new();
                    report.outcome = SuiteOutcome::Aborted(BenchError::WorkerPanicked(message));
                    report
                });
            suite.flags.finish(report.outcome.state());
            on_complete(&report);
            report
        });
        Ok(handle)
    }
}

struct Suite {
    flags: Arc<SuiteFlags>,
    progress: ProgressSender,
    results: ResultsConfig,
    device_info: String,
    config: RunConfiguration,
}

impl Suite {
    fn execute(&self, adapters: Vec<Box<dyn BenchAdapter>>) -> SuiteReport {
        let mut report = SuiteReport::new();
        let mut device_info_posted = false;

        for mut adapter in adapters {
            if self.flags.is_destroyed() {
                report.outcome = SuiteOutcome::Cancelled;
                return report;
            }
            if !device_info_posted {
                if let Err(e) = self.progress.info(&self.device_info) {
                    report.outcome = SuiteOutcome::Aborted(e);
                    return report;
                }
                device_info_posted = true;
            }

            let name = adapter.name().to_string();
            let result = self.run_adapter(adapter.as_mut(), &mut report);
            drop(adapter);

            let Err(e) = result else { continue };
            if e.is_fatal() {
                error!("suite aborted while running {name}: {e}");
                report.outcome = SuiteOutcome::Aborted(e);
                return report;
            }
            let line = match &e {
                BenchError::UnsupportedOperation { .. } => format!("Skipped because {e}"),
                _ => format!("Aborted because of {e}"),
            };
            report.failures.push((name, e));
            if let Err(fatal) = self.progress.error(&line) {
                report.outcome = SuiteOutcome::Aborted(fatal);
                return report;
            }
        }

        if self.flags.is_destroyed() {
            report.outcome = SuiteOutcome::Cancelled;
        }
        report
    }

    fn run_adapter(
        &self,
        adapter: &mut dyn BenchAdapter,
        report: &mut SuiteReport,
    ) -> Result<(), BenchError> {
        let config = self.config;
        let name = adapter.name().to_string();
        guarded(&name, || {
            adapter.configure(config.entities);
            Ok(())
        })?;

        let file_name = ResultSink::file_name(&name, config.operation, config.entities);
        let (sink, located) = match ResultSink::locate(&self.results, &file_name) {
            Ok(sink) => (sink, Ok(())),
            Err(e) => (ResultSink::at(self.results.dir.join(&file_name)), Err(e)),
        };
        let mut recorder = Recorder::new(sink);
        let repeated = located.and_then(|()| self.announce_and_repeat(adapter, &mut recorder, report));

        let mut ctx = RunContext::new(&mut recorder, &self.progress);
        let completed = guarded(&name, || adapter.on_suite_complete(&mut ctx));
        repeated?;
        completed?;

        self.progress.info(&format!(
            "\nTests done at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ))
    }

    fn announce_and_repeat(
        &self,
        adapter: &mut dyn BenchAdapter,
        recorder: &mut Recorder,
        report: &mut SuiteReport,
    ) -> Result<(), BenchError> {
        if let Some(note) = recorder.sink().fallback_note() {
            self.progress.info(note)?;
        }
        self.progress.info(&format!(
            "\nStarting tests with {} entities at {}",
            self.config.entities,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ))?;
        self.repeat(adapter, recorder, report)
    }

    fn repeat(
        &self,
        adapter: &mut dyn BenchAdapter,
        recorder: &mut Recorder,
        report: &mut SuiteReport,
    ) -> Result<(), BenchError> {
        let config = self.config;
        let name = adapter.name().to_string();

        for run in 1..=config.runs {
            self.progress.info(&format!(
                "\n{} {} ({}/{})\n{}",
                name, config.operation, run, config.runs, RUN_SEPARATOR
            ))?;
            recorder.begin_run(run);

            let mut ctx = RunContext::new(recorder, &self.progress);
            let dispatched = guarded(&name, || adapter.set_up(&mut ctx))
                .and_then(|()| guarded(&name, || adapter.dispatch(config.operation, &mut ctx)));
            let torn_down = guarded(&name, || adapter.tear_down(&mut ctx));

            if let Err(e) = dispatched.and(torn_down) {
                recorder.discard();
                return Err(e);
            }
            recorder.commit()?;
            report.committed_runs += 1;

            if self.flags.is_destroyed() {
                warn!("{name}: cancelled after run {run}/{}", config.runs);
                break;
            }
        }
        Ok(())
    }
}

/// Runs an adapter callback, turning a panic into an `AdapterFailure` so the
/// remaining lifecycle calls still happen.
fn guarded<T>(adapter: &str, f: impl FnOnce() -> Result<T, BenchError>) -> Result<T, BenchError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(BenchError::adapter(adapter, panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => format!("panicked: {message}"),
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => format!("panicked: {message}"),
            Err(_) => "panicked".to_string(),
        },
    }
}
