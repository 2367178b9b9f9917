//! Test utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::adapter::{BenchAdapter, RunContext};
use crate::bench::OperationType;
use crate::conf::{ProgressConfig, ResultsConfig};
use crate::core::BenchError;
use crate::progress::{self, CaptureView, ProgressLine};
use crate::runner::{Orchestrator, RunConfiguration, SuiteReport};

/// Lifecycle call observed on a [`ScriptedAdapter`], tagged with the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Configure(usize),
    SetUp(u32),
    Dispatch(u32),
    TearDown(u32),
    SuiteComplete,
}

pub type Journal = Arc<Mutex<Vec<Call>>>;
type DispatchHook = Box<dyn FnMut(u32) + Send>;

/// Adapter whose behaviour is scripted per run: it records a fixed list of
/// phases and can be told to fail or panic on a given run.
pub struct ScriptedAdapter {
    name: String,
    phases: Vec<String>,
    supported: Option<Vec<OperationType>>,
    fail_set_up_on: Option<u32>,
    fail_dispatch_on: Option<u32>,
    fail_tear_down_on: Option<u32>,
    panic_on: Option<u32>,
    panic_on_configure: bool,
    stop_without_start_on: Option<u32>,
    hook: Option<DispatchHook>,
    journal: Journal,
    run: u32,
}

impl ScriptedAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            phases: ["insert", "update", "load", "access", "delete"]
                .map(String::from)
                .to_vec(),
            supported: None,
            fail_set_up_on: None,
            fail_dispatch_on: None,
            fail_tear_down_on: None,
            panic_on: None,
            panic_on_configure: false,
            stop_without_start_on: None,
            hook: None,
            journal: Arc::new(Mutex::new(Vec::new())),
            run: 0,
        }
    }

    pub fn phases(mut self, phases: &[&str]) -> Self {
        self.phases = phases.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn supports(mut self, operations: &[OperationType]) -> Self {
        self.supported = Some(operations.to_vec());
        self
    }

    pub fn fail_set_up_on(mut self, run: u32) -> Self {
        self.fail_set_up_on = Some(run);
        self
    }

    pub fn fail_dispatch_on(mut self, run: u32) -> Self {
        self.fail_dispatch_on = Some(run);
        self
    }

    pub fn fail_tear_down_on(mut self, run: u32) -> Self {
        self.fail_tear_down_on = Some(run);
        self
    }

    pub fn panic_on(mut self, run: u32) -> Self {
        self.panic_on = Some(run);
        self
    }

    pub fn panic_on_configure(mut self) -> Self {
        self.panic_on_configure = true;
        self
    }

    pub fn stop_without_start_on(mut self, run: u32) -> Self {
        self.stop_without_start_on = Some(run);
        self
    }

    /// Called at the start of every dispatch with the run ordinal.
    pub fn on_dispatch(mut self, hook: impl FnMut(u32) + Send + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn journal(&self) -> Journal {
        Arc::clone(&self.journal)
    }

    fn note(&self, call: Call) {
        self.journal.lock().unwrap().push(call);
    }

    fn failure(&self, what: &str) -> BenchError {
        BenchError::adapter(&self.name, format!("{what} failed in run {}", self.run))
    }
}

impl BenchAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, entity_count: usize) {
        self.note(Call::Configure(entity_count));
        if self.panic_on_configure {
            panic!("scripted panic in configure");
        }
    }

    fn set_up(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        self.run += 1;
        self.note(Call::SetUp(self.run));
        if self.fail_set_up_on == Some(self.run) {
            return Err(self.failure("set_up"));
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        operation: OperationType,
        ctx: &mut RunContext<'_>,
    ) -> Result<(), BenchError> {
        self.note(Call::Dispatch(self.run));
        if let Some(hook) = self.hook.as_mut() {
            hook(self.run);
        }
        if let Some(supported) = &self.supported {
            if !supported.contains(&operation) {
                return Err(BenchError::UnsupportedOperation {
                    adapter: self.name.clone(),
                    operation: operation.short_name().to_string(),
                });
            }
        }
        if self.panic_on == Some(self.run) {
            panic!("scripted panic in run {}", self.run);
        }
        if self.stop_without_start_on == Some(self.run) {
            ctx.stop()?;
        }
        for phase in &self.phases {
            ctx.start(phase);
            ctx.stop()?;
        }
        if self.fail_dispatch_on == Some(self.run) {
            return Err(self.failure("dispatch"));
        }
        Ok(())
    }

    fn tear_down(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        self.note(Call::TearDown(self.run));
        if self.fail_tear_down_on == Some(self.run) {
            return Err(self.failure("tear_down"));
        }
        Ok(())
    }

    fn on_suite_complete(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        self.note(Call::SuiteComplete);
        Ok(())
    }
}

/// Orchestrator wired to an in-memory view and a scratch results directory.
/// Must be created inside a multi-threaded tokio runtime.
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub dir: TempDir,
    lines: Arc<Mutex<Vec<ProgressLine>>>,
    completions: Arc<AtomicUsize>,
    _presenter: JoinHandle<Result<(), BenchError>>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let results = ResultsConfig {
            dir: dir.path().to_path_buf(),
            fallback_dir: dir.path().join("private"),
        };
        Self::with_results(dir, results)
    }

    pub fn with_results(dir: TempDir, results: ResultsConfig) -> Self {
        let config = ProgressConfig {
            timeout: Duration::from_secs(5),
            settle: Duration::ZERO,
        };
        let (sender, receiver) = progress::channel(&config, Handle::current());
        let mut view = CaptureView::new();
        let lines = view.lines();
        let presenter = tokio::spawn(async move { receiver.present(&mut view).await });

        Self {
            orchestrator: Arc::new(Orchestrator::new(
                sender,
                results,
                "Host: test".to_string(),
            )),
            dir,
            lines,
            completions: Arc::new(AtomicUsize::new(0)),
            _presenter: presenter,
        }
    }

    /// Runs a suite to completion and returns the report passed to the
    /// completion callback.
    pub async fn run(
        &self,
        config: RunConfiguration,
        adapters: Vec<Box<dyn BenchAdapter>>,
    ) -> SuiteReport {
        let completions = Arc::clone(&self.completions);
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = self
            .orchestrator
            .run(config, adapters, move |report| {
                completions.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(report.clone());
            })
            .unwrap();
        let returned = handle.await.unwrap();
        let notified = rx.await.unwrap();
        assert_eq!(returned, notified);
        notified
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn result_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }

    /// Lines of a result file, empty if it was never written.
    pub fn result_lines(&self, file_name: &str) -> Vec<String> {
        std::fs::read_to_string(self.result_path(file_name))
            .map(|content| content.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<ProgressLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn error_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.is_error)
            .map(|l| l.text)
            .collect()
    }
}

pub fn crud(runs: u32, entities: usize) -> RunConfiguration {
    RunConfiguration {
        operation: OperationType::Crud,
        runs,
        entities,
    }
}
