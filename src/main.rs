use std::io::IsTerminal;

use anyhow::bail;
use clap::Parser;
use log::{error, info};
use tokio::runtime::Handle;

use perfbench::adapter::AdapterKind;
use perfbench::bench::OperationType;
use perfbench::conf::Config;
use perfbench::core::{CliArgs, device, setup_logging};
use perfbench::progress::{self, ConsoleView};
use perfbench::runner::{Orchestrator, RunConfiguration, SuiteOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "perfbench started.");

    if args.list {
        print_catalog();
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;
    if !args.adapters.is_empty() {
        config.suite.adapters = args.adapters.clone();
    }
    if let Some(operation) = &args.operation {
        config.suite.operation = operation.parse()?;
    }
    if let Some(runs) = args.runs {
        config.suite.runs = runs;
    }
    if let Some(entities) = args.entities {
        config.suite.entities = entities;
    }
    if let Some(dir) = &args.results_dir {
        config.results.dir = dir.clone();
    }
    if config.suite.runs == 0 {
        bail!("runs must be at least 1");
    }

    let adapters = AdapterKind::create_all(&config.suite.adapters)?;
    let run_config = RunConfiguration {
        operation: config.suite.operation,
        runs: config.suite.runs,
        entities: config.suite.entities,
    };

    let (sender, receiver) = progress::channel(&config.progress, Handle::current());
    let orchestrator = Orchestrator::new(sender, config.results.clone(), device::describe());
    let mut suite = orchestrator.run(run_config, adapters, |report| {
        info!(
            "suite finished: {:?}, {} runs committed",
            report.outcome, report.committed_runs
        );
    })?;

    let mut view = ConsoleView::new(std::io::stdout().is_terminal());
    let mut presenting = Box::pin(receiver.present(&mut view));
    let mut presenting_done = false;
    let mut interrupt = Box::pin(tokio::signal::ctrl_c());
    let mut interrupted = false;

    let report = loop {
        tokio::select! {
            joined = &mut suite => break joined?,
            rendered = &mut presenting, if !presenting_done => {
                presenting_done = true;
                if let Err(e) = rendered {
                    error!("progress view failed: {e}");
                }
            }
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                orchestrator.destroy();
            }
        }
    };

    for (adapter, e) in &report.failures {
        error!("{adapter}: {e}");
    }
    match report.outcome {
        SuiteOutcome::Completed if report.failures.is_empty() => Ok(()),
        SuiteOutcome::Completed => bail!("{} adapter(s) failed", report.failures.len()),
        SuiteOutcome::Cancelled => {
            info!("suite cancelled");
            Ok(())
        }
        SuiteOutcome::Aborted(e) => bail!("suite aborted: {e}"),
    }
}

fn print_catalog() {
    println!("Adapters:");
    for kind in AdapterKind::ALL {
        println!("  {kind}");
    }
    println!("Operations:");
    for op in OperationType::ALL {
        println!("  {:<24} {}", op.short_name(), op.display_name());
    }
}
