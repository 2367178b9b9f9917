//! Environment description emitted once at the start of every suite.

use std::thread::available_parallelism;

pub fn describe() -> String {
    let cpus = available_parallelism().map(|n| n.get()).unwrap_or(1);
    format!(
        "Host: {} {} ({} family), {} CPUs, perfbench {}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        std::env::consts::FAMILY,
        cpus,
        env!("CARGO_PKG_VERSION")
    )
}
