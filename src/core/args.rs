use std::path::PathBuf;

use clap::Parser;
use log::kv::{ToValue, Value};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about = "Storage backend benchmark harness")]
pub struct CliArgs {
    #[arg(short, long)]
    pub config: Option<String>,
    /// Adapter to benchmark, may be repeated. Defaults to the configured list.
    #[arg(short, long = "adapter")]
    pub adapters: Vec<String>,
    /// Operation short name, e.g. `crud` or `query_id_random`.
    #[arg(short, long)]
    pub operation: Option<String>,
    #[arg(short, long)]
    pub runs: Option<u32>,
    #[arg(short, long)]
    pub entities: Option<usize>,
    #[arg(long)]
    pub results_dir: Option<PathBuf>,
    /// Print the known adapters and operations, then exit.
    #[arg(long)]
    pub list: bool,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = CliArgs::parse_from(["self", "--config", "foo"]);
        assert_eq!(
            args,
            CliArgs {
                config: Some("foo".to_string()),
                adapters: vec![],
                operation: None,
                runs: None,
                entities: None,
                results_dir: None,
                list: false,
            }
        );
    }

    #[test]
    fn test_repeated_adapters() {
        let args = CliArgs::parse_from([
            "self", "-a", "memory", "-a", "sqlite", "-o", "crud", "-r", "3", "-e", "1000",
        ]);
        assert_eq!(args.adapters, vec!["memory", "sqlite"]);
        assert_eq!(args.operation.as_deref(), Some("crud"));
        assert_eq!(args.runs, Some(3));
        assert_eq!(args.entities, Some(1000));
    }
}
