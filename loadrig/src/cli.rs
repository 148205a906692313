use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::WorkflowKind;

/// Bare integers are seconds; anything else goes through humantime (`250ms`, `1m30s`).
fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (e.g. 10s, 250ms, 1m)".to_string());
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(s).map_err(|e| format!("invalid duration `{s}`: {e}"))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bar on stderr and a human-readable summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) and a final summary line to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "loadrig",
    author,
    version,
    about = "Load generator for the auth and messaging RPC services",
    long_about = "loadrig drives a fixed number of virtual users through a built-in workflow against an RPC target for a fixed duration, then checks the collected metrics against pass/fail thresholds.\n\nEach workflow ships default options (virtual users, duration, thresholds). A YAML run file and CLI flags override them, in that order.",
    after_help = "Examples:\n  loadrig list\n  loadrig run --workflow auth --target http://127.0.0.1:8080\n  loadrig run --workflow messaging --vus 10 --duration 30s --output json\n  loadrig run --workflow combined --config run.yaml --summary-out results.json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test workflow
    #[command(
        long_about = "Run a built-in workflow with the configured number of virtual users.\n\nCLI flags override values from the run file, which override the workflow defaults."
    )]
    Run(RunArgs),

    /// List the built-in workflows and their defaults
    List,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Workflow to run
    #[arg(long, value_enum)]
    pub workflow: WorkflowKind,

    /// Base URL of the RPC target
    #[arg(long, env = "LOADRIG_TARGET", default_value = "http://127.0.0.1:8080")]
    pub target: String,

    /// Number of virtual users
    #[arg(long)]
    pub vus: Option<u64>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Stop once this many iterations were started across all virtual users
    #[arg(long)]
    pub iterations: Option<u64>,

    /// How long to wait for in-flight iterations after the duration elapses
    #[arg(long, value_parser = parse_duration)]
    pub grace_period: Option<Duration>,

    /// Per-call timeout (e.g. 5s); unset means no timeout
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// YAML run file (vus, duration, iterations, gracePeriod, thresholds)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Also write the JSON summary to this file
    #[arg(long, value_name = "PATH")]
    pub summary_out: Option<PathBuf>,

    /// Log filter (e.g. info, loadrig_core=debug); defaults to RUST_LOG
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration(" 45 "), Ok(Duration::from_secs(45)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn cli_parses_run_overrides() {
        let parsed = Cli::try_parse_from([
            "loadrig",
            "run",
            "--workflow",
            "messaging",
            "--target",
            "http://127.0.0.1:9000",
            "--vus",
            "2",
            "--duration",
            "5s",
            "--grace-period",
            "250ms",
            "--config",
            "run.yaml",
            "--output",
            "json",
            "--summary-out",
            "out/summary.json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.workflow, WorkflowKind::Messaging);
                assert_eq!(args.target, "http://127.0.0.1:9000");
                assert_eq!(args.vus, Some(2));
                assert_eq!(args.duration, Some(Duration::from_secs(5)));
                assert_eq!(args.iterations, None);
                assert_eq!(args.grace_period, Some(Duration::from_millis(250)));
                assert_eq!(args.config, Some(PathBuf::from("run.yaml")));
                assert!(matches!(args.output, OutputFormat::Json));
                assert_eq!(args.summary_out, Some(PathBuf::from("out/summary.json")));
            }
            Command::List => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_workflow() {
        let parsed = Cli::try_parse_from(["loadrig", "run", "--workflow", "checkout"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_parses_list() {
        let parsed = Cli::try_parse_from(["loadrig", "list"]);
        assert!(matches!(parsed.map(|c| c.command), Ok(Command::List)));
    }
}
