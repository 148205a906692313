use anyhow::Context as _;
use std::path::Path;
use std::sync::Arc;

use loadrig_core::{
    RpcClient, RunConfig, RunOptions, RunOverrides, RunReport, StopReason, StopSignal,
};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output::{self, RunHeader};
use crate::run_error::RunError;
use crate::{logging, run_file};

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    logging::init(args.log_level.as_deref()).map_err(RunError::InvalidInput)?;

    let workflow = args.workflow.build();
    let config = resolve_config(&args, workflow.workflow_defaults())
        .await
        .map_err(RunError::InvalidInput)?;

    let client = RpcClient::new(&args.target)
        .with_context(|| format!("invalid --target `{}`", args.target))
        .map_err(RunError::InvalidInput)?
        .with_timeout(args.request_timeout);

    let out = output::formatter(args.output, workflow.name());
    out.print_header(&RunHeader {
        workflow: &workflow,
        config: &config,
        target: &args.target,
    });

    let stop = Arc::new(StopSignal::new());
    let interrupt = spawn_interrupt_watcher(stop.clone());

    let result = loadrig_core::run_with(
        &config,
        &workflow,
        Arc::new(client),
        RunOptions {
            progress: out.progress(),
            stop: Some(stop),
        },
    )
    .await;
    interrupt.abort();
    let report = result?;

    out.print_summary(&report).map_err(RunError::RuntimeError)?;

    if let Some(path) = &args.summary_out {
        write_summary(path, &report)
            .await
            .map_err(RunError::RuntimeError)?;
    }

    Ok(ExitCode::from_report(&report))
}

/// CLI flags over the run file over the workflow defaults.
async fn resolve_config(
    args: &RunArgs,
    defaults: &loadrig_core::WorkflowDefaults,
) -> anyhow::Result<RunConfig> {
    let file = match &args.config {
        Some(path) => run_file::load_run_overrides(path).await?,
        None => RunOverrides::default(),
    };

    let cli = RunOverrides {
        vus: args.vus,
        duration: args.duration,
        iterations: args.iterations,
        grace_period: args.grace_period,
        thresholds: Vec::new(),
    };

    RunConfig::resolve(cli.over(file), defaults).context("invalid run options")
}

fn spawn_interrupt_watcher(stop: Arc<StopSignal>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && stop.stop(StopReason::Interrupted) {
            tracing::warn!("interrupted, letting in-flight iterations finish");
        }
    })
}

async fn write_summary(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    let doc = output::summary_document(report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("failed to create summary output dir: {}", parent.display())
        })?;
    }
    tokio::fs::write(path, doc)
        .await
        .with_context(|| format!("failed to write summary: {}", path.display()))
}
