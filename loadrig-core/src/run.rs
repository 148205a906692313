use std::sync::Arc;
use std::time::Duration;

use loadrig_metrics::Registry;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RunConfig;
use crate::context::{SharedFixture, VuContext};
use crate::error::{ConfigError, Error, Result};
use crate::gate::IterationGate;
use crate::progress::{ProgressFn, ProgressUpdate};
use crate::remote::RemoteService;
use crate::report::{RunIssue, RunReport};
use crate::signal::{StartSignal, StopReason, StopSignal};
use crate::stats::RunStats;
use crate::step::{BoundStep, Step};
use crate::thresholds::parse_threshold_expr;
use crate::thresholds_eval::evaluate_thresholds;
use crate::vu::{VirtualUser, VuPhase, VuShared, VuStatus, VuSummary};
use crate::workflow::Workflow;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Default)]
pub struct RunOptions {
    pub progress: Option<ProgressFn>,
    /// External stop, e.g. wired to Ctrl-C. Raising it ends the run like an elapsed duration.
    pub stop: Option<Arc<StopSignal>>,
}

pub async fn run<S: RemoteService>(
    config: &RunConfig,
    workflow: &Workflow,
    service: Arc<S>,
) -> Result<RunReport> {
    run_with(config, workflow, service, RunOptions::default()).await
}

/// Executes one load run.
///
/// Setup runs once before any virtual user exists; if it fails no runner is spawned and
/// [`Error::Setup`] is returned. Otherwise `config.vus` runners iterate until the duration
/// elapses (or the iteration budget is spent), in-flight iterations are awaited, Teardown runs
/// once, and thresholds are evaluated against the final metric snapshot.
pub async fn run_with<S: RemoteService>(
    config: &RunConfig,
    workflow: &Workflow,
    service: Arc<S>,
    options: RunOptions,
) -> Result<RunReport> {
    config.validate()?;
    if workflow.steps().is_empty() {
        return Err(ConfigError::EmptyWorkflow(workflow.name().to_string()).into());
    }

    let registry = Arc::new(Registry::default());
    let stats = Arc::new(RunStats::new(registry.clone())?);
    let steps = workflow
        .steps()
        .iter()
        .map(|s| BoundStep::bind(s.clone(), &stats))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    check_threshold_kinds(config, &registry)?;

    tracing::info!(workflow = workflow.name(), "running setup");
    let fixture = run_setup(workflow, &*service).await?;

    let stop = options.stop.unwrap_or_default();
    let start = Arc::new(StartSignal::new());
    let shared = Arc::new(VuShared {
        service: service.clone(),
        steps: steps.into(),
        iteration_think_time: workflow.think_time(),
        fixture: fixture.clone(),
        stats: stats.clone(),
        gate: Arc::new(IterationGate::new(config.iterations, stop.clone())),
        start: start.clone(),
    });

    let mut runners = JoinSet::new();
    let mut statuses = Vec::with_capacity(usize::try_from(config.vus).unwrap_or_default());
    for vu_id in 1..=config.vus {
        let status = Arc::new(VuStatus::default());
        statuses.push((vu_id, status.clone()));
        runners.spawn(
            VirtualUser {
                id: vu_id,
                status,
                shared: shared.clone(),
            }
            .run(),
        );
    }

    tracing::info!(
        workflow = workflow.name(),
        vus = config.vus,
        duration_ms = config.duration.as_millis() as u64,
        "starting virtual users"
    );
    let started = Instant::now();
    start.start();

    let timer = {
        let stop = stop.clone();
        let duration = config.duration;
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(duration) => {
                    stop.stop(StopReason::DurationElapsed);
                }
                () = stop.wait() => {}
            }
        })
    };

    let progress_handle = options
        .progress
        .map(|progress| spawn_progress(progress, stats.clone(), config, started));

    let mut summaries = Vec::new();
    let mut issues = Vec::new();

    tokio::select! {
        () = drain(&mut runners, &mut summaries, &mut issues) => {}
        () = stop.wait() => {}
    }
    tracing::debug!(reason = ?stop.reason(), "stop signal raised");

    let drained = match config.grace_period {
        None => {
            drain(&mut runners, &mut summaries, &mut issues).await;
            true
        }
        Some(grace) => {
            tokio::time::timeout(grace, drain(&mut runners, &mut summaries, &mut issues))
                .await
                .is_ok()
        }
    };

    if !drained {
        let vu_ids: Vec<u64> = statuses
            .iter()
            .filter(|(_, s)| s.phase() != VuPhase::Stopped)
            .map(|(id, _)| *id)
            .collect();
        let grace_period = config.grace_period.unwrap_or_default();
        tracing::warn!(
            ?vu_ids,
            grace_ms = grace_period.as_millis() as u64,
            "virtual users did not stop within the grace period"
        );
        issues.push(RunIssue::RunnerTerminationTimeout {
            grace_period,
            vu_ids,
        });

        runners.abort_all();
        while runners.join_next().await.is_some() {}
    }

    tracing::debug!(finished = summaries.len(), "virtual users finished");

    timer.abort();
    if let Some(handle) = progress_handle {
        handle.abort();
    }
    let elapsed = started.elapsed();

    tracing::info!(workflow = workflow.name(), "running teardown");
    if let Err(issue) = run_teardown(workflow, &*service, fixture).await {
        tracing::warn!(%issue, "teardown failed");
        issues.push(issue);
    }

    let metrics = registry.snapshot();
    let thresholds = evaluate_thresholds(&metrics, &config.thresholds);

    Ok(RunReport {
        workflow: workflow.name().to_string(),
        vus: config.vus,
        duration: config.duration,
        elapsed,
        stop_reason: stop.reason(),
        iterations: stats.iterations_total(),
        metrics,
        checks: stats.checks_summary(),
        step_failures: stats.step_failures_summary(),
        thresholds,
        issues,
    })
}

async fn drain(
    runners: &mut JoinSet<VuSummary>,
    summaries: &mut Vec<VuSummary>,
    issues: &mut Vec<RunIssue>,
) {
    while let Some(joined) = runners.join_next().await {
        match joined {
            Ok(summary) => summaries.push(summary),
            Err(err) if err.is_panic() => {
                tracing::error!(error = %err, "virtual user panicked");
                issues.push(RunIssue::RunnerPanicked {
                    detail: err.to_string(),
                });
            }
            Err(_) => {}
        }
    }
}

/// Thresholds naming a registered metric must use a statistic of that metric's kind.
fn check_threshold_kinds(
    config: &RunConfig,
    registry: &Registry,
) -> std::result::Result<(), ConfigError> {
    for set in &config.thresholds {
        let Some(actual) = registry.kind_of(&set.metric) else {
            continue;
        };
        for expression in &set.expressions {
            let expr = parse_threshold_expr(expression).map_err(|reason| {
                ConfigError::InvalidThreshold {
                    metric: set.metric.clone(),
                    expression: expression.clone(),
                    reason,
                }
            })?;
            let required = expr.stat.required_kind();
            if required != actual {
                return Err(ConfigError::IncompatibleThreshold {
                    metric: set.metric.clone(),
                    expression: expression.clone(),
                    required,
                    actual,
                });
            }
        }
    }
    Ok(())
}

async fn run_setup<S: RemoteService>(workflow: &Workflow, service: &S) -> Result<SharedFixture> {
    let mut ctx = VuContext::new(0, SharedFixture::default());

    for step in workflow.setup_steps() {
        run_fixture_step(step, service, &mut ctx)
            .await
            .map_err(|detail| Error::Setup {
                step: step.name().to_string(),
                detail,
            })?;
    }

    Ok(ctx.into_fixture())
}

async fn run_teardown<S: RemoteService>(
    workflow: &Workflow,
    service: &S,
    fixture: SharedFixture,
) -> std::result::Result<(), RunIssue> {
    let mut ctx = VuContext::new(0, fixture);

    for step in workflow.teardown_steps() {
        run_fixture_step(step, service, &mut ctx)
            .await
            .map_err(|detail| RunIssue::TeardownFailed {
                step: step.name().to_string(),
                detail,
            })?;
    }

    Ok(())
}

async fn run_fixture_step<S: RemoteService>(
    step: &Step,
    service: &S,
    ctx: &mut VuContext,
) -> std::result::Result<(), String> {
    let outcome = BoundStep::unmetered(step.clone()).execute(service, ctx).await;
    if !outcome.success {
        return Err(outcome.failure_detail.unwrap_or_default());
    }
    if !step.pause().is_zero() {
        tokio::time::sleep(step.pause()).await;
    }
    Ok(())
}

fn spawn_progress(
    progress: ProgressFn,
    stats: Arc<RunStats>,
    config: &RunConfig,
    started: Instant,
) -> tokio::task::JoinHandle<()> {
    let vus = config.vus;
    let duration = config.duration;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        let mut tick: u64 = 0;
        let mut last_at = started;
        let mut last_iterations = stats.iterations_total();

        loop {
            interval.tick().await;

            tick = tick.saturating_add(1);
            let now = Instant::now();
            let dt = now.duration_since(last_at);
            last_at = now;

            let iterations_total = stats.iterations_total();
            let delta = iterations_total.saturating_sub(last_iterations);
            last_iterations = iterations_total;

            progress(ProgressUpdate {
                tick,
                elapsed: started.elapsed(),
                duration,
                interval: dt,
                vus,
                active_vus: stats.active_vus(),
                iterations_total,
                iterations_per_sec_now: (delta as f64) / dt.as_secs_f64().max(1e-9),
                checks_failed_total: stats.checks_failed(),
                step_failures_total: stats.step_failures_total(),
            });
        }
    })
}
