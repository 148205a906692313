use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use loadrig_metrics::{MetricHandle, MetricKind, Registry};

use crate::error::ConfigError;

pub const METRIC_ITERATIONS: &str = "iterations";
pub const METRIC_ITERATION_DURATION: &str = "iteration_duration";
pub const METRIC_CHECKS: &str = "checks";

#[derive(Debug, Default)]
struct CheckCounters {
    total: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct CheckHandle {
    counters: Arc<CheckCounters>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub total: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailureSummary {
    pub step: String,
    pub count: u64,
    pub last_detail: String,
}

#[derive(Debug, Default)]
struct StepFailures {
    count: u64,
    last_detail: String,
}

/// Run-wide accounting shared by every virtual user.
///
/// Owns the metric sink plus the handles for the built-in metrics, per-assertion tallies and
/// the totals read by the progress ticker.
#[derive(Debug)]
pub struct RunStats {
    metrics: Arc<Registry>,
    metric_iterations: MetricHandle,
    metric_iteration_duration: MetricHandle,
    metric_checks: MetricHandle,

    iterations_total: AtomicU64,
    checks_total: AtomicU64,
    checks_failed: AtomicU64,
    step_failures_total: AtomicU64,
    active_vus: AtomicU64,

    checks_by_name: Mutex<HashMap<Arc<str>, Arc<CheckCounters>>>,
    step_failures: Mutex<HashMap<Arc<str>, StepFailures>>,
}

impl RunStats {
    pub fn new(metrics: Arc<Registry>) -> Result<Self, ConfigError> {
        Ok(Self {
            metric_iterations: metrics.handle(METRIC_ITERATIONS, MetricKind::Counter)?,
            metric_iteration_duration: metrics
                .handle(METRIC_ITERATION_DURATION, MetricKind::Trend)?,
            metric_checks: metrics.handle(METRIC_CHECKS, MetricKind::Rate)?,
            metrics,
            iterations_total: AtomicU64::new(0),
            checks_total: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            step_failures_total: AtomicU64::new(0),
            active_vus: AtomicU64::new(0),
            checks_by_name: Mutex::new(HashMap::new()),
            step_failures: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<Registry> {
        &self.metrics
    }

    pub fn record_iteration(&self, elapsed: Duration) {
        self.iterations_total.fetch_add(1, Ordering::Relaxed);
        self.metric_iterations.add(1.0);
        self.metric_iteration_duration
            .observe(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn check_handle(&self, name: &str) -> CheckHandle {
        let counters = {
            let mut map = self
                .checks_by_name
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(v) = map.get(name) {
                v.clone()
            } else {
                let v = Arc::new(CheckCounters::default());
                map.insert(Arc::from(name), v.clone());
                v
            }
        };

        CheckHandle { counters }
    }

    pub fn record_check(&self, handle: &CheckHandle, ok: bool) {
        self.checks_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.checks_failed.fetch_add(1, Ordering::Relaxed);
        }

        self.metric_checks.add_bool(ok);

        handle.counters.total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            handle.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_step_failure(&self, step: &str, detail: &str) {
        self.step_failures_total.fetch_add(1, Ordering::Relaxed);

        let mut map = self
            .step_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = match map.get_mut(step) {
            Some(entry) => entry,
            None => map.entry(Arc::from(step)).or_default(),
        };
        entry.count += 1;
        detail.clone_into(&mut entry.last_detail);
    }

    pub(crate) fn vu_started(&self) {
        self.active_vus.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn vu_stopped(&self) {
        self.active_vus.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn iterations_total(&self) -> u64 {
        self.iterations_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn checks_total(&self) -> u64 {
        self.checks_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn checks_failed(&self) -> u64 {
        self.checks_failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn step_failures_total(&self) -> u64 {
        self.step_failures_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn active_vus(&self) -> u64 {
        self.active_vus.load(Ordering::Relaxed)
    }

    /// Per-assertion tallies sorted by name.
    #[must_use]
    pub fn checks_summary(&self) -> Vec<CheckSummary> {
        let map = self
            .checks_by_name
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut out: Vec<CheckSummary> = map
            .iter()
            .map(|(name, c)| CheckSummary {
                name: name.to_string(),
                total: c.total.load(Ordering::Relaxed),
                failed: c.failed.load(Ordering::Relaxed),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Failed steps, most frequent first.
    #[must_use]
    pub fn step_failures_summary(&self) -> Vec<StepFailureSummary> {
        let map = self
            .step_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut out: Vec<StepFailureSummary> = map
            .iter()
            .map(|(step, f)| StepFailureSummary {
                step: step.to_string(),
                count: f.count,
                last_detail: f.last_detail.clone(),
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.step.cmp(&b.step)));
        out
    }
}
