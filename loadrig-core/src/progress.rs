use std::sync::Arc;
use std::time::Duration;

/// Live totals, emitted roughly once per second while virtual users run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub tick: u64,
    pub elapsed: Duration,
    /// Configured run duration.
    pub duration: Duration,
    /// Time since the previous update.
    pub interval: Duration,
    pub vus: u64,
    pub active_vus: u64,
    pub iterations_total: u64,
    /// Iterations/sec observed during the last interval.
    pub iterations_per_sec_now: f64,
    pub checks_failed_total: u64,
    pub step_failures_total: u64,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
