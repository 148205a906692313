use std::fmt;
use std::time::Duration;

use loadrig_metrics::MetricsSnapshot;

use crate::signal::StopReason;
use crate::stats::{CheckSummary, StepFailureSummary};
use crate::thresholds_eval::ThresholdReport;

/// Something that went wrong after the virtual users started. The report is still produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunIssue {
    /// Runners still busy when the grace period ran out; their in-flight iterations were cancelled.
    RunnerTerminationTimeout {
        grace_period: Duration,
        vu_ids: Vec<u64>,
    },
    RunnerPanicked {
        detail: String,
    },
    TeardownFailed {
        step: String,
        detail: String,
    },
}

impl RunIssue {
    /// Whether the recorded metrics may be missing work.
    #[must_use]
    pub fn leaves_run_incomplete(&self) -> bool {
        matches!(
            self,
            Self::RunnerTerminationTimeout { .. } | Self::RunnerPanicked { .. }
        )
    }
}

impl fmt::Display for RunIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunnerTerminationTimeout {
                grace_period,
                vu_ids,
            } => write!(
                f,
                "{} virtual user(s) did not finish within the {}ms grace period: {:?}",
                vu_ids.len(),
                grace_period.as_millis(),
                vu_ids
            ),
            Self::RunnerPanicked { detail } => write!(f, "virtual user panicked: {detail}"),
            Self::TeardownFailed { step, detail } => {
                write!(f, "teardown failed at step `{step}`: {detail}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub workflow: String,
    pub vus: u64,
    pub duration: Duration,
    pub elapsed: Duration,
    pub stop_reason: Option<StopReason>,
    pub iterations: u64,
    pub metrics: MetricsSnapshot,
    pub checks: Vec<CheckSummary>,
    pub step_failures: Vec<StepFailureSummary>,
    pub thresholds: ThresholdReport,
    pub issues: Vec<RunIssue>,
}

impl RunReport {
    /// The verdict: every threshold held.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.thresholds.passed
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.issues.iter().any(RunIssue::leaves_run_incomplete)
    }

    #[must_use]
    pub fn checks_total(&self) -> u64 {
        self.checks.iter().map(|c| c.total).sum()
    }

    #[must_use]
    pub fn checks_failed(&self) -> u64 {
        self.checks.iter().map(|c| c.failed).sum()
    }
}
