mod assertion;
mod config;
mod context;
mod error;
mod gate;
mod progress;
mod remote;
mod report;
#[cfg(feature = "rpc")]
mod rpc;
mod run;
mod signal;
mod stats;
mod step;
mod thresholds;
mod thresholds_eval;
mod vu;
mod workflow;

pub use assertion::Assertion;
pub use config::{RunConfig, RunOverrides, WorkflowDefaults};
pub use context::{Scope, SharedFixture, ValueMap, VuContext};
pub use error::{ConfigError, Error, Result};
pub use gate::IterationGate;
pub use progress::{ProgressFn, ProgressUpdate};
pub use remote::{RemoteCall, RemoteFailure, RemoteResponse, RemoteService, STATUS_OK};
pub use report::{RunIssue, RunReport};
pub use run::{RunOptions, run, run_with};
pub use signal::{StartSignal, StopReason, StopSignal};
pub use stats::{
    CheckHandle, CheckSummary, METRIC_CHECKS, METRIC_ITERATION_DURATION, METRIC_ITERATIONS,
    RunStats, StepFailureSummary,
};
pub use step::{BoundStep, Extraction, FailurePolicy, Step, StepMetrics, StepOutcome};
pub use thresholds::{
    ThresholdExpr, ThresholdOp, ThresholdSet, ThresholdStat, parse_threshold_expr,
};
pub use thresholds_eval::{ThresholdGap, ThresholdReport, ThresholdResult, evaluate_thresholds};
pub use vu::{VuPhase, VuStatus, VuSummary};
pub use workflow::Workflow;

pub use loadrig_metrics::{
    MetricKind, MetricSnapshot, MetricValue, MetricsSnapshot, Registry, TrendSummary,
};
#[cfg(feature = "rpc")]
pub use loadrig_rpc::{Error as RpcError, RpcClient};
pub use loadrig_value::Value;
