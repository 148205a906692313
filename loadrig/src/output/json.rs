use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;

use loadrig_core::{MetricValue, RunReport};

use super::{OutputFormatter, RunHeader};

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _header: &RunHeader<'_>) {}

    fn progress(&self) -> Option<loadrig_core::ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, report: &RunReport) -> anyhow::Result<()> {
        let line = build_summary_line(report);
        emit_json_line(&line);
        Ok(())
    }
}

/// Pretty-printed summary for `--summary-out`.
pub(crate) fn summary_document(report: &RunReport) -> anyhow::Result<String> {
    let mut doc = serde_json::to_string_pretty(&build_summary_line(report))?;
    doc.push('\n');
    Ok(doc)
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub interval_secs: f64,
    pub vus: u64,
    pub active_vus: u64,
    pub iterations_total: u64,
    pub iterations_per_sec: f64,
    pub checks_failed_total: u64,
    pub step_failures_total: u64,
}

fn build_progress_line(u: &loadrig_core::ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        interval_secs: u.interval.as_secs_f64(),
        vus: u.vus,
        active_vus: u.active_vus,
        iterations_total: u.iterations_total,
        iterations_per_sec: u.iterations_per_sec_now,
        checks_failed_total: u.checks_failed_total,
        step_failures_total: u.step_failures_total,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub workflow: String,
    pub vus: u64,
    pub duration_secs: f64,
    pub elapsed_secs: f64,
    pub stop_reason: Option<String>,
    pub iterations_total: u64,

    /// Every threshold held.
    pub passed: bool,
    /// No runner was cut off or panicked.
    pub complete: bool,

    pub metrics: BTreeMap<String, JsonMetric>,
    pub checks: Vec<JsonCheck>,
    pub step_failures: Vec<JsonStepFailure>,
    pub thresholds: Vec<JsonThreshold>,
    pub issues: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum JsonMetric {
    Counter {
        /// Sum of all increments.
        count: f64,
        /// Per second over the elapsed run time.
        rate: f64,
    },
    Rate {
        rate: Option<f64>,
        passes: u64,
        fails: u64,
    },
    Trend {
        count: u64,
        avg: Option<f64>,
        min: Option<f64>,
        med: Option<f64>,
        max: Option<f64>,
        #[serde(rename = "p(90)")]
        p90: Option<f64>,
        #[serde(rename = "p(95)")]
        p95: Option<f64>,
        #[serde(rename = "p(99)")]
        p99: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonCheck {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonStepFailure {
    pub step: String,
    pub count: u64,
    pub last_detail: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonThreshold {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
    pub gap: Option<String>,
}

fn build_summary_line(report: &RunReport) -> JsonSummaryLine {
    let secs = report.elapsed.as_secs_f64().max(1e-9);

    let metrics = report
        .metrics
        .iter()
        .map(|m| {
            let value = match &m.value {
                MetricValue::Counter { sum, .. } => JsonMetric::Counter {
                    count: *sum,
                    rate: *sum / secs,
                },
                MetricValue::Rate { hits, total, rate } => JsonMetric::Rate {
                    rate: *rate,
                    passes: *hits,
                    fails: total.saturating_sub(*hits),
                },
                MetricValue::Trend(t) => JsonMetric::Trend {
                    count: t.count(),
                    avg: t.avg(),
                    min: t.min(),
                    med: t.med(),
                    max: t.max(),
                    p90: t.percentile(90.0),
                    p95: t.percentile(95.0),
                    p99: t.percentile(99.0),
                },
            };
            (m.name.to_string(), value)
        })
        .collect();

    let checks = report
        .checks
        .iter()
        .map(|c| JsonCheck {
            name: c.name.clone(),
            passes: c.total.saturating_sub(c.failed),
            fails: c.failed,
        })
        .collect();

    let step_failures = report
        .step_failures
        .iter()
        .map(|f| JsonStepFailure {
            step: f.step.clone(),
            count: f.count,
            last_detail: f.last_detail.clone(),
        })
        .collect();

    let thresholds = report
        .thresholds
        .results
        .iter()
        .map(|r| JsonThreshold {
            metric: r.metric.clone(),
            expression: r.expression.clone(),
            observed: r.observed,
            passed: r.passed,
            gap: r.gap.map(|g| g.to_string()),
        })
        .collect();

    JsonSummaryLine {
        kind: "summary",
        workflow: report.workflow.clone(),
        vus: report.vus,
        duration_secs: report.duration.as_secs_f64(),
        elapsed_secs: report.elapsed.as_secs_f64(),
        stop_reason: report.stop_reason.map(|r| r.to_string()),
        iterations_total: report.iterations,
        passed: report.passed(),
        complete: report.is_complete(),
        metrics,
        checks,
        step_failures,
        thresholds,
        issues: report.issues.iter().map(ToString::to_string).collect(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
