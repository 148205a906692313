use loadrig_metrics::{MetricValue, MetricsSnapshot};

use crate::thresholds::{ThresholdExpr, ThresholdSet, ThresholdStat, parse_threshold_expr};

/// Why a threshold could not be computed. Any gap fails the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ThresholdGap {
    MissingMetric,
    NoSamples,
    KindMismatch,
    InvalidExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
    pub gap: Option<ThresholdGap>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdReport {
    pub results: Vec<ThresholdResult>,
    /// Conjunction of every result; true when no thresholds were declared.
    pub passed: bool,
}

impl ThresholdReport {
    pub fn failed(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Evaluates every expression against `snapshot`.
///
/// Pure: the same snapshot always yields the same report. Problems with individual thresholds
/// (unknown metric, no samples, wrong metric kind, bad syntax) fail that threshold instead of
/// aborting the evaluation.
#[must_use]
pub fn evaluate_thresholds(snapshot: &MetricsSnapshot, sets: &[ThresholdSet]) -> ThresholdReport {
    let mut results = Vec::new();

    for set in sets {
        let metric = snapshot.get(&set.metric);

        for raw in &set.expressions {
            let (observed, passed, gap) = match parse_threshold_expr(raw) {
                Err(_) => (None, false, Some(ThresholdGap::InvalidExpression)),
                Ok(expr) => match metric.map(|m| observe(&m.value, &expr)) {
                    None => (None, false, Some(ThresholdGap::MissingMetric)),
                    Some(Err(gap)) => (None, false, Some(gap)),
                    Some(Ok(v)) => (Some(v), expr.op.compare(v, expr.value), None),
                },
            };

            results.push(ThresholdResult {
                metric: set.metric.clone(),
                expression: raw.clone(),
                observed,
                passed,
                gap,
            });
        }
    }

    let passed = results.iter().all(|r| r.passed);
    ThresholdReport { results, passed }
}

fn observe(value: &MetricValue, expr: &ThresholdExpr) -> Result<f64, ThresholdGap> {
    if value.kind() != expr.stat.required_kind() {
        return Err(ThresholdGap::KindMismatch);
    }

    let observed = match (value, expr.stat) {
        // A counter is defined from creation, so its sum is meaningful even before any add.
        (MetricValue::Counter { sum, .. }, ThresholdStat::Count) => Some(*sum),
        (MetricValue::Rate { rate, .. }, ThresholdStat::Rate) => *rate,
        (MetricValue::Trend(t), ThresholdStat::Avg) => t.avg(),
        (MetricValue::Trend(t), ThresholdStat::Min) => t.min(),
        (MetricValue::Trend(t), ThresholdStat::Max) => t.max(),
        (MetricValue::Trend(t), ThresholdStat::Med) => t.med(),
        (MetricValue::Trend(t), ThresholdStat::P(p)) => t.percentile(p),
        _ => return Err(ThresholdGap::KindMismatch),
    };

    observed.ok_or(ThresholdGap::NoSamples)
}
