use std::sync::Arc;

use crate::MetricKind;

/// Sorted copy of a trend's samples, queried after the run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSummary {
    sorted: Arc<[f64]>,
    sum: f64,
}

impl TrendSummary {
    pub(crate) fn from_samples(mut samples: Vec<f64>) -> Self {
        samples.sort_by(f64::total_cmp);
        let sum = samples.iter().sum();
        Self {
            sorted: Arc::from(samples),
            sum,
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.sorted.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.sorted
    }

    #[must_use]
    pub fn avg(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.sum / self.sorted.len() as f64)
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.sorted.first().copied()
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.sorted.last().copied()
    }

    #[must_use]
    pub fn med(&self) -> Option<f64> {
        self.percentile(50.0)
    }

    /// Percentile `p` in `[0, 100]` with linear interpolation between closest ranks.
    ///
    /// Out-of-range `p` is clamped. Returns `None` when there are no samples.
    #[must_use]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let n = self.sorted.len();
        if n == 0 || p.is_nan() {
            return None;
        }

        let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let lo_v = self.sorted[lo];
        let hi_v = self.sorted[hi.min(n - 1)];

        Some(lo_v + (hi_v - lo_v) * (rank - lo as f64))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter {
        sum: f64,
        count: u64,
    },
    Rate {
        hits: u64,
        total: u64,
        /// `None` when nothing was observed.
        rate: Option<f64>,
    },
    Trend(TrendSummary),
}

impl MetricValue {
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter { .. } => MetricKind::Counter,
            Self::Rate { .. } => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub name: Arc<str>,
    pub kind: MetricKind,
    pub value: MetricValue,
}

/// Read-only view of every metric, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    metrics: Vec<MetricSnapshot>,
}

impl MetricsSnapshot {
    pub(crate) fn new(mut metrics: Vec<MetricSnapshot>) -> Self {
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        Self { metrics }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricSnapshot> {
        self.metrics
            .binary_search_by(|m| m.name.as_ref().cmp(name))
            .ok()
            .map(|idx| &self.metrics[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSnapshot> {
        self.metrics.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Counter sum, or `0.0` when the metric is missing or not a counter.
    #[must_use]
    pub fn counter_sum(&self, name: &str) -> f64 {
        match self.get(name).map(|m| &m.value) {
            Some(MetricValue::Counter { sum, .. }) => *sum,
            _ => 0.0,
        }
    }
}
