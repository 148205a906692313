use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetricKind {
    /// Monotonic running sum.
    Counter,
    /// Fraction of boolean observations that were true.
    Rate,
    /// Distribution of numeric samples.
    Trend,
}

#[derive(Debug, Default)]
pub struct CounterCell {
    // f64 bit pattern; 0 is +0.0.
    sum_bits: AtomicU64,
    count: AtomicU64,
}

impl CounterCell {
    fn add(&self, value: f64) {
        // The closure always returns `Some`, so the update cannot fail.
        let _ = self
            .sum_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }

    pub(crate) fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct RateCell {
    hits: AtomicU64,
    total: AtomicU64,
}

impl RateCell {
    fn add(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct TrendCell {
    samples: Mutex<Vec<f64>>,
}

impl TrendCell {
    fn observe(&self, value: f64) {
        // Non-finite samples would break ordering of the summary statistics.
        if !value.is_finite() {
            return;
        }
        self.samples.lock().push(value);
    }

    pub(crate) fn samples(&self) -> Vec<f64> {
        self.samples.lock().clone()
    }
}

#[derive(Debug)]
pub(crate) enum MetricStorage {
    Counter(Arc<CounterCell>),
    Rate(Arc<RateCell>),
    Trend(Arc<TrendCell>),
}

impl MetricStorage {
    pub(crate) fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(Arc::default()),
            MetricKind::Rate => Self::Rate(Arc::default()),
            MetricKind::Trend => Self::Trend(Arc::default()),
        }
    }

    pub(crate) fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Rate(_) => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
        }
    }

    pub(crate) fn handle(&self) -> MetricHandle {
        match self {
            Self::Counter(c) => MetricHandle::Counter(c.clone()),
            Self::Rate(r) => MetricHandle::Rate(r.clone()),
            Self::Trend(t) => MetricHandle::Trend(t.clone()),
        }
    }
}

/// Pre-resolved writer for one metric slot.
///
/// Handles are cheap to clone and never look the metric up by name again, so hot paths should
/// resolve them once and keep them around.
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Arc<CounterCell>),
    Rate(Arc<RateCell>),
    Trend(Arc<TrendCell>),
}

impl MetricHandle {
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Rate(_) => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
        }
    }

    /// Records one observation. For rates any non-zero value counts as true.
    #[inline]
    pub fn record(&self, value: f64) {
        match self {
            Self::Counter(c) => c.add(value),
            Self::Rate(r) => r.add(value != 0.0),
            Self::Trend(t) => t.observe(value),
        }
    }

    /// Counter increment. Debug builds assert the handle is a counter; release builds drop the
    /// value for any other kind.
    #[inline]
    pub fn add(&self, value: f64) {
        debug_assert_eq!(self.kind(), MetricKind::Counter, "add on a non-counter handle");
        if let Self::Counter(c) = self {
            c.add(value);
        }
    }

    #[inline]
    pub fn add_bool(&self, hit: bool) {
        debug_assert_eq!(self.kind(), MetricKind::Rate, "add_bool on a non-rate handle");
        if let Self::Rate(r) = self {
            r.add(hit);
        }
    }

    #[inline]
    pub fn observe(&self, value: f64) {
        debug_assert_eq!(self.kind(), MetricKind::Trend, "observe on a non-trend handle");
        if let Self::Trend(t) = self {
            t.observe(value);
        }
    }

    /// Current counter sum; zero for other kinds.
    #[must_use]
    pub fn counter_sum(&self) -> f64 {
        match self {
            Self::Counter(c) => c.sum(),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_kind_parses_case_insensitively() {
        assert_eq!("trend".parse::<MetricKind>(), Ok(MetricKind::Trend));
        assert_eq!("Rate".parse::<MetricKind>(), Ok(MetricKind::Rate));
        assert_eq!(MetricKind::Counter.to_string(), "counter");
        assert!("gauge".parse::<MetricKind>().is_err());
    }

    #[test]
    fn record_dispatches_by_kind() {
        let counter = MetricStorage::new(MetricKind::Counter).handle();
        counter.record(2.0);
        counter.record(3.5);
        assert_eq!(counter.counter_sum(), 5.5);

        let rate = MetricStorage::new(MetricKind::Rate);
        let handle = rate.handle();
        handle.record(1.0);
        handle.record(0.0);
        match rate {
            MetricStorage::Rate(r) => {
                assert_eq!(r.hits(), 1);
                assert_eq!(r.total(), 2);
            }
            _ => panic!("expected rate storage"),
        }
    }

    #[test]
    fn trend_skips_non_finite_samples() {
        let trend = MetricStorage::new(MetricKind::Trend);
        let handle = trend.handle();
        handle.observe(f64::NAN);
        handle.observe(12.0);
        match trend {
            MetricStorage::Trend(t) => assert_eq!(t.samples(), vec![12.0]),
            _ => panic!("expected trend storage"),
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "add on a non-counter handle")]
    fn mismatched_helper_panics_in_debug() {
        MetricStorage::new(MetricKind::Trend).handle().add(1.0);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn mismatched_helpers_are_ignored_in_release() {
        let trend = MetricStorage::new(MetricKind::Trend);
        let handle = trend.handle();
        handle.add(1.0);
        handle.add_bool(true);
        match trend {
            MetricStorage::Trend(t) => assert!(t.samples().is_empty()),
            _ => panic!("expected trend storage"),
        }
    }
}
