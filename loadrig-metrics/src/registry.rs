use dashmap::DashMap;

use crate::key::{Interner, NameId};
use crate::metrics::{MetricHandle, MetricKind, MetricStorage};
use crate::snapshot::{MetricSnapshot, MetricValue, MetricsSnapshot, TrendSummary};
use crate::{Error, Result};

/// Shared metric sink.
///
/// Each metric name owns one slot whose kind is fixed by the first writer. Counters and rates
/// accumulate through atomics; trends append under a per-slot lock.
#[derive(Debug, Default)]
pub struct Registry {
    interner: Interner,
    slots: DashMap<NameId, MetricStorage>,
}

impl Registry {
    /// Resolves (creating on first use) the slot for `name` and returns a writer for it.
    pub fn handle(&self, name: &str, kind: MetricKind) -> Result<MetricHandle> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let id = self.interner.get_or_intern(name);
        let slot = self
            .slots
            .entry(id)
            .or_insert_with(|| MetricStorage::new(kind));

        let existing = slot.kind();
        if existing != kind {
            return Err(Error::KindMismatch {
                name: name.to_string(),
                existing,
                requested: kind,
            });
        }

        Ok(slot.handle())
    }

    /// Appends one observation to `name`, creating the metric with `kind` on first use.
    pub fn record(&self, name: &str, kind: MetricKind, value: f64) -> Result<()> {
        self.handle(name, kind)?.record(value);
        Ok(())
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        let id = self.interner.lookup(name)?;
        self.slots.get(&id).map(|slot| slot.kind())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Copies every metric into a read-only snapshot.
    ///
    /// Writers may still be active, in which case each metric is individually consistent but
    /// metrics are not captured at the same instant. The scheduler only calls this after all
    /// virtual users have stopped.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let metrics = self
            .slots
            .iter()
            .filter_map(|entry| {
                let name = self.interner.resolve(*entry.key())?;
                let storage = entry.value();
                let value = match storage {
                    MetricStorage::Counter(c) => MetricValue::Counter {
                        sum: c.sum(),
                        count: c.count(),
                    },
                    MetricStorage::Rate(r) => {
                        // Read total first so hits never exceeds it in the copy.
                        let total = r.total();
                        let hits = r.hits().min(total);
                        MetricValue::Rate {
                            hits,
                            total,
                            rate: (total > 0).then(|| hits as f64 / total as f64),
                        }
                    }
                    MetricStorage::Trend(t) => {
                        MetricValue::Trend(TrendSummary::from_samples(t.samples()))
                    }
                };

                Some(MetricSnapshot {
                    name,
                    kind: storage.kind(),
                    value,
                })
            })
            .collect();

        MetricsSnapshot::new(metrics)
    }
}
