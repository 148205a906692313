mod error;
mod key;
mod metrics;
mod registry;
mod snapshot;

pub use error::{Error, Result};
pub use metrics::{MetricHandle, MetricKind};
pub use registry::Registry;
pub use snapshot::{MetricSnapshot, MetricValue, MetricsSnapshot, TrendSummary};
