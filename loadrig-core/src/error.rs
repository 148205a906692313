use loadrig_metrics::MetricKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors: the run either never starts or stops before any virtual user is spawned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("setup failed at step `{step}`: {detail}")]
    Setup { step: String, detail: String },
}

impl Error {
    #[must_use]
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup { .. })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("`vus` must be a positive integer")]
    InvalidVus,

    #[error("`duration` must be a positive duration")]
    InvalidDuration,

    #[error("`iterations` must be a positive integer")]
    InvalidIterations,

    #[error("`grace_period` must be a positive duration")]
    InvalidGracePeriod,

    #[error("workflow `{0}` has no steps")]
    EmptyWorkflow(String),

    #[error("invalid threshold `{expression}` for metric `{metric}`: {reason}")]
    InvalidThreshold {
        metric: String,
        expression: String,
        reason: String,
    },

    #[error(
        "threshold `{expression}` needs a {required} metric but `{metric}` is a {actual}"
    )]
    IncompatibleThreshold {
        metric: String,
        expression: String,
        required: MetricKind,
        actual: MetricKind,
    },

    #[error(transparent)]
    Metric(#[from] loadrig_metrics::Error),
}
