use std::time::Duration;

use crate::error::ConfigError;
use crate::thresholds::{ThresholdSet, parse_threshold_expr};

/// Settings a workflow ships with when nothing overrides them.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDefaults {
    pub vus: u64,
    pub duration: Duration,
    pub thresholds: Vec<ThresholdSet>,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            vus: 1,
            duration: Duration::from_secs(30),
            thresholds: Vec::new(),
        }
    }
}

/// Partially specified run settings, one layer of the precedence stack (CLI, run file).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub vus: Option<u64>,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
    pub grace_period: Option<Duration>,
    pub thresholds: Vec<ThresholdSet>,
}

impl RunOverrides {
    /// Layers `self` on top of `lower`. Threshold sets replace lower sets for the same metric.
    #[must_use]
    pub fn over(self, lower: RunOverrides) -> RunOverrides {
        RunOverrides {
            vus: self.vus.or(lower.vus),
            duration: self.duration.or(lower.duration),
            iterations: self.iterations.or(lower.iterations),
            grace_period: self.grace_period.or(lower.grace_period),
            thresholds: merge_thresholds(self.thresholds, lower.thresholds),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub vus: u64,
    pub duration: Duration,
    /// Total iterations shared by all virtual users; the run stops early once spent.
    pub iterations: Option<u64>,
    /// How long to wait for in-flight iterations after the stop signal. `None` waits indefinitely.
    pub grace_period: Option<Duration>,
    pub thresholds: Vec<ThresholdSet>,
}

impl RunConfig {
    #[must_use]
    pub fn new(vus: u64, duration: Duration) -> Self {
        Self {
            vus,
            duration,
            iterations: None,
            grace_period: None,
            thresholds: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Vec<ThresholdSet>) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = Some(grace_period);
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Applies `overrides` on top of the workflow `defaults`.
    pub fn resolve(overrides: RunOverrides, defaults: &WorkflowDefaults) -> Result<Self, ConfigError> {
        let cfg = Self {
            vus: overrides.vus.unwrap_or(defaults.vus),
            duration: overrides.duration.unwrap_or(defaults.duration),
            iterations: overrides.iterations,
            grace_period: overrides.grace_period,
            thresholds: merge_thresholds(overrides.thresholds, defaults.thresholds.clone()),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vus == 0 {
            return Err(ConfigError::InvalidVus);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::InvalidDuration);
        }
        if self.iterations == Some(0) {
            return Err(ConfigError::InvalidIterations);
        }
        if self.grace_period.is_some_and(|g| g.is_zero()) {
            return Err(ConfigError::InvalidGracePeriod);
        }

        for set in &self.thresholds {
            for expression in &set.expressions {
                parse_threshold_expr(expression).map_err(|reason| {
                    ConfigError::InvalidThreshold {
                        metric: set.metric.clone(),
                        expression: expression.clone(),
                        reason,
                    }
                })?;
            }
        }

        Ok(())
    }
}

fn merge_thresholds(upper: Vec<ThresholdSet>, lower: Vec<ThresholdSet>) -> Vec<ThresholdSet> {
    let mut merged: Vec<ThresholdSet> = lower
        .into_iter()
        .filter(|l| !upper.iter().any(|u| u.metric == l.metric))
        .collect();
    merged.extend(upper);
    merged
}
