use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use loadrig_metrics::{MetricHandle, MetricKind, Registry};
use loadrig_value::Value;
use tokio::time::Instant;

use crate::assertion::Assertion;
use crate::context::{Scope, VuContext};
use crate::error::ConfigError;
use crate::remote::{RemoteCall, RemoteService};
use crate::stats::{CheckHandle, RunStats};

type RequestFn = dyn Fn(&VuContext) -> Result<Value, String> + Send + Sync;

/// What a failed step means for the rest of its iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Later steps still run.
    #[default]
    Continue,
    /// Remaining steps of the iteration are skipped.
    AbortIteration,
}

/// Copies a response field into the context after a successful step.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub path: Arc<str>,
    pub key: Arc<str>,
    pub scope: Scope,
}

/// Metric names a step feeds. Unset names are not recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepMetrics {
    /// Trend of call latency in milliseconds.
    pub latency: Option<Arc<str>>,
    /// Rate of successful step executions.
    pub success: Option<Arc<str>>,
    /// Counter incremented once per remote call.
    pub requests: Option<Arc<str>>,
    /// Counter incremented once per failed step.
    pub errors: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub success: bool,
    /// Latency of the remote call. `None` when the call was never issued.
    pub duration_ms: Option<f64>,
    pub failure_detail: Option<String>,
}

impl StepOutcome {
    fn failed(duration_ms: Option<f64>, detail: String) -> Self {
        Self {
            success: false,
            duration_ms,
            failure_detail: Some(detail),
        }
    }
}

/// One remote operation plus the bookkeeping around it.
#[derive(Clone)]
pub struct Step {
    name: Arc<str>,
    operation: Arc<str>,
    request: Arc<RequestFn>,
    credentials: Option<Arc<str>>,
    assertions: Vec<Assertion>,
    extractions: Vec<Extraction>,
    metrics: StepMetrics,
    on_failure: FailurePolicy,
    think_time: Duration,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("operation", &self.operation)
            .field("credentials", &self.credentials)
            .field("assertions", &self.assertions)
            .field("extractions", &self.extractions)
            .field("metrics", &self.metrics)
            .field("on_failure", &self.on_failure)
            .field("think_time", &self.think_time)
            .finish_non_exhaustive()
    }
}

impl Step {
    /// `request` builds the payload from the context; an `Err` fails the step without a call.
    pub fn new<F>(name: impl Into<Arc<str>>, operation: impl Into<Arc<str>>, request: F) -> Self
    where
        F: Fn(&VuContext) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            operation: operation.into(),
            request: Arc::new(request),
            credentials: None,
            assertions: Vec::new(),
            extractions: Vec::new(),
            metrics: StepMetrics::default(),
            on_failure: FailurePolicy::default(),
            think_time: Duration::ZERO,
        }
    }

    /// Sends the context value `key` as bearer credentials.
    #[must_use]
    pub fn credentials(mut self, key: impl Into<Arc<str>>) -> Self {
        self.credentials = Some(key.into());
        self
    }

    /// Adds a named check on the response.
    ///
    /// Once a step declares any assertion, its assertions alone decide success: a non-OK status
    /// fails the step only if an assertion such as [`Assertion::status_ok`] looks at it. A step
    /// without assertions fails on any non-OK status.
    #[must_use]
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    #[must_use]
    pub fn extract(
        mut self,
        path: impl Into<Arc<str>>,
        key: impl Into<Arc<str>>,
        scope: Scope,
    ) -> Self {
        self.extractions.push(Extraction {
            path: path.into(),
            key: key.into(),
            scope,
        });
        self
    }

    #[must_use]
    pub fn latency_trend(mut self, name: impl Into<Arc<str>>) -> Self {
        self.metrics.latency = Some(name.into());
        self
    }

    #[must_use]
    pub fn success_rate(mut self, name: impl Into<Arc<str>>) -> Self {
        self.metrics.success = Some(name.into());
        self
    }

    #[must_use]
    pub fn request_counter(mut self, name: impl Into<Arc<str>>) -> Self {
        self.metrics.requests = Some(name.into());
        self
    }

    #[must_use]
    pub fn error_counter(mut self, name: impl Into<Arc<str>>) -> Self {
        self.metrics.errors = Some(name.into());
        self
    }

    #[must_use]
    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Pause after the step completes successfully or under [`FailurePolicy::Continue`].
    #[must_use]
    pub fn think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure
    }

    #[must_use]
    pub fn pause(&self) -> Duration {
        self.think_time
    }

    #[must_use]
    pub fn metrics(&self) -> &StepMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }
}

#[derive(Debug)]
struct StepRecorder {
    stats: Arc<RunStats>,
    latency: Option<MetricHandle>,
    success: Option<MetricHandle>,
    requests: Option<MetricHandle>,
    errors: Option<MetricHandle>,
    checks: Vec<CheckHandle>,
}

/// A [`Step`] with its metric handles resolved.
///
/// Binding happens once per run, before Setup, so a name declared with two different kinds is
/// reported as a configuration error rather than surfacing mid-run.
#[derive(Debug)]
pub struct BoundStep {
    step: Step,
    recorder: Option<StepRecorder>,
}

impl BoundStep {
    pub fn bind(step: Step, stats: &Arc<RunStats>) -> Result<Self, ConfigError> {
        let registry = stats.metrics();
        let recorder = StepRecorder {
            latency: resolve_handle(registry, step.metrics.latency.as_deref(), MetricKind::Trend)?,
            success: resolve_handle(registry, step.metrics.success.as_deref(), MetricKind::Rate)?,
            requests: resolve_handle(registry, step.metrics.requests.as_deref(), MetricKind::Counter)?,
            errors: resolve_handle(registry, step.metrics.errors.as_deref(), MetricKind::Counter)?,
            checks: step
                .assertions
                .iter()
                .map(|a| stats.check_handle(a.name()))
                .collect(),
            stats: stats.clone(),
        };

        Ok(Self {
            step,
            recorder: Some(recorder),
        })
    }

    /// Setup and Teardown steps run without feeding any metric.
    #[must_use]
    pub fn unmetered(step: Step) -> Self {
        Self {
            step,
            recorder: None,
        }
    }

    #[must_use]
    pub fn step(&self) -> &Step {
        &self.step
    }

    /// Builds the request, calls the service and evaluates the response.
    ///
    /// The latency sample brackets the remote call only. Extractions are applied only when the
    /// step succeeds.
    pub async fn execute<S: RemoteService>(&self, service: &S, ctx: &mut VuContext) -> StepOutcome {
        let outcome = self.invoke(service, ctx).await;

        if let Some(rec) = &self.recorder {
            if let Some(h) = &rec.success {
                h.add_bool(outcome.success);
            }
            if !outcome.success {
                if let Some(h) = &rec.errors {
                    h.add(1.0);
                }
                rec.stats.record_step_failure(
                    &self.step.name,
                    outcome.failure_detail.as_deref().unwrap_or_default(),
                );
            }
        }

        if let Some(detail) = &outcome.failure_detail {
            tracing::debug!(
                vu = ctx.vu_id(),
                iteration = ctx.iteration(),
                step = %self.step.name,
                detail = %detail,
                "step failed"
            );
        }

        outcome
    }

    async fn invoke<S: RemoteService>(&self, service: &S, ctx: &mut VuContext) -> StepOutcome {
        let step = &self.step;

        let payload = match (step.request)(ctx) {
            Ok(payload) => payload,
            Err(detail) => {
                return StepOutcome::failed(None, format!("request build failed: {detail}"));
            }
        };

        let credentials = match &step.credentials {
            None => None,
            Some(key) => match ctx.get(key).and_then(Value::as_str) {
                Some(token) => Some(Arc::from(token)),
                None => {
                    return StepOutcome::failed(None, format!("credentials `{key}` are not set"));
                }
            },
        };

        let call = RemoteCall {
            operation: step.operation.clone(),
            payload,
            credentials,
        };

        let started = Instant::now();
        let result = service.invoke(call).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        if let Some(rec) = &self.recorder {
            if let Some(h) = &rec.latency {
                h.observe(duration_ms);
            }
            if let Some(h) = &rec.requests {
                h.add(1.0);
            }
        }

        let response = match result {
            Ok(response) => response,
            Err(failure) => {
                return StepOutcome::failed(Some(duration_ms), format!("call failed: {failure}"));
            }
        };

        let mut failed: Vec<&str> = Vec::new();
        for (idx, assertion) in step.assertions.iter().enumerate() {
            let ok = assertion.evaluate(&response, ctx);
            if let Some(rec) = &self.recorder
                && let Some(handle) = rec.checks.get(idx)
            {
                rec.stats.record_check(handle, ok);
            }
            if !ok {
                failed.push(assertion.name());
            }
        }
        if !failed.is_empty() {
            return StepOutcome::failed(
                Some(duration_ms),
                format!("assertions failed: {}", failed.join(", ")),
            );
        }
        if step.assertions.is_empty() && !response.is_ok() {
            return StepOutcome::failed(
                Some(duration_ms),
                format!("remote status {}", response.status),
            );
        }

        // All fields must resolve before any of them lands in the context.
        let mut extracted: Vec<(Scope, Arc<str>, Value)> =
            Vec::with_capacity(step.extractions.len());
        for extraction in &step.extractions {
            match response.body.get_path(&extraction.path) {
                Some(v) if !v.is_null() => {
                    extracted.push((extraction.scope, extraction.key.clone(), v.clone()));
                }
                _ => {
                    return StepOutcome::failed(
                        Some(duration_ms),
                        format!("response field `{}` is missing", extraction.path),
                    );
                }
            }
        }
        for (scope, key, value) in extracted {
            ctx.set(scope, key, value);
        }

        StepOutcome {
            success: true,
            duration_ms: Some(duration_ms),
            failure_detail: None,
        }
    }
}

fn resolve_handle(
    registry: &Registry,
    name: Option<&str>,
    kind: MetricKind,
) -> Result<Option<MetricHandle>, ConfigError> {
    Ok(name.map(|n| registry.handle(n, kind)).transpose()?)
}
