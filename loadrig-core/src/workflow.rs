use std::sync::Arc;
use std::time::Duration;

use crate::config::WorkflowDefaults;
use crate::step::Step;

/// A named scenario: optional Setup, the per-iteration steps and optional Teardown.
#[derive(Debug, Clone)]
pub struct Workflow {
    name: Arc<str>,
    description: Arc<str>,
    setup: Vec<Step>,
    steps: Vec<Step>,
    teardown: Vec<Step>,
    iteration_think_time: Duration,
    defaults: WorkflowDefaults,
}

impl Workflow {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            description: Arc::from(""),
            setup: Vec::new(),
            steps: Vec::new(),
            teardown: Vec::new(),
            iteration_think_time: Duration::ZERO,
            defaults: WorkflowDefaults::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<Arc<str>>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn setup_step(mut self, step: Step) -> Self {
        self.setup.push(step);
        self
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn teardown_step(mut self, step: Step) -> Self {
        self.teardown.push(step);
        self
    }

    /// Pause at the end of every iteration, including aborted ones.
    #[must_use]
    pub fn iteration_think_time(mut self, think_time: Duration) -> Self {
        self.iteration_think_time = think_time;
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: WorkflowDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn setup_steps(&self) -> &[Step] {
        &self.setup
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn teardown_steps(&self) -> &[Step] {
        &self.teardown
    }

    #[must_use]
    pub fn think_time(&self) -> Duration {
        self.iteration_think_time
    }

    #[must_use]
    pub fn workflow_defaults(&self) -> &WorkflowDefaults {
        &self.defaults
    }
}
