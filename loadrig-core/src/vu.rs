use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::context::{SharedFixture, VuContext};
use crate::gate::IterationGate;
use crate::remote::RemoteService;
use crate::signal::StartSignal;
use crate::stats::RunStats;
use crate::step::{BoundStep, FailurePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum VuPhase {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

/// Lifecycle phase of one virtual user, readable from outside its task.
#[derive(Debug, Default)]
pub struct VuStatus(AtomicU8);

impl VuStatus {
    #[must_use]
    pub fn phase(&self) -> VuPhase {
        match self.0.load(Ordering::Acquire) {
            0 => VuPhase::Idle,
            1 => VuPhase::Running,
            _ => VuPhase::Stopped,
        }
    }

    fn set(&self, phase: VuPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}

/// Everything the virtual users of one run share.
pub(crate) struct VuShared<S> {
    pub(crate) service: Arc<S>,
    pub(crate) steps: Arc<[BoundStep]>,
    pub(crate) iteration_think_time: Duration,
    pub(crate) fixture: SharedFixture,
    pub(crate) stats: Arc<RunStats>,
    pub(crate) gate: Arc<IterationGate>,
    pub(crate) start: Arc<StartSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VuSummary {
    pub vu_id: u64,
    pub iterations: u64,
}

pub(crate) struct VirtualUser<S> {
    pub(crate) id: u64,
    pub(crate) status: Arc<VuStatus>,
    pub(crate) shared: Arc<VuShared<S>>,
}

impl<S: RemoteService> VirtualUser<S> {
    pub(crate) async fn run(self) -> VuSummary {
        let shared = &*self.shared;
        shared.start.wait().await;

        self.status.set(VuPhase::Running);
        shared.stats.vu_started();
        tracing::trace!(vu = self.id, "virtual user running");

        let mut ctx = VuContext::new(self.id, shared.fixture.clone());
        let mut iterations = 0u64;

        // The stop signal is only consulted here, so an iteration in flight always completes.
        while shared.gate.next() {
            ctx.begin_iteration(iterations);
            let started = Instant::now();

            self.run_iteration(&mut ctx).await;
            if !shared.iteration_think_time.is_zero() {
                tokio::time::sleep(shared.iteration_think_time).await;
            }

            shared.stats.record_iteration(started.elapsed());
            iterations += 1;
        }

        self.status.set(VuPhase::Stopped);
        shared.stats.vu_stopped();
        tracing::trace!(vu = self.id, iterations, "virtual user stopped");

        VuSummary {
            vu_id: self.id,
            iterations,
        }
    }

    async fn run_iteration(&self, ctx: &mut VuContext) {
        let shared = &*self.shared;

        for bound in shared.steps.iter() {
            let outcome = bound.execute(&*shared.service, ctx).await;
            let step = bound.step();

            if !outcome.success && step.failure_policy() == FailurePolicy::AbortIteration {
                return;
            }
            if !step.pause().is_zero() {
                tokio::time::sleep(step.pause()).await;
            }
        }
    }
}
