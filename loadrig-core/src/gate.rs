use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::signal::{StopReason, StopSignal};

/// Decides, between iterations, whether a virtual user may start another one.
#[derive(Debug)]
pub struct IterationGate {
    counter: AtomicU64,
    iterations: Option<u64>,
    stop: Arc<StopSignal>,
}

impl IterationGate {
    pub fn new(iterations: Option<u64>, stop: Arc<StopSignal>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            iterations,
            stop,
        }
    }

    pub fn next(&self) -> bool {
        if self.stop.is_stopped() {
            return false;
        }

        if let Some(total) = self.iterations {
            let idx = self.counter.fetch_add(1, Ordering::Relaxed);
            if idx >= total {
                self.stop.stop(StopReason::IterationsExhausted);
                return false;
            }
        }

        true
    }
}
