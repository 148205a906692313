use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Releases every virtual user at once.
#[derive(Debug, Default)]
pub struct StartSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        wait_for(&self.notify, || self.started.load(Ordering::Acquire)).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    DurationElapsed,
    IterationsExhausted,
    Interrupted,
}

/// Raised once per run. Virtual users observe it only between iterations.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    reason: OnceLock<StopReason>,
    notify: Notify,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the call that actually stopped the run; the first reason wins.
    pub fn stop(&self, reason: StopReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_waiters();
        first
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    pub async fn wait(&self) {
        wait_for(&self.notify, || self.is_stopped()).await;
    }
}

async fn wait_for(notify: &Notify, ready: impl Fn() -> bool) {
    loop {
        let notified = notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent notify_waiters is not missed.
        notified.as_mut().enable();
        if ready() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_stop_reason_wins() {
        let stop = StopSignal::new();
        assert!(!stop.is_stopped());
        assert!(stop.stop(StopReason::IterationsExhausted));
        assert!(!stop.stop(StopReason::DurationElapsed));
        assert_eq!(stop.reason(), Some(StopReason::IterationsExhausted));
        stop.wait().await;
    }

    #[tokio::test]
    async fn waiters_are_released() {
        let start = Arc::new(StartSignal::new());
        let waiter = {
            let start = start.clone();
            tokio::spawn(async move { start.wait().await })
        };
        tokio::task::yield_now().await;
        start.start();
        waiter.await.unwrap_or_else(|e| panic!("{e}"));
    }
}
