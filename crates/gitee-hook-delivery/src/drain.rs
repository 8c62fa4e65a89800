//! In-flight tracking for detached publish tasks.
//!
//! Every accepted webhook holds an [`InFlightGuard`] until its publish task
//! finishes. At shutdown the counter is [closed](InFlightCounter::close) so no
//! new work can register, then [`InFlightCounter::await_drain`] waits for the
//! count to reach zero so the broker connection is not closed under a pending
//! publish.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

// Top bit of `state` marks the counter closed; the rest is the count.
const CLOSED: usize = 1 << (usize::BITS - 1);
const COUNT: usize = !CLOSED;

/// Count of publish tasks scheduled but not yet finished.
#[derive(Debug, Default)]
pub struct InFlightCounter {
    state: AtomicUsize,
    drained: Notify,
}

/// Owned unit of in-flight work. Dropping it, on any path including a panic
/// unwinding through the task, decrements the counter exactly once.
#[derive(Debug)]
#[must_use = "the unit is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    counter: Arc<InFlightCounter>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.release();
    }
}

impl InFlightCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one unit of work. Call before spawning the task that owns it.
    ///
    /// Returns `None` once the counter is closed.
    pub fn track(self: &Arc<Self>) -> Option<InFlightGuard> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s & CLOSED == 0).then_some(s + 1)
            })
            .ok()?;
        Some(InFlightGuard {
            counter: Arc::clone(self),
        })
    }

    /// Refuses all further [`track`](Self::track) calls. Units already
    /// handed out are unaffected.
    pub fn close(&self) {
        self.state.fetch_or(CLOSED, Ordering::AcqRel);
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) & CLOSED != 0
    }

    pub fn in_flight(&self) -> usize {
        self.state.load(Ordering::Acquire) & COUNT
    }

    /// Resolves once nothing is in flight. Returns immediately when idle.
    pub async fn await_drain(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a release between the load and the
            // await still wakes us.
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s & COUNT != 0).then(|| s - 1)
            });
        if previous.is_ok_and(|s| s & COUNT == 1) {
            self.drained.notify_waiters();
        }
    }
}
