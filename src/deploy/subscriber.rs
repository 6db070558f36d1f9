// ABOUTME: Observers of deployment progress and the liveness guard around them.
// ABOUTME: Subscribers receive owned snapshots and stop receiving them once torn down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::state::DeploymentState;

/// Receives a snapshot after every state change of a run.
///
/// Called from the deployment task, so implementations must not block for long.
pub trait Subscriber: Send + Sync + 'static {
    fn on_state(&self, state: DeploymentState);
}

impl<F> Subscriber for F
where
    F: Fn(DeploymentState) + Send + Sync + 'static,
{
    fn on_state(&self, state: DeploymentState) {
        self(state)
    }
}

/// Drops every snapshot; for callers that only await the final state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Subscriber for Discard {
    fn on_state(&self, _state: DeploymentState) {}
}

/// Shared flag telling a running deployment whether its observer still exists.
///
/// Tearing the observer down stops deliveries but never the deployment itself.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn teardown(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Subscriber that forwards only while its liveness flag is set.
#[derive(Debug)]
pub struct Guarded<S> {
    inner: S,
    liveness: Liveness,
}

impl<S: Subscriber> Subscriber for Guarded<S> {
    fn on_state(&self, state: DeploymentState) {
        if self.liveness.is_alive() {
            self.inner.on_state(state);
        } else {
            tracing::trace!("Observer torn down, dropping {:?} snapshot", state.status());
        }
    }
}

pub trait SubscriberExt: Subscriber + Sized {
    /// Wrap this subscriber so it goes quiet after `liveness` is torn down.
    fn guarded(self, liveness: &Liveness) -> Guarded<Self> {
        Guarded {
            inner: self,
            liveness: liveness.clone(),
        }
    }
}

impl<S: Subscriber> SubscriberExt for S {}
