// ABOUTME: In-memory AppManager that records calls instead of talking to a platform.
// ABOUTME: Can be told to fail specific services and tracks concurrent calls.

use async_trait::async_trait;
use oneclick::api::{ApiError, AppManager};
use oneclick::deploy::{DeploymentState, Subscriber};
use oneclick::template::ResolvedServiceSpec;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct RecordingManager {
    calls: Mutex<Vec<ResolvedServiceSpec>>,
    failing: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl RecordingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call open for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Make calls for the app `name` fail from now on.
    pub fn fail(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    pub fn heal(&self, name: &str) {
        self.failing.lock().remove(name);
    }

    pub fn calls(&self) -> Vec<ResolvedServiceSpec> {
        self.calls.lock().clone()
    }

    pub fn called_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|s| s.name.to_string())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppManager for RecordingManager {
    async fn deploy_service(&self, spec: &ResolvedServiceSpec) -> Result<(), ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().push(spec.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().contains(spec.name.as_str()) {
            return Err(ApiError::Rejected {
                path: "/api/v2/user/apps/appDefinitions/register".to_string(),
                status: 1000,
                description: format!("cannot create {}", spec.name),
            });
        }
        Ok(())
    }
}

/// Subscriber that keeps every snapshot it receives.
pub fn snapshots() -> (impl Subscriber, Arc<Mutex<Vec<DeploymentState>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscriber = move |state: DeploymentState| sink.lock().push(state);
    (subscriber, seen)
}
