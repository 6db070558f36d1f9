// ABOUTME: Deployment state machine tracking aggregate and per-service status.
// ABOUTME: Snapshots of this state are the only way callers observe a deployment.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::DeployError;

/// Overall outcome of one deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    NotStarted,
    InProgress,
    Success,
    Failed,
}

impl AggregateStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AggregateStatus::Success | AggregateStatus::Failed)
    }
}

/// Status of a single service within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Pending,
    Deploying,
    Deployed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceProgress {
    pub name: String,
    pub status: ServiceStatus,
}

/// Progress of one deployment run.
///
/// `NotStarted -> InProgress -> {Success, Failed}`. Only the run that owns the
/// state mutates it; everyone else sees clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentState {
    status: AggregateStatus,
    services: Vec<ServiceProgress>,
    current: Option<String>,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Default for DeploymentState {
    fn default() -> Self {
        Self::new()
    }
}

impl DeploymentState {
    pub fn new() -> Self {
        Self {
            status: AggregateStatus::NotStarted,
            services: Vec::new(),
            current: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Terminal state for a run that died before reporting its own outcome.
    pub(crate) fn aborted(message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            status: AggregateStatus::Failed,
            services: Vec::new(),
            current: None,
            error: Some(message.into()),
            started_at: Some(now),
            finished_at: Some(now),
        }
    }

    pub fn status(&self) -> AggregateStatus {
        self.status
    }

    /// Per-service records in deployment order.
    pub fn services(&self) -> &[ServiceProgress] {
        &self.services
    }

    /// Service currently being deployed, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn service_status(&self, name: &str) -> Option<ServiceStatus> {
        self.services
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status)
    }

    /// Number of services currently in `status`.
    pub fn count(&self, status: ServiceStatus) -> usize {
        self.services.iter().filter(|s| s.status == status).count()
    }

    // Transitions below are driven by the orchestrator and sequencer only.

    pub(crate) fn begin(&mut self) -> Result<(), DeployError> {
        self.expect_status(AggregateStatus::NotStarted, "begin")?;
        self.status = AggregateStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Record the services of this run, all pending.
    pub(crate) fn plan<I>(&mut self, names: I) -> Result<(), DeployError>
    where
        I: IntoIterator<Item = String>,
    {
        self.expect_status(AggregateStatus::InProgress, "plan services")?;
        if !self.services.is_empty() {
            return Err(invalid("services are already planned"));
        }
        self.services = names
            .into_iter()
            .map(|name| ServiceProgress {
                name,
                status: ServiceStatus::Pending,
            })
            .collect();
        Ok(())
    }

    pub(crate) fn start_service(&mut self, index: usize) -> Result<(), DeployError> {
        self.expect_status(AggregateStatus::InProgress, "start a service")?;
        if let Some(current) = &self.current {
            return Err(invalid(format!("{} is still deploying", current)));
        }
        let service = self.service_mut(index, ServiceStatus::Pending)?;
        service.status = ServiceStatus::Deploying;
        let name = service.name.clone();
        self.current = Some(name);
        Ok(())
    }

    /// Mark the deploying service as deployed; the run succeeds with the last one.
    pub(crate) fn finish_service(&mut self, index: usize) -> Result<(), DeployError> {
        self.expect_status(AggregateStatus::InProgress, "finish a service")?;
        let service = self.service_mut(index, ServiceStatus::Deploying)?;
        service.status = ServiceStatus::Deployed;
        self.current = None;

        if self.services.iter().all(|s| s.status == ServiceStatus::Deployed) {
            self.status = AggregateStatus::Success;
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Mark the deploying service as failed, which fails the whole run.
    pub(crate) fn fail_service(
        &mut self,
        index: usize,
        message: impl Into<String>,
    ) -> Result<(), DeployError> {
        self.expect_status(AggregateStatus::InProgress, "fail a service")?;
        let service = self.service_mut(index, ServiceStatus::Deploying)?;
        service.status = ServiceStatus::Failed;
        self.current = None;
        self.status = AggregateStatus::Failed;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Succeed a run whose services are all deployed (or that had none).
    pub(crate) fn succeed(&mut self) -> Result<(), DeployError> {
        self.expect_status(AggregateStatus::InProgress, "succeed")?;
        if self.services.iter().any(|s| s.status != ServiceStatus::Deployed) {
            return Err(invalid("not every service is deployed"));
        }
        self.status = AggregateStatus::Success;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Fail the run without touching service records.
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> Result<(), DeployError> {
        if self.is_terminal() {
            return Err(invalid(format!("cannot fail a run that is {:?}", self.status)));
        }
        self.status = AggregateStatus::Failed;
        self.current = None;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn expect_status(&self, expected: AggregateStatus, action: &str) -> Result<(), DeployError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(invalid(format!(
                "cannot {} while {:?} (expected {:?})",
                action, self.status, expected
            )))
        }
    }

    fn service_mut(
        &mut self,
        index: usize,
        expected: ServiceStatus,
    ) -> Result<&mut ServiceProgress, DeployError> {
        let service = self
            .services
            .get_mut(index)
            .ok_or_else(|| invalid(format!("no service at position {}", index)))?;
        if service.status != expected {
            return Err(invalid(format!(
                "service {} is {:?}, expected {:?}",
                service.name, service.status, expected
            )));
        }
        Ok(service)
    }
}

fn invalid(message: impl Into<String>) -> DeployError {
    DeployError::InvalidTransition(message.into())
}
