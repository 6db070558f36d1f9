// ABOUTME: Orchestrator owning one deployment run at a time.
// ABOUTME: Validates, resolves, and sequences a template in a background task.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

use super::error::DeployError;
use super::sequencer::Sequencer;
use super::state::DeploymentState;
use super::subscriber::Subscriber;
use crate::api::AppManager;
use crate::template::{ROOT_DOMAIN_VAR, ResolvedServiceSpec, SuppliedValues, Template};

/// A template checked and resolved against concrete values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Services in deployment order.
    pub services: Vec<ResolvedServiceSpec>,
    /// Supplied keys that match no declaration.
    pub ignored: Vec<String>,
    /// Author-declared variables no service refers to.
    pub unused: Vec<String>,
}

/// Check the schema, validate values, and resolve every service.
///
/// Pure: no platform calls are made. The platform root domain always wins
/// over a supplied `$$cap_root_domain`.
pub fn prepare(
    template: &Template,
    supplied: &SuppliedValues,
    root_domain: &str,
) -> Result<Plan, DeployError> {
    template.check_schema()?;

    let mut supplied = supplied.clone();
    supplied.insert(ROOT_DOMAIN_VAR.to_string(), root_domain.to_string());

    let validated = crate::template::validate(&template.declarations(), &supplied)?;
    let resolution = crate::template::resolve(template, &validated.values)?;

    for id in &resolution.unused {
        tracing::debug!("Variable {} is declared but never used", id);
    }

    Ok(Plan {
        services: resolution.services,
        ignored: validated.ignored,
        unused: resolution.unused,
    })
}

/// Handle to a run started by [`Orchestrator::start_deploy_process`].
#[derive(Debug)]
pub struct DeployHandle {
    task: JoinHandle<DeploymentState>,
}

impl DeployHandle {
    /// Wait for the run to finish and return its terminal state.
    pub async fn wait(self) -> DeploymentState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("Deployment task ended abnormally: {}", e);
                DeploymentState::aborted(format!("deployment task ended abnormally: {}", e))
            }
        }
    }
}

/// Clears the running flag when the run ends, however it ends.
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    fn acquire(running: &Arc<AtomicBool>) -> Result<Self, DeployError> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DeployError::AlreadyRunning)?;
        Ok(Self {
            running: Arc::clone(running),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Deploys one-click templates through an [`AppManager`].
///
/// At most one run is active per orchestrator. Progress is reported to the
/// subscriber as owned snapshots.
pub struct Orchestrator<A: AppManager + ?Sized + 'static> {
    manager: Arc<A>,
    root_domain: String,
    subscriber: Arc<dyn Subscriber>,
    running: Arc<AtomicBool>,
    last_request: Mutex<Option<(Template, SuppliedValues)>>,
}

impl<A: AppManager + ?Sized + 'static> Orchestrator<A> {
    pub fn new(
        manager: Arc<A>,
        root_domain: impl Into<String>,
        subscriber: impl Subscriber,
    ) -> Self {
        Self {
            manager,
            root_domain: root_domain.into(),
            subscriber: Arc::new(subscriber),
            running: Arc::new(AtomicBool::new(false)),
            last_request: Mutex::new(None),
        }
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start deploying `template` with `values` in a background task.
    ///
    /// Returns immediately. Fails with [`DeployError::AlreadyRunning`] if a run
    /// is active; every other failure is reported through the final state.
    /// Must be called within a tokio runtime.
    pub fn start_deploy_process(
        &self,
        template: Template,
        values: SuppliedValues,
    ) -> Result<DeployHandle, DeployError> {
        let guard = RunGuard::acquire(&self.running)?;
        *self.last_request.lock() = Some((template.clone(), values.clone()));
        Ok(self.spawn(guard, template, values, false))
    }

    /// Run the last template again from scratch with the same values.
    pub fn restart(&self) -> Result<DeployHandle, DeployError> {
        let guard = RunGuard::acquire(&self.running)?;
        let (template, values) = self
            .last_request
            .lock()
            .clone()
            .ok_or(DeployError::NothingToRestart)?;
        tracing::info!("Restarting deployment");
        Ok(self.spawn(guard, template, values, true))
    }

    fn spawn(
        &self,
        guard: RunGuard,
        template: Template,
        values: SuppliedValues,
        restarted: bool,
    ) -> DeployHandle {
        let manager = Arc::clone(&self.manager);
        let subscriber = Arc::clone(&self.subscriber);
        let root_domain = self.root_domain.clone();

        let task = tokio::spawn(async move {
            run(
                manager.as_ref(),
                subscriber.as_ref(),
                guard,
                &template,
                &values,
                &root_domain,
                restarted,
            )
            .await
        });

        DeployHandle { task }
    }
}

async fn run<A: AppManager + ?Sized>(
    manager: &A,
    subscriber: &dyn Subscriber,
    guard: RunGuard,
    template: &Template,
    values: &SuppliedValues,
    root_domain: &str,
    restarted: bool,
) -> DeploymentState {
    let guard = Mutex::new(Some(guard));
    let publish = |state: &DeploymentState| {
        // Released before the terminal snapshot goes out so a subscriber can restart.
        if state.is_terminal() {
            guard.lock().take();
        }
        subscriber.on_state(state.clone());
    };
    let mut state = DeploymentState::new();
    if restarted {
        publish(&state);
    }

    if let Err(e) = drive(manager, template, values, root_domain, &mut state, &publish).await {
        if !state.is_terminal() {
            tracing::error!("Deployment failed: {}", e);
            if state.fail(e.to_string()).is_ok() {
                publish(&state);
            }
        }
    } else {
        tracing::info!("Deployment finished with {} services", state.services().len());
    }

    state
}

async fn drive<A, F>(
    manager: &A,
    template: &Template,
    values: &SuppliedValues,
    root_domain: &str,
    state: &mut DeploymentState,
    publish: &F,
) -> Result<(), DeployError>
where
    A: AppManager + ?Sized,
    F: Fn(&DeploymentState),
{
    state.begin()?;
    publish(state);

    let plan = prepare(template, values, root_domain)?;
    Sequencer::new(manager).deploy(&plan.services, state, publish).await
}
