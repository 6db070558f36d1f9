// ABOUTME: Deploys resolved services one at a time in declaration order.
// ABOUTME: Stops at the first failure; services after it stay pending.

use super::error::DeployError;
use super::state::DeploymentState;
use crate::api::AppManager;
use crate::template::ResolvedServiceSpec;

/// Drives an [`AppManager`] through a list of services.
pub struct Sequencer<'a, A: AppManager + ?Sized> {
    manager: &'a A,
}

impl<'a, A: AppManager + ?Sized> Sequencer<'a, A> {
    pub fn new(manager: &'a A) -> Self {
        Self { manager }
    }

    /// Deploy `specs` in order, reporting every state change to `on_change`.
    ///
    /// Never more than one service is in flight. On failure the failing service
    /// is marked failed, the run is failed, and the error is returned.
    pub async fn deploy<F>(
        &self,
        specs: &[ResolvedServiceSpec],
        state: &mut DeploymentState,
        mut on_change: F,
    ) -> Result<(), DeployError>
    where
        F: FnMut(&DeploymentState),
    {
        state.plan(specs.iter().map(|s| s.name.to_string()))?;
        on_change(state);

        for (index, spec) in specs.iter().enumerate() {
            state.start_service(index)?;
            on_change(state);
            tracing::info!("Deploying service {} ({})", spec.name, spec.image);

            match self.manager.deploy_service(spec).await {
                Ok(()) => {
                    state.finish_service(index)?;
                    on_change(state);
                    tracing::info!("Service {} deployed", spec.name);
                }
                Err(source) => {
                    let error = DeployError::ServiceDeploymentFailed {
                        service: spec.name.to_string(),
                        source,
                    };
                    state.fail_service(index, error.to_string())?;
                    on_change(state);
                    tracing::error!("{}", error);
                    return Err(error);
                }
            }
        }

        if !state.is_terminal() {
            state.succeed()?;
            on_change(state);
        }
        Ok(())
    }
}
