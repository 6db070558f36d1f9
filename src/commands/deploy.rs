// ABOUTME: Deploy command implementation.
// ABOUTME: Runs the orchestrator against the configured platform and renders progress.

use super::{load_template, supplied_values};
use crate::cli::TemplateInput;
use oneclick::config::Config;
use oneclick::deploy::{
    AggregateStatus, DeploymentState, Orchestrator, ServiceProgress, ServiceStatus, Subscriber,
    prepare,
};
use oneclick::diagnostics::Diagnostics;
use oneclick::error::{Error, Result};
use oneclick::output::Output;
use parking_lot::Mutex;
use std::env;
use std::sync::Arc;

/// Deploy a template to the platform named in the config.
pub async fn deploy(input: TemplateInput, mut output: Output) -> Result<()> {
    output.start_timer();
    let cwd = env::current_dir()?;
    let config = Config::discover(&cwd)?;
    let (template, source) = load_template(&input, Some(&config)).await?;
    let values = supplied_values(&input)?;
    tracing::debug!("Loaded template {}", source);

    output.progress(&format!("Connecting to {}...", config.endpoint));
    tracing::debug!("Password from {}", config.password.source());
    let client = Arc::new(config.client()?);
    let root_domain = config.root_domain(&client).await?;

    // Fail on bad input before anything is created on the platform.
    let plan = prepare(&template, &values, &root_domain)?;
    let mut diag = Diagnostics::default();
    diag.record_plan(&plan);

    if !template.instructions.start.is_empty() {
        output.progress(&template.instructions.start);
    }
    output.progress(&format!(
        "Deploying {} service(s) to {}",
        plan.services.len(),
        root_domain
    ));

    let renderer = ProgressRenderer::new(output.clone());
    let orchestrator = Orchestrator::new(client, root_domain, renderer);
    let end = template.instructions.end.clone();
    let state = orchestrator
        .start_deploy_process(template, values)?
        .wait()
        .await;

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    match state.status() {
        AggregateStatus::Success => {
            if !end.is_empty() {
                output.progress(&end);
            }
            output.success(&format!(
                "Deployed {} service(s)",
                state.count(ServiceStatus::Deployed)
            ));
            Ok(())
        }
        _ => Err(Error::DeploymentFailed(
            state.error().unwrap_or("unknown error").to_string(),
        )),
    }
}

/// Prints one line per service transition, or every snapshot in JSON mode.
struct ProgressRenderer {
    output: Output,
    seen: Mutex<Vec<ServiceProgress>>,
}

impl ProgressRenderer {
    fn new(output: Output) -> Self {
        Self {
            output,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Subscriber for ProgressRenderer {
    fn on_state(&self, state: DeploymentState) {
        self.output.state(&state);

        let mut seen = self.seen.lock();
        for (index, service) in state.services().iter().enumerate() {
            let previous = seen.get(index).map(|s| s.status);
            if previous == Some(service.status) {
                continue;
            }
            match service.status {
                ServiceStatus::Pending => {}
                ServiceStatus::Deploying => {
                    self.output
                        .progress(&format!("  → Deploying {}...", service.name));
                }
                ServiceStatus::Deployed => {
                    self.output.progress(&format!("  ✓ {} deployed", service.name));
                }
                ServiceStatus::Failed => {
                    self.output.progress(&format!("  ✗ {} failed", service.name));
                }
            }
        }
        *seen = state.services().to_vec();
    }
}
