// ABOUTME: List command implementation.
// ABOUTME: Shows the one-click apps a template repository publishes.

use super::{discover_config, repository};
use oneclick::error::Result;
use oneclick::output::Output;

pub async fn list(repository_url: Option<String>, output: Output) -> Result<()> {
    let config = discover_config()?;
    let repo = repository(repository_url.as_deref(), config.as_ref())?;

    output.progress(&format!("One-click apps in {}:", repo.url()));
    let apps = repo.list().await?;
    output.apps(&apps);

    output.success(&format!("{} app(s) available", apps.len()));
    Ok(())
}
