// ABOUTME: Check command implementation.
// ABOUTME: Validates and resolves a template without calling the platform.

use super::{discover_config, load_template, supplied_values};
use crate::cli::TemplateInput;
use oneclick::deploy::prepare;
use oneclick::diagnostics::Diagnostics;
use oneclick::error::Result;
use oneclick::output::Output;

/// Stand-in root domain when neither the flag nor a config provides one.
const PLACEHOLDER_ROOT_DOMAIN: &str = "example.com";

pub async fn check(
    input: TemplateInput,
    root_domain: Option<String>,
    output: Output,
) -> Result<()> {
    let config = discover_config()?;
    let (template, source) = load_template(&input, config.as_ref()).await?;
    let values = supplied_values(&input)?;

    let root_domain = root_domain
        .or_else(|| config.and_then(|config| config.root_domain))
        .unwrap_or_else(|| PLACEHOLDER_ROOT_DOMAIN.to_string());

    let plan = prepare(&template, &values, &root_domain)?;
    let mut diag = Diagnostics::default();
    diag.record_plan(&plan);

    output.progress(&format!(
        "Template {} resolves to {} service(s) on {}:",
        source,
        plan.services.len(),
        root_domain
    ));
    output.services(&plan.services);

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    output.success("Template is valid");
    Ok(())
}
