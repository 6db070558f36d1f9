// ABOUTME: Command module aggregator for the oneclick CLI.
// ABOUTME: Re-exports command handlers and resolves template inputs and values.

mod check;
mod deploy;
mod list;

pub use check::check;
pub use deploy::deploy;
pub use list::list;

use crate::cli::TemplateInput;
use oneclick::api::{DEFAULT_REPOSITORY, TemplateRepository};
use oneclick::config::Config;
use oneclick::error::{Error, Result};
use oneclick::template::{APP_NAME_VAR, SuppliedValues, Template};
use std::env;

/// Config in the working directory, if there is one.
pub(crate) fn discover_config() -> Result<Option<Config>> {
    let cwd = env::current_dir()?;
    match Config::discover(&cwd) {
        Ok(config) => Ok(Some(config)),
        Err(Error::ConfigNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Repository from the flag, else the config, else the public one.
pub(crate) fn repository(flag: Option<&str>, config: Option<&Config>) -> Result<TemplateRepository> {
    match (flag, config) {
        (Some(url), Some(config)) => Ok(TemplateRepository::new(url)?.timeout(config.timeout)),
        (Some(url), None) => Ok(TemplateRepository::new(url)?),
        (None, Some(config)) => config.template_repository(),
        (None, None) => Ok(TemplateRepository::new(DEFAULT_REPOSITORY)?),
    }
}

/// Load the template from its file or the repository, with a label for output.
pub(crate) async fn load_template(
    input: &TemplateInput,
    config: Option<&Config>,
) -> Result<(Template, String)> {
    match (&input.template, &input.app) {
        (Some(path), _) => Ok((Template::load(path)?, path.display().to_string())),
        (None, Some(name)) => {
            let repo = repository(input.repository.as_deref(), config)?;
            let template = repo.fetch(name).await?;
            Ok((template, format!("{} from {}", name, repo.url())))
        }
        (None, None) => Err(Error::MissingTemplate),
    }
}

/// Collect `--set` values and the app name into supplied values.
///
/// Keys may omit the leading `$$`; `--app-name` wins over a `--set` for the
/// same variable.
pub(crate) fn supplied_values(input: &TemplateInput) -> Result<SuppliedValues> {
    let mut values = SuppliedValues::new();
    for assignment in &input.values {
        let (key, value) = parse_assignment(assignment)?;
        values.insert(key, value);
    }
    values.insert(APP_NAME_VAR.to_string(), input.app_name.clone());
    Ok(values)
}

fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| Error::InvalidValue(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidValue(raw.to_string()));
    }

    let key = if key.starts_with("$$") {
        key.to_string()
    } else {
        format!("$${}", key)
    };
    Ok((key, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn input(values: &[&str]) -> TemplateInput {
        TemplateInput {
            template: Some(PathBuf::from("template.yml")),
            app: None,
            repository: None,
            app_name: "blog".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn prefixes_bare_keys() {
        let values = supplied_values(&input(&["cap_pg_version=13", "$$cap_x=a=b"])).unwrap();
        assert_eq!(values["$$cap_pg_version"], "13");
        assert_eq!(values["$$cap_x"], "a=b");
        assert_eq!(values[APP_NAME_VAR], "blog");
    }

    #[test]
    fn app_name_flag_wins() {
        let values = supplied_values(&input(&["cap_appname=other"])).unwrap();
        assert_eq!(values[APP_NAME_VAR], "blog");
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(matches!(
            supplied_values(&input(&["cap_pg_version"])),
            Err(Error::InvalidValue(_))
        ));
        assert!(supplied_values(&input(&["=13"])).is_err());
    }

    #[test]
    fn repository_flag_wins_over_config() {
        let config = Config::from_yaml(
            "endpoint: http://a\npassword: x\nrepository: http://configured.local\n",
        )
        .unwrap();

        let repo = repository(Some("https://flag.local/v2/"), Some(&config)).unwrap();
        assert_eq!(repo.url(), "https://flag.local/v2");

        let repo = repository(None, Some(&config)).unwrap();
        assert_eq!(repo.url(), "http://configured.local");

        let repo = repository(None, None).unwrap();
        assert_eq!(repo.url(), DEFAULT_REPOSITORY);
    }
}
