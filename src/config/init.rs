// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates oneclick.yml starter files.

use std::path::Path;

use crate::api::DEFAULT_REPOSITORY;
use crate::error::{Error, Result};

use super::deserialize::normalize_url;
use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, endpoint: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(url) = endpoint {
        config.endpoint = normalize_url(url).map_err(Error::InvalidConfig)?;
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"endpoint: {}
password:
  env: CAPTAIN_PASSWORD
namespace: {}
# Root domain of the platform; asked from the API when omitted
# root_domain: example.com
# Where `oneclick list` and `--app` look up templates
# repository: {}
timeout: {}s
"#,
        config.endpoint,
        config.namespace,
        DEFAULT_REPOSITORY,
        config.timeout.as_secs()
    )
}
