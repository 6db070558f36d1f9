// ABOUTME: Configuration types and parsing for oneclick.yml.
// ABOUTME: Describes how to reach the platform API and builds the client for it.

mod deserialize;
mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use crate::api::{CaptainClient, DEFAULT_NAMESPACE, DEFAULT_REPOSITORY, TemplateRepository};
use crate::error::{Error, Result};
use deserialize::{deserialize_endpoint, deserialize_opt_url, deserialize_root_domain};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "oneclick.yml";
pub const CONFIG_FILENAME_ALT: &str = "oneclick.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".oneclick/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the platform API, e.g. `https://captain.example.com`.
    #[serde(deserialize_with = "deserialize_endpoint")]
    pub endpoint: String,

    pub password: EnvValue,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Root domain of the platform; asked from the API when absent.
    #[serde(default, deserialize_with = "deserialize_root_domain")]
    pub root_domain: Option<String>,

    /// One-click app repository; the public one when absent.
    #[serde(default, deserialize_with = "deserialize_opt_url")]
    pub repository: Option<String>,

    /// Applied to every API request.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Using config {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn template() -> Self {
        Config {
            endpoint: "http://captain.example.com:3000".to_string(),
            password: EnvValue::FromEnv {
                var: "CAPTAIN_PASSWORD".to_string(),
                default: None,
            },
            namespace: default_namespace(),
            root_domain: None,
            repository: None,
            timeout: default_timeout(),
        }
    }

    /// Build an API client, resolving the password from the environment if needed.
    pub fn client(&self) -> Result<CaptainClient> {
        let password = self.password.resolve()?;
        let client = CaptainClient::new(&self.endpoint, password)?
            .namespace(&self.namespace)
            .timeout(self.timeout);
        Ok(client)
    }

    /// Repository client for the configured or public template repository.
    pub fn template_repository(&self) -> Result<TemplateRepository> {
        let url = self.repository.as_deref().unwrap_or(DEFAULT_REPOSITORY);
        Ok(TemplateRepository::new(url)?.timeout(self.timeout))
    }

    /// The configured root domain, or the one the platform reports.
    pub async fn root_domain(&self, client: &CaptainClient) -> Result<String> {
        match &self.root_domain {
            Some(domain) => Ok(domain.clone()),
            None => Ok(client.root_domain().await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config = Config::from_yaml(
            "endpoint: http://captain.example.com:3000\npassword: hunter2\n",
        )
        .unwrap();

        assert_eq!(config.endpoint, "http://captain.example.com:3000");
        assert_eq!(config.password, EnvValue::Literal("hunter2".to_string()));
        assert_eq!(config.namespace, "captain");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.root_domain.is_none());
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
endpoint: http://10.0.0.5:3000/
password:
  env: CAPTAIN_PASSWORD
  default: changeme
namespace: staging
root_domain: apps.example.com
timeout: 2m
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.endpoint, "http://10.0.0.5:3000");
        assert_eq!(config.namespace, "staging");
        assert_eq!(config.root_domain.as_deref(), Some("apps.example.com"));
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn accepts_https_endpoint() {
        let config =
            Config::from_yaml("endpoint: https://captain.example.com/\npassword: x\n").unwrap();
        assert_eq!(config.endpoint, "https://captain.example.com");
        assert!(config.client().is_ok());
    }

    #[test]
    fn rejects_endpoint_without_scheme() {
        let err = Config::from_yaml("endpoint: captain.example.com\npassword: x\n").unwrap_err();
        assert!(err.to_string().contains("https://"));
    }

    #[test]
    fn repository_defaults_to_public_one() {
        let config = Config::from_yaml("endpoint: http://a\npassword: x\n").unwrap();
        assert_eq!(config.template_repository().unwrap().url(), DEFAULT_REPOSITORY);

        let config = Config::from_yaml(
            "endpoint: http://a\npassword: x\nrepository: http://templates.local/v2/\n",
        )
        .unwrap();
        assert_eq!(
            config.template_repository().unwrap().url(),
            "http://templates.local/v2"
        );
    }

    #[test]
    fn rejects_blank_root_domain() {
        let yaml = "endpoint: http://a\npassword: x\nroot_domain: \"  \"\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn discover_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn discover_finds_nested_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".oneclick")).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME_DIR),
            "endpoint: http://captain.local\npassword: x\n",
        )
        .unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.endpoint, "http://captain.local");
    }

    #[test]
    fn builds_client_from_literal_password() {
        let config = Config::from_yaml("endpoint: http://captain.local\npassword: x\n").unwrap();
        let client = config.client().unwrap();
        assert!(!format!("{:?}", client).contains("\"x\""));
    }
}
