// ABOUTME: One-click application templates: parsing, variables, and resolution.
// ABOUTME: Parses JSON/YAML templates into strictly typed structures at the boundary.

mod deserialize;
pub mod placeholder;
mod resolve;
mod variables;

pub use resolve::{Resolution, ResolvedServiceSpec, resolve};
pub use variables::{SuppliedValues, Validated, compile_pattern, validate};

use crate::deploy::DeployError;
use crate::error::Result;
use deserialize::{
    deserialize_environment, deserialize_flag, deserialize_opt_scalar, deserialize_services,
};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// The only template schema version this orchestrator implements.
pub const SUPPORTED_SCHEMA_VERSION: &str = "2";

/// Reserved token carrying the target application name.
pub const APP_NAME_VAR: &str = "$$cap_appname";

/// Reserved token carrying the platform's root domain.
pub const ROOT_DOMAIN_VAR: &str = "$$cap_root_domain";

/// Pattern every application name must match in full.
pub const APP_NAME_PATTERN: &str = r"^([a-z0-9]+\-)*[a-z0-9]+$";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default, alias = "schemaVersion")]
    pub captain_version: SchemaVersion,

    #[serde(default)]
    pub instructions: Instructions,

    #[serde(default)]
    pub variables: Vec<Variable>,

    pub docker_compose: ComposeSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeSection {
    #[serde(deserialize_with = "deserialize_services")]
    pub services: NonEmpty<ServiceEntry>,
}

/// Text shown to the operator before (`start`) and after (`end`) deployment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instructions {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// Schema version tag as written in the document (`2` or `"2"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaVersion(Option<String>);

impl SchemaVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(Some(version.into()))
    }

    pub fn is_supported(&self) -> bool {
        self.0.as_deref() == Some(SUPPORTED_SCHEMA_VERSION)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "<missing>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: String,

    pub label: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub valid_regex: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_scalar")]
    pub default_value: Option<String>,

    #[serde(default)]
    pub required: bool,
}

impl Variable {
    /// Declaration of the application name every template receives.
    pub fn app_name() -> Self {
        Variable {
            id: APP_NAME_VAR.to_string(),
            label: "App Name".to_string(),
            description: Some(
                "This is your app name. Pick a name such as my-first-1-click-app".to_string(),
            ),
            valid_regex: Some(APP_NAME_PATTERN.to_string()),
            default_value: None,
            required: true,
        }
    }

    /// Declaration of the platform root domain every template receives.
    pub fn root_domain() -> Self {
        Variable {
            id: ROOT_DOMAIN_VAR.to_string(),
            label: "Root domain".to_string(),
            description: None,
            valid_regex: None,
            default_value: None,
            required: false,
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.id == APP_NAME_VAR || self.id == ROOT_DOMAIN_VAR
    }
}

/// A service as declared in the template, keyed by its template key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub key: String,
    pub definition: ServiceDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub image: String,

    #[serde(default, deserialize_with = "deserialize_environment")]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub ports: Vec<String>,

    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_opt_scalar")]
    pub container_http_port: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub not_expose_as_web_app: bool,
}

impl Template {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a template file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn services(&self) -> &NonEmpty<ServiceEntry> {
        &self.docker_compose.services
    }

    /// Reject templates written for another schema version.
    pub fn check_schema(&self) -> std::result::Result<(), DeployError> {
        if self.captain_version.is_supported() {
            Ok(())
        } else {
            Err(DeployError::SchemaVersionMismatch {
                found: self.captain_version.to_string(),
                expected: SUPPORTED_SCHEMA_VERSION.to_string(),
            })
        }
    }

    /// Author declarations framed by the two reserved variables.
    ///
    /// Author declarations that reuse a reserved id are replaced.
    pub fn declarations(&self) -> Vec<Variable> {
        let mut declarations = Vec::with_capacity(self.variables.len() + 2);
        declarations.push(Variable::app_name());
        declarations.extend(self.variables.iter().filter(|v| !v.is_reserved()).cloned());
        declarations.push(Variable::root_domain());
        declarations
    }
}
