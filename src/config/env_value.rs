// ABOUTME: Platform password given inline or read from the environment at connect time.
// ABOUTME: Lets oneclick.yml be committed without the dashboard password in it.

use crate::error::{Error, Result};
use serde::Deserialize;

/// The `password:` setting.
///
/// ```yaml
/// password: hunter2            # inline
/// password:
///   env: CAPTAIN_PASSWORD      # read when the client is built
///   default: captain42         # used if the variable is unset
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// The password to log in with.
    ///
    /// An unset variable with no fallback is [`Error::MissingEnvVar`], so a
    /// deploy stops before any request is sent.
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(password) => Ok(password.clone()),
            EnvValue::FromEnv { var, default } => std::env::var(var)
                .ok()
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }

    /// Where the password comes from, without revealing it.
    pub fn source(&self) -> String {
        match self {
            EnvValue::Literal(_) => "inline".to_string(),
            EnvValue::FromEnv { var, .. } => format!("${}", var),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_reference_parses_with_fallback() {
        let value: EnvValue =
            serde_yaml::from_str("env: ONECLICK_TEST_UNSET_PASSWORD\ndefault: fallback\n").unwrap();
        assert_eq!(value.source(), "$ONECLICK_TEST_UNSET_PASSWORD");
        assert_eq!(value.resolve().unwrap(), "fallback");
    }

    #[test]
    fn inline_password_is_not_echoed() {
        let value: EnvValue = serde_yaml::from_str("hunter2").unwrap();
        assert_eq!(value.source(), "inline");
        assert_eq!(value.resolve().unwrap(), "hunter2");
    }
}
