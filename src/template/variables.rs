// ABOUTME: Validation of user-supplied values against variable declarations.
// ABOUTME: Pure function: no I/O, yields the effective value of every declared variable.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use super::Variable;
use super::placeholder;
use crate::deploy::DeployError;

/// Values supplied by the caller, keyed by variable id.
pub type SuppliedValues = BTreeMap<String, String>;

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    /// Effective value of every declared variable.
    pub values: BTreeMap<String, String>,
    /// Supplied keys that no declaration mentions.
    pub ignored: Vec<String>,
}

/// Compile a declared pattern so that it must match the whole value.
///
/// Patterns may be written as JavaScript literals (`/body/flags`); the `i`,
/// `m`, and `s` flags are honoured and the rest ignored.
pub fn compile_pattern(raw: &str) -> Result<Regex, regex::Error> {
    let (body, flags) = split_literal(raw).unwrap_or((raw, ""));
    let inline: String = flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's')).collect();

    let pattern = if inline.is_empty() {
        format!("^(?:{body})$")
    } else {
        format!("(?{inline})^(?:{body})$")
    };
    Regex::new(&pattern)
}

fn split_literal(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let flags = &rest[end + 1..];
    if flags.chars().all(|c| c.is_ascii_alphabetic()) {
        Some((&rest[..end], flags))
    } else {
        None
    }
}

/// Check declarations themselves: well-formed, unique ids.
pub fn check_declarations(declarations: &[Variable]) -> Result<(), DeployError> {
    let mut seen = HashSet::new();
    for variable in declarations {
        if !placeholder::is_token(&variable.id) {
            return Err(DeployError::InvalidVariableId(variable.id.clone()));
        }
        if !seen.insert(variable.id.as_str()) {
            return Err(DeployError::DuplicateVariable(variable.id.clone()));
        }
    }
    Ok(())
}

/// Validate supplied values against declarations.
///
/// An empty supplied value counts as not supplied. Patterns are only checked
/// when there is a value to check.
pub fn validate(
    declarations: &[Variable],
    supplied: &SuppliedValues,
) -> Result<Validated, DeployError> {
    check_declarations(declarations)?;

    let mut values = BTreeMap::new();
    for variable in declarations {
        let value = supplied
            .get(&variable.id)
            .filter(|v| !v.is_empty())
            .or(variable.default_value.as_ref());

        let Some(value) = value else {
            if variable.required {
                return Err(DeployError::MissingRequiredVariable(variable.id.clone()));
            }
            values.insert(variable.id.clone(), String::new());
            continue;
        };

        if let Some(raw) = &variable.valid_regex {
            let pattern = compile_pattern(raw).map_err(|e| DeployError::InvalidPattern {
                id: variable.id.clone(),
                pattern: raw.clone(),
                reason: e.to_string(),
            })?;
            if !pattern.is_match(value) {
                return Err(DeployError::InvalidVariableValue {
                    id: variable.id.clone(),
                    value: value.clone(),
                    pattern: raw.clone(),
                });
            }
        }

        values.insert(variable.id.clone(), value.clone());
    }

    let ignored: Vec<String> = supplied
        .keys()
        .filter(|key| !values.contains_key(*key))
        .cloned()
        .collect();
    for key in &ignored {
        tracing::debug!("Ignoring value for undeclared variable {}", key);
    }

    Ok(Validated { values, ignored })
}
