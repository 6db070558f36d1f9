// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Normalizes the API endpoint, repository URL, and optional root domain.

use serde::Deserialize;

/// Accept `http://` and `https://` URLs, without a trailing slash.
pub fn deserialize_endpoint<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    normalize_url(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_opt_url<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| normalize_url(&s))
        .transpose()
        .map_err(serde::de::Error::custom)
}

pub(crate) fn normalize_url(s: &str) -> Result<String, String> {
    let trimmed = s.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));

    match rest {
        Some(rest) if !rest.is_empty() => Ok(trimmed.to_string()),
        _ => Err(format!("expected an http:// or https:// URL, got {:?}", s)),
    }
}

pub fn deserialize_root_domain<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(domain) => {
            let domain = domain.trim().trim_end_matches('.');
            if domain.is_empty() {
                return Err(serde::de::Error::custom("root_domain cannot be empty"));
            }
            Ok(Some(domain.to_string()))
        }
    }
}
