// ABOUTME: Custom serde deserializers for template documents.
// ABOUTME: Keeps service declaration order and normalizes loosely typed scalars.

use nonempty::NonEmpty;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use super::{SchemaVersion, ServiceDefinition, ServiceEntry};

/// Template authors write numbers, booleans, and strings interchangeably.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value: Option<Scalar> = Option::deserialize(deserializer)?;
        Ok(SchemaVersion(value.map(|v| v.into_string().trim().to_string())))
    }
}

pub fn deserialize_opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.map(Scalar::into_string))
}

pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Scalar::Bool(b)) => Ok(b),
        Some(Scalar::Text(s)) => match s.trim() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(de::Error::custom(format!("expected a boolean, got \"{other}\""))),
        },
        Some(other) => Err(de::Error::custom(format!(
            "expected a boolean, got {}",
            other.into_string()
        ))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvironmentForm {
    Map(BTreeMap<String, Option<Scalar>>),
    List(Vec<String>),
}

/// Accepts both compose environment forms: a map, or a list of `KEY=VALUE`.
pub fn deserialize_environment<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let form: Option<EnvironmentForm> = Option::deserialize(deserializer)?;
    let env = match form {
        None => BTreeMap::new(),
        Some(EnvironmentForm::Map(map)) => map
            .into_iter()
            .map(|(k, v)| (k, v.map(Scalar::into_string).unwrap_or_default()))
            .collect(),
        Some(EnvironmentForm::List(entries)) => entries
            .into_iter()
            .map(|entry| match entry.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (entry, String::new()),
            })
            .collect(),
    };
    Ok(env)
}

/// Services are deployed in the order the document declares them, so the map
/// is read entry by entry instead of into a sorted or hashed collection.
pub fn deserialize_services<'de, D>(deserializer: D) -> Result<NonEmpty<ServiceEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ServicesVisitor;

    impl<'de> Visitor<'de> for ServicesVisitor {
        type Value = Vec<ServiceEntry>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of service definitions")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries: Vec<ServiceEntry> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, definition)) = map.next_entry::<String, ServiceDefinition>()? {
                if entries.iter().any(|e| e.key == key) {
                    return Err(de::Error::custom(format!("duplicate service key: {key}")));
                }
                entries.push(ServiceEntry { key, definition });
            }
            Ok(entries)
        }
    }

    let entries = deserializer.deserialize_map(ServicesVisitor)?;
    NonEmpty::from_vec(entries).ok_or_else(|| de::Error::custom("at least one service is required"))
}

#[cfg(test)]
mod tests {
    use super::super::Template;

    #[test]
    fn preserves_declaration_order() {
        let json = r#"{
            "captainVersion": 2,
            "dockerCompose": { "services": {
                "zeta": { "image": "a" },
                "alpha": { "image": "b" },
                "mid": { "image": "c" }
            }}
        }"#;
        let template = Template::from_json(json).unwrap();
        let keys: Vec<_> = template.services().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn preserves_yaml_declaration_order() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    web:
      image: a
    db:
      image: b
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let keys: Vec<_> = template.services().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["web", "db"]);
    }

    #[test]
    fn empty_service_map_is_rejected() {
        let json = r#"{ "captainVersion": "2", "dockerCompose": { "services": {} } }"#;
        let err = Template::from_json(json).unwrap_err();
        assert!(err.to_string().contains("at least one service"));
    }

    #[test]
    fn stringifies_scalar_environment_values() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    web:
      image: a
      environment:
        PORT: 8080
        DEBUG: true
        EMPTY:
      containerHttpPort: 80
      notExposeAsWebApp: "true"
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let web = &template.services().first().definition;
        assert_eq!(web.environment["PORT"], "8080");
        assert_eq!(web.environment["DEBUG"], "true");
        assert_eq!(web.environment["EMPTY"], "");
        assert_eq!(web.container_http_port.as_deref(), Some("80"));
        assert!(web.not_expose_as_web_app);
    }

    #[test]
    fn accepts_list_form_environment() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    web:
      image: a
      environment:
        - KEY=value=with=equals
        - BARE
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let web = &template.services().first().definition;
        assert_eq!(web.environment["KEY"], "value=with=equals");
        assert_eq!(web.environment["BARE"], "");
    }
}
