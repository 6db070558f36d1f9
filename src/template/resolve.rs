// ABOUTME: Template resolution: substitutes effective values into every service field.
// ABOUTME: Produces placeholder-free service specs or fails without partial output.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::placeholder;
use super::{APP_NAME_PATTERN, APP_NAME_VAR, ServiceEntry, Template};
use crate::deploy::DeployError;
use crate::types::{ImageRef, PortMapping, ServiceName, VolumeMount};

/// A template service with every placeholder substituted, ready to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedServiceSpec {
    /// Service key from the template, after substitution.
    pub key: String,
    /// App name on the platform.
    pub name: ServiceName,
    pub image: String,
    pub environment: BTreeMap<String, String>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    pub container_http_port: Option<u16>,
    pub expose_as_web_app: bool,
}

impl ResolvedServiceSpec {
    pub fn has_persistent_data(&self) -> bool {
        !self.volumes.is_empty()
    }
}

/// Resolved services in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub services: Vec<ResolvedServiceSpec>,
    /// Author-declared variables no service refers to.
    pub unused: Vec<String>,
}

/// Resolve a template against validated effective values.
///
/// The schema version is checked before any variable work.
pub fn resolve(
    template: &Template,
    values: &BTreeMap<String, String>,
) -> Result<Resolution, DeployError> {
    template.check_schema()?;

    let app_name = app_name(values)?;
    let mut services = Vec::with_capacity(template.services().len());
    let mut names = BTreeSet::new();
    let mut referenced = BTreeSet::new();

    for entry in template.services() {
        let spec = resolve_service(entry, values, &app_name, &mut referenced)?;
        if !names.insert(spec.name.clone()) {
            return Err(DeployError::DuplicateServiceName(spec.name.to_string()));
        }
        tracing::debug!("Resolved service {} as {}", entry.key, spec.name);
        services.push(spec);
    }

    let unused = template
        .variables
        .iter()
        .filter(|v| !v.is_reserved() && !referenced.contains(v.id.as_str()))
        .map(|v| v.id.clone())
        .collect();

    Ok(Resolution { services, unused })
}

fn app_name(values: &BTreeMap<String, String>) -> Result<ServiceName, DeployError> {
    let raw = values
        .get(APP_NAME_VAR)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DeployError::MissingRequiredVariable(APP_NAME_VAR.to_string()))?;

    ServiceName::new(raw).map_err(|_| DeployError::InvalidVariableValue {
        id: APP_NAME_VAR.to_string(),
        value: raw.clone(),
        pattern: APP_NAME_PATTERN.to_string(),
    })
}

/// Substitutes fields of one service, remembering which tokens it used.
struct FieldResolver<'a> {
    service: &'a str,
    values: &'a BTreeMap<String, String>,
    referenced: &'a mut BTreeSet<String>,
}

impl FieldResolver<'_> {
    fn resolve(&mut self, field: &str, raw: &str) -> Result<String, DeployError> {
        self.referenced
            .extend(placeholder::tokens(raw).map(str::to_string));

        placeholder::substitute(raw, self.values).map_err(|token| {
            DeployError::UnresolvedPlaceholder {
                service: self.service.to_string(),
                field: field.to_string(),
                token,
            }
        })
    }

    fn invalid(&self, field: &str, value: &str, reason: impl ToString) -> DeployError {
        DeployError::InvalidServiceField {
            service: self.service.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn resolve_service(
    entry: &ServiceEntry,
    values: &BTreeMap<String, String>,
    app_name: &ServiceName,
    referenced: &mut BTreeSet<String>,
) -> Result<ResolvedServiceSpec, DeployError> {
    let definition = &entry.definition;
    let mut fields = FieldResolver {
        service: &entry.key,
        values,
        referenced,
    };

    let key = fields.resolve("key", &entry.key)?;
    let key_mentions_app = placeholder::tokens(&entry.key).any(|t| t == APP_NAME_VAR);
    let name = ServiceName::for_service(app_name, &key, key_mentions_app).map_err(|e| {
        DeployError::InvalidServiceName {
            service: entry.key.clone(),
            name: if key_mentions_app {
                key.clone()
            } else {
                format!("{}-{}", app_name, key)
            },
            reason: e.to_string(),
        }
    })?;

    let image = fields.resolve("image", &definition.image)?;
    ImageRef::parse(&image).map_err(|e| fields.invalid("image", &image, e))?;

    let mut environment = BTreeMap::new();
    for (raw_key, raw_value) in &definition.environment {
        let env_key = fields.resolve("environment", raw_key)?;
        let env_value = fields.resolve(&format!("environment.{}", raw_key), raw_value)?;
        if environment.contains_key(&env_key) {
            return Err(fields.invalid(
                "environment",
                &env_key,
                "another environment key resolves to the same name",
            ));
        }
        environment.insert(env_key, env_value);
    }

    let mut ports = Vec::with_capacity(definition.ports.len());
    for (i, raw) in definition.ports.iter().enumerate() {
        let field = format!("ports[{}]", i);
        let value = fields.resolve(&field, raw)?;
        ports.push(PortMapping::parse(&value).map_err(|e| fields.invalid(&field, &value, e))?);
    }

    let mut volumes = Vec::with_capacity(definition.volumes.len());
    for (i, raw) in definition.volumes.iter().enumerate() {
        let field = format!("volumes[{}]", i);
        let value = fields.resolve(&field, raw)?;
        volumes.push(VolumeMount::parse(&value).map_err(|e| fields.invalid(&field, &value, e))?);
    }

    let container_http_port = match &definition.container_http_port {
        Some(raw) => {
            let value = fields.resolve("containerHttpPort", raw)?;
            let port = crate::types::parse_port(&value)
                .map_err(|e| fields.invalid("containerHttpPort", &value, e))?;
            Some(port)
        }
        None => None,
    };

    Ok(ResolvedServiceSpec {
        key,
        name,
        image,
        environment,
        ports,
        volumes,
        container_http_port,
        expose_as_web_app: !definition.not_expose_as_web_app,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployErrorKind;
    use crate::template::ROOT_DOMAIN_VAR;
    use crate::types::VolumeSource;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const BUNDLE: &str = r#"
captainVersion: "2"
variables:
  - id: $$cap_pg_version
    label: Postgres version
  - id: $$cap_never_used
    label: Unused
dockerCompose:
  services:
    $$cap_appname:
      image: ghost:latest
      containerHttpPort: "2368"
      environment:
        url: http://$$cap_appname.$$cap_root_domain
        database__connection__host: srv-captain--$$cap_appname-db
    $$cap_appname-db:
      image: postgres:$$cap_pg_version
      notExposeAsWebApp: true
      ports:
        - "5433:5432"
      volumes:
        - $$cap_appname-db-data:/var/lib/postgresql/data
"#;

    fn bundle_values() -> BTreeMap<String, String> {
        values(&[
            (APP_NAME_VAR, "blog"),
            (ROOT_DOMAIN_VAR, "apps.example.com"),
            ("$$cap_pg_version", "13"),
            ("$$cap_never_used", ""),
        ])
    }

    #[test]
    fn resolves_every_field() {
        let template = Template::from_yaml(BUNDLE).unwrap();
        let resolution = resolve(&template, &bundle_values()).unwrap();

        let [ghost, db] = resolution.services.as_slice() else {
            panic!("expected two services");
        };

        assert_eq!(ghost.name.as_str(), "blog");
        assert_eq!(ghost.container_http_port, Some(2368));
        assert!(ghost.expose_as_web_app);
        assert_eq!(ghost.environment["url"], "http://blog.apps.example.com");
        assert_eq!(
            ghost.environment["database__connection__host"],
            "srv-captain--blog-db"
        );

        assert_eq!(db.name.as_str(), "blog-db");
        assert_eq!(db.image, "postgres:13");
        assert!(!db.expose_as_web_app);
        assert_eq!(db.ports[0].host_port, 5433);
        assert_eq!(
            db.volumes[0].source,
            VolumeSource::Named("blog-db-data".to_string())
        );
        assert!(db.has_persistent_data());
    }

    #[test]
    fn reports_unused_declarations() {
        let template = Template::from_yaml(BUNDLE).unwrap();
        let resolution = resolve(&template, &bundle_values()).unwrap();
        assert_eq!(resolution.unused, vec!["$$cap_never_used".to_string()]);
    }

    #[test]
    fn unresolved_placeholder_names_service_and_field() {
        let template = Template::from_yaml(BUNDLE).unwrap();
        let mut vals = bundle_values();
        vals.remove("$$cap_pg_version");

        let err = resolve(&template, &vals).unwrap_err();
        match err {
            DeployError::UnresolvedPlaceholder {
                service,
                field,
                token,
            } => {
                assert_eq!(service, "$$cap_appname-db");
                assert_eq!(field, "image");
                assert_eq!(token, "$$cap_pg_version");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn platform_token_inside_a_value_fails() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    web:
      image: nginx
      environment:
        TAG: $$cap_tag
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let vals = values(&[(APP_NAME_VAR, "myapp"), ("$$cap_tag", "$$cap_undeclared")]);

        match resolve(&template, &vals).unwrap_err() {
            DeployError::UnresolvedPlaceholder { field, token, .. } => {
                assert_eq!(field, "environment.TAG");
                assert_eq!(token, "$$cap_undeclared");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_checked_before_values() {
        let yaml = BUNDLE.replace("captainVersion: \"2\"", "captainVersion: \"3\"");
        let template = Template::from_yaml(&yaml).unwrap();

        let err = resolve(&template, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::SchemaVersionMismatch);
    }

    #[test]
    fn invalid_port_after_substitution_fails() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    web:
      image: nginx
      containerHttpPort: $$cap_port
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let vals = values(&[(APP_NAME_VAR, "myapp"), ("$$cap_port", "eighty")]);

        let err = resolve(&template, &vals).unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::InvalidServiceField);
        assert!(err.to_string().contains("containerHttpPort"));
    }

    #[test]
    fn colliding_names_fail() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    db:
      image: a
    $$cap_appname-db:
      image: b
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let err = resolve(&template, &values(&[(APP_NAME_VAR, "myapp")])).unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::DuplicateServiceName);
    }

    #[test]
    fn environment_keys_resolving_to_same_name_fail() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    web:
      image: nginx
      environment:
        $$cap_env_name: from-variable
        MODE: literal
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let vals = values(&[(APP_NAME_VAR, "myapp"), ("$$cap_env_name", "MODE")]);

        let err = resolve(&template, &vals).unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::InvalidServiceField);
        assert!(err.to_string().contains("MODE"));
    }

    #[test]
    fn invalid_app_name_is_rejected() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    web:
      image: a
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let err = resolve(&template, &values(&[(APP_NAME_VAR, "My App")])).unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::InvalidVariableValue);

        let err = resolve(&template, &values(&[])).unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::MissingRequiredVariable);
    }

    #[test]
    fn invalid_key_is_reported_as_service_name_error() {
        let yaml = r#"
captainVersion: "2"
dockerCompose:
  services:
    Web_Frontend:
      image: a
"#;
        let template = Template::from_yaml(yaml).unwrap();
        let err = resolve(&template, &values(&[(APP_NAME_VAR, "myapp")])).unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::InvalidServiceName);
    }
}
