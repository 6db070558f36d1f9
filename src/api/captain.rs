// ABOUTME: HTTP client for the CapRover-compatible v2 application API.
// ABOUTME: Wraps a reqwest client with a cached auth token and per-request timeout.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use snafu::ResultExt;
use std::time::Duration;

use super::error::{ApiError, DecodeSnafu};
use super::{AppManager, base_url, http_client, transport_error};
use crate::template::ResolvedServiceSpec;
use crate::types::VolumeSource;

/// Namespace the platform uses for its own apps.
pub const DEFAULT_NAMESPACE: &str = "captain";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Container port the platform routes web traffic to when the template says nothing.
const DEFAULT_HTTP_PORT: u16 = 80;

const LOGIN_PATH: &str = "/api/v2/login";
const SYSTEM_INFO_PATH: &str = "/api/v2/user/system/info";
const REGISTER_PATH: &str = "/api/v2/user/apps/appDefinitions/register";
const UPDATE_PATH: &str = "/api/v2/user/apps/appDefinitions/update";
const APP_DATA_PATH: &str = "/api/v2/user/apps/appData";

const STATUS_OK: i64 = 100;
const STATUS_OK_DEPLOY_STARTED: i64 = 101;
const STATUS_OK_PARTIALLY: i64 = 102;
const STATUS_NOT_AUTHORIZED: i64 = 1105;
const STATUS_AUTH_TOKEN_INVALID: i64 = 1106;

/// Response envelope wrapping every API answer.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: i64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data: Value,
}

/// Client for a single platform instance.
pub struct CaptainClient {
    http: reqwest::Client,
    base_url: String,
    password: String,
    namespace: String,
    timeout: Duration,
    token: Mutex<Option<String>>,
}

impl std::fmt::Debug for CaptainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptainClient")
            .field("endpoint", &self.base_url)
            .field("namespace", &self.namespace)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CaptainClient {
    /// Create a client for the platform at `url` (e.g. `https://captain.example.com`).
    pub fn new(url: &str, password: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url(url)?,
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token: Mutex::new(None),
        })
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Per-request timeout; expiry is reported as a transport error.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exchange the password for an auth token and cache it.
    pub async fn login(&self) -> Result<String, ApiError> {
        let data = self
            .call(
                Method::POST,
                LOGIN_PATH,
                Some(json!({ "password": self.password })),
                None,
            )
            .await?;

        let token = data
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Unauthorized {
                description: "login response carried no token".to_string(),
            })?
            .to_string();

        *self.token.lock() = Some(token.clone());
        Ok(token)
    }

    /// Root domain the platform serves apps under.
    pub async fn root_domain(&self) -> Result<String, ApiError> {
        let data = self.authed(Method::GET, SYSTEM_INFO_PATH, None).await?;
        data.get("rootDomain")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Rejected {
                path: SYSTEM_INFO_PATH.to_string(),
                status: STATUS_OK,
                description: "system info carried no rootDomain".to_string(),
            })
    }

    async fn token(&self) -> Result<String, ApiError> {
        let cached = self.token.lock().clone();
        match cached {
            Some(token) => Ok(token),
            None => self.login().await,
        }
    }

    async fn authed(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let token = self.token().await?;
        self.call(method, path, body, Some(&token)).await
    }

    /// Send one request and unwrap the response envelope.
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        tracing::debug!("{} {}", method, path);

        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(self.timeout)
            .header("x-namespace", self.namespace.as_str());
        if let Some(token) = token {
            request = request.header("x-captain-auth", token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(path, self.timeout, e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(path, self.timeout, e))?;

        if !status.is_success() {
            return Err(ApiError::Rejected {
                path: path.to_string(),
                status: i64::from(status.as_u16()),
                description: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        let envelope: Envelope = serde_json::from_slice(&bytes).context(DecodeSnafu { path })?;
        match envelope.status {
            STATUS_OK | STATUS_OK_DEPLOY_STARTED | STATUS_OK_PARTIALLY => Ok(envelope.data),
            STATUS_NOT_AUTHORIZED | STATUS_AUTH_TOKEN_INVALID => {
                self.token.lock().take();
                Err(ApiError::Unauthorized {
                    description: envelope.description,
                })
            }
            status => Err(ApiError::Rejected {
                path: path.to_string(),
                status,
                description: envelope.description,
            }),
        }
    }
}

#[async_trait]
impl AppManager for CaptainClient {
    async fn deploy_service(&self, spec: &ResolvedServiceSpec) -> Result<(), ApiError> {
        let app_name = spec.name.as_str();

        tracing::debug!("Registering app {}", app_name);
        self.authed(
            Method::POST,
            REGISTER_PATH,
            Some(json!({
                "appName": app_name,
                "hasPersistentData": spec.has_persistent_data(),
            })),
        )
        .await?;

        tracing::debug!("Configuring app {}", app_name);
        self.authed(Method::POST, UPDATE_PATH, Some(app_definition(spec)))
            .await?;

        tracing::debug!("Deploying image {} to app {}", spec.image, app_name);
        let path = format!("{}/{}", APP_DATA_PATH, urlencoding::encode(app_name));
        self.authed(
            Method::POST,
            &path,
            Some(json!({
                "captainDefinitionContent": captain_definition(spec).to_string(),
                "gitHash": "",
            })),
        )
        .await?;

        Ok(())
    }
}

/// App definition body for the update call.
pub(crate) fn app_definition(spec: &ResolvedServiceSpec) -> Value {
    let env_vars: Vec<Value> = spec
        .environment
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();

    let volumes: Vec<Value> = spec
        .volumes
        .iter()
        .map(|mount| match &mount.source {
            VolumeSource::Named(name) => {
                json!({ "containerPath": mount.container_path, "volumeName": name })
            }
            VolumeSource::HostPath(path) => {
                json!({ "containerPath": mount.container_path, "hostPath": path })
            }
        })
        .collect();

    let ports: Vec<Value> = spec
        .ports
        .iter()
        .map(|p| json!({ "hostPort": p.host_port, "containerPort": p.container_port }))
        .collect();

    json!({
        "appName": spec.name.as_str(),
        "instanceCount": 1,
        "envVars": env_vars,
        "volumes": volumes,
        "ports": ports,
        "containerHttpPort": spec.container_http_port.unwrap_or(DEFAULT_HTTP_PORT),
        "notExposeAsWebApp": !spec.expose_as_web_app,
    })
}

/// Deployment descriptor telling the platform which image to run.
pub(crate) fn captain_definition(spec: &ResolvedServiceSpec) -> Value {
    json!({
        "schemaVersion": 2,
        "imageName": spec.image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PortMapping, ServiceName, VolumeMount};
    use std::collections::BTreeMap;

    fn spec() -> ResolvedServiceSpec {
        ResolvedServiceSpec {
            key: "db".to_string(),
            name: ServiceName::new("myapp-db").unwrap(),
            image: "postgres:13".to_string(),
            environment: BTreeMap::from([("POSTGRES_DB".to_string(), "app".to_string())]),
            ports: vec![PortMapping {
                host_port: 5433,
                container_port: 5432,
            }],
            volumes: vec![
                VolumeMount::parse("myapp-data:/var/lib/postgresql/data").unwrap(),
                VolumeMount::parse("/srv/init:/docker-entrypoint-initdb.d").unwrap(),
            ],
            container_http_port: None,
            expose_as_web_app: false,
        }
    }

    #[test]
    fn accepts_https_endpoint() {
        let client = CaptainClient::new("https://captain.example.com/", "x").unwrap();
        assert_eq!(client.base_url, "https://captain.example.com");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = CaptainClient::new("ftp://captain.example.com", "x").unwrap_err();
        assert_eq!(err.kind(), crate::api::ApiErrorKind::InvalidEndpoint);
    }

    #[test]
    fn app_definition_maps_every_setting() {
        let def = app_definition(&spec());
        assert_eq!(def["appName"], "myapp-db");
        assert_eq!(def["envVars"][0]["key"], "POSTGRES_DB");
        assert_eq!(def["envVars"][0]["value"], "app");
        assert_eq!(def["ports"][0]["hostPort"], 5433);
        assert_eq!(def["volumes"][0]["volumeName"], "myapp-data");
        assert_eq!(def["volumes"][1]["hostPath"], "/srv/init");
        assert_eq!(def["containerHttpPort"], 80);
        assert_eq!(def["notExposeAsWebApp"], true);
    }

    #[test]
    fn captain_definition_names_image() {
        let def = captain_definition(&spec());
        assert_eq!(def["schemaVersion"], 2);
        assert_eq!(def["imageName"], "postgres:13");
    }
}
