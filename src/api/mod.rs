// ABOUTME: Application-management API consumed by the deployment sequencer.
// ABOUTME: Defines the AppManager seam, the platform client, and the template repository.

mod captain;
mod error;
mod repository;

pub use captain::{CaptainClient, DEFAULT_NAMESPACE};
pub use error::{ApiError, ApiErrorKind};
pub use repository::{AppListing, DEFAULT_REPOSITORY, TemplateRepository};

use crate::template::ResolvedServiceSpec;
use async_trait::async_trait;
use error::InvalidEndpointSnafu;
use snafu::ensure;
use std::sync::Arc;
use std::time::Duration;

/// Creates and configures applications on the platform.
#[async_trait]
pub trait AppManager: Send + Sync {
    /// Create the app for a service, apply its configuration, and deploy its image.
    ///
    /// Treated as one step by the caller: any error means the service failed.
    async fn deploy_service(&self, spec: &ResolvedServiceSpec) -> Result<(), ApiError>;
}

#[async_trait]
impl<T: AppManager + ?Sized> AppManager for Arc<T> {
    async fn deploy_service(&self, spec: &ResolvedServiceSpec) -> Result<(), ApiError> {
        (**self).deploy_service(spec).await
    }
}

/// Normalize an `http(s)://` base URL, without a trailing slash.
pub(crate) fn base_url(url: &str) -> Result<String, ApiError> {
    let parsed = reqwest::Url::parse(url.trim()).map_err(|e| ApiError::InvalidEndpoint {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    ensure!(
        matches!(parsed.scheme(), "http" | "https"),
        InvalidEndpointSnafu {
            url,
            reason: "only http:// and https:// endpoints are supported",
        }
    );
    ensure!(
        parsed.host_str().is_some_and(|host| !host.is_empty()),
        InvalidEndpointSnafu {
            url,
            reason: "missing host",
        }
    );

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

pub(crate) fn http_client() -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .user_agent(concat!("oneclick/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::transport(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn transport_error(path: &str, timeout: Duration, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::transport(format!(
            "request to {} timed out after {}s",
            path,
            timeout.as_secs_f64()
        ))
    } else {
        ApiError::transport(format!("request to {} failed: {}", path, err))
    }
}
