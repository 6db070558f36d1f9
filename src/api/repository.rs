// ABOUTME: Client for a one-click app repository serving template listings.
// ABOUTME: Lists published apps and fetches a template by name over HTTP.

use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::time::Duration;

use super::error::{ApiError, DecodeSnafu, UnknownAppSnafu};
use super::{base_url, http_client, transport_error};
use crate::template::Template;

/// Public repository of v2 one-click app templates.
pub const DEFAULT_REPOSITORY: &str =
    "https://raw.githubusercontent.com/caprover/one-click-apps/master/public/v2";

const LIST_PATH: &str = "/list";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One app published by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppListing {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Listing document; entries are bare names or objects with details.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(alias = "oneClickApps")]
    app_list: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEntry {
    Name(String),
    Detailed(AppListing),
}

impl From<ListEntry> for AppListing {
    fn from(entry: ListEntry) -> Self {
        match entry {
            ListEntry::Name(name) => AppListing {
                name,
                display_name: None,
                description: None,
            },
            ListEntry::Detailed(listing) => listing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateRepository {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TemplateRepository {
    pub fn new(url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url(url)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Apps the repository publishes, sorted by name.
    pub async fn list(&self) -> Result<Vec<AppListing>, ApiError> {
        let bytes = self.get(LIST_PATH).await?;
        let response: ListResponse =
            serde_json::from_slice(&bytes).context(DecodeSnafu { path: LIST_PATH })?;

        let mut apps: Vec<AppListing> = response.app_list.into_iter().map(Into::into).collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    /// Fetch the template published as `name`.
    pub async fn fetch(&self, name: &str) -> Result<Template, ApiError> {
        let path = format!("/apps/{}.json", urlencoding::encode(name));
        let bytes = match self.get(&path).await {
            Err(ApiError::Rejected { status: 404, .. }) => {
                return UnknownAppSnafu { name }.fail();
            }
            other => other?,
        };

        tracing::debug!("Fetched template {} ({} bytes)", name, bytes.len());
        serde_json::from_slice(&bytes).context(DecodeSnafu { path })
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        tracing::debug!("GET {}{}", self.base_url, path);

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .timeout(self.timeout)
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
        Ok(bytes.to_vec())
    }
}
