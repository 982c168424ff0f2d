//! Microsoft Graph HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use entra_prov_runtime::{DirectoryClient, DirectoryResponse};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::credential::Credential;
use crate::error::GraphResult;
use crate::token::{TokenCache, TokenSource, token_source};

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoints used by [`GraphClient`]. Defaults target the public cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSettings {
    /// Graph API root, including the version segment.
    pub base_url: String,
    pub authority_host: String,
    pub scope: String,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            scope: DEFAULT_GRAPH_SCOPE.to_string(),
        }
    }
}

impl GraphSettings {
    /// Point at another Graph root. The token scope follows the root's
    /// origin, so sovereign clouds get tokens for their own audience.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        if let Ok(url) = reqwest::Url::parse(&self.base_url) {
            self.scope = format!("{}/.default", url.origin().ascii_serialization());
        }
        self
    }

    pub fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            tenant_id
        )
    }

    /// The scope without its `/.default` suffix, for resource-style token
    /// endpoints.
    pub fn resource(&self) -> &str {
        self.scope.trim_end_matches("/.default")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Authenticated transport for the directory API.
///
/// Holds no directory state, only the endpoints and the cached token.
pub struct GraphClient {
    http: reqwest::Client,
    settings: GraphSettings,
    tokens: TokenCache,
}

impl GraphClient {
    pub fn new(credential: &Credential) -> GraphResult<Self> {
        Self::with_settings(credential, GraphSettings::default())
    }

    pub fn with_settings(credential: &Credential, settings: GraphSettings) -> GraphResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let source = token_source(credential, &settings, &http)?;
        debug!(
            credential = credential.kind(),
            source = source.name(),
            base_url = %settings.base_url,
            "Configured Graph client"
        );
        Ok(Self {
            http,
            settings,
            tokens: TokenCache::new(source),
        })
    }

    /// Build a client around an existing token source.
    pub fn with_token_source(
        settings: GraphSettings,
        source: Box<dyn TokenSource>,
    ) -> GraphResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            settings,
            tokens: TokenCache::new(source),
        })
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    #[instrument(skip(self, payload))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> GraphResult<DirectoryResponse> {
        let token = self.tokens.bearer().await?;

        let mut request = self
            .http
            .request(method, self.settings.url(path))
            .bearer_auth(token);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(status, bytes = text.len(), "Graph response");

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(json) => json,
                Err(_) => Value::String(text),
            }
        };
        Ok(DirectoryResponse::new(status, body))
    }
}

#[async_trait]
impl DirectoryClient for GraphClient {
    async fn get(&self, path: &str) -> anyhow::Result<DirectoryResponse> {
        Ok(self.send(Method::GET, path, None).await?)
    }

    async fn post(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse> {
        Ok(self.send(Method::POST, path, Some(payload)).await?)
    }

    async fn patch(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse> {
        Ok(self.send(Method::PATCH, path, Some(payload)).await?)
    }
}
