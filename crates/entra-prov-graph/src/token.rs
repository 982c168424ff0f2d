//! Access token acquisition.
//!
//! A [`TokenSource`] knows how to obtain one bearer token. [`TokenCache`]
//! asks it once, on the first request, and keeps the token for the rest of
//! the process. There is no refresh: a run that outlives the token fails
//! its remaining calls.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::certificate::ClientCertificate;
use crate::client::GraphSettings;
use crate::credential::Credential;
use crate::error::{GraphError, GraphResult};

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const APP_SERVICE_MSI_API_VERSION: &str = "2019-08-01";

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> GraphResult<String>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Send a token request and pull `access_token` out of the response.
async fn request_token(source_name: &'static str, request: reqwest::RequestBuilder) -> GraphResult<String> {
    let response = request
        .send()
        .await
        .map_err(|e| GraphError::token(source_name, format!("request failed: {e}")))?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GraphError::token(
            source_name,
            format!("token endpoint returned {status}: {body}"),
        ));
    }

    let parsed: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| GraphError::token(source_name, format!("unexpected token response: {e}")))?;
    Ok(parsed.access_token)
}

// ============================================================================
// Client secret
// ============================================================================

pub struct ClientSecretSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

#[async_trait]
impl TokenSource for ClientSecretSource {
    fn name(&self) -> &'static str {
        "client secret"
    }

    async fn fetch(&self) -> GraphResult<String> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        request_token(self.name(), self.http.post(&self.token_url).form(&params)).await
    }
}

// ============================================================================
// Client certificate
// ============================================================================

pub struct CertificateSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    scope: String,
    certificate: ClientCertificate,
}

#[async_trait]
impl TokenSource for CertificateSource {
    fn name(&self) -> &'static str {
        "certificate"
    }

    async fn fetch(&self) -> GraphResult<String> {
        let assertion = self.certificate.assertion(&self.client_id, &self.token_url)?;
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ];
        request_token(self.name(), self.http.post(&self.token_url).form(&params)).await
    }
}

// ============================================================================
// Managed identity (App Service / Functions)
// ============================================================================

pub struct ManagedIdentitySource {
    http: reqwest::Client,
    endpoint: String,
    secret_header: String,
    resource: String,
}

#[async_trait]
impl TokenSource for ManagedIdentitySource {
    fn name(&self) -> &'static str {
        "managed identity"
    }

    async fn fetch(&self) -> GraphResult<String> {
        let request = self
            .http
            .get(&self.endpoint)
            .header("X-IDENTITY-HEADER", &self.secret_header)
            .query(&[
                ("api-version", APP_SERVICE_MSI_API_VERSION),
                ("resource", self.resource.as_str()),
            ]);
        request_token(self.name(), request).await
    }
}

// ============================================================================
// Azure CLI
// ============================================================================

pub struct AzureCliSource {
    resource: String,
    tenant_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
}

#[async_trait]
impl TokenSource for AzureCliSource {
    fn name(&self) -> &'static str {
        "azure cli"
    }

    async fn fetch(&self) -> GraphResult<String> {
        let mut command = Command::new("az");
        command.args([
            "account",
            "get-access-token",
            "--resource",
            self.resource.as_str(),
            "--output",
            "json",
        ]);
        if let Some(tenant_id) = &self.tenant_id {
            command.args(["--tenant", tenant_id.as_str()]);
        }

        let output = command.output().await.map_err(|e| {
            GraphError::token(self.name(), format!("az CLI not available: {e}"))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GraphError::token(
                self.name(),
                format!("az account get-access-token failed: {}. Run 'az login' first.", stderr.trim()),
            ));
        }

        let token: CliToken = serde_json::from_slice(&output.stdout)?;
        Ok(token.access_token)
    }
}

// ============================================================================
// Static
// ============================================================================

/// A fixed token, for callers that already hold one.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self) -> GraphResult<String> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Build the token source for `credential`.
///
/// Certificate files are read and checked here, so a bad file fails before
/// any request is made.
pub fn token_source(
    credential: &Credential,
    settings: &GraphSettings,
    http: &reqwest::Client,
) -> GraphResult<Box<dyn TokenSource>> {
    match credential {
        Credential::Ambient => Ok(ambient_source(settings, http, |name| std::env::var(name).ok())),
        Credential::Certificate {
            client_id,
            tenant_id,
            certificate_path,
        } => {
            let certificate = ClientCertificate::load(certificate_path)?;
            debug!(thumbprint = certificate.thumbprint(), "Loaded client certificate");
            Ok(Box::new(CertificateSource {
                http: http.clone(),
                token_url: settings.token_url(tenant_id),
                client_id: client_id.clone(),
                scope: settings.scope.clone(),
                certificate,
            }))
        }
    }
}

/// Pick an ambient source from the environment:
/// 1. `AZURE_CLIENT_ID` + `AZURE_CLIENT_SECRET` + `AZURE_TENANT_ID` → client secret
/// 2. `IDENTITY_ENDPOINT` + `IDENTITY_HEADER` → managed identity
/// 3. otherwise → Azure CLI
pub fn ambient_source(
    settings: &GraphSettings,
    http: &reqwest::Client,
    env: impl Fn(&str) -> Option<String>,
) -> Box<dyn TokenSource> {
    if let (Some(client_id), Some(client_secret), Some(tenant_id)) = (
        env("AZURE_CLIENT_ID"),
        env("AZURE_CLIENT_SECRET"),
        env("AZURE_TENANT_ID"),
    ) {
        return Box::new(ClientSecretSource {
            http: http.clone(),
            token_url: settings.token_url(&tenant_id),
            client_id,
            client_secret,
            scope: settings.scope.clone(),
        });
    }

    if let (Some(endpoint), Some(secret_header)) = (env("IDENTITY_ENDPOINT"), env("IDENTITY_HEADER")) {
        return Box::new(ManagedIdentitySource {
            http: http.clone(),
            endpoint,
            secret_header,
            resource: settings.resource().to_string(),
        });
    }

    Box::new(AzureCliSource {
        resource: settings.resource().to_string(),
        tenant_id: env("AZURE_TENANT_ID"),
    })
}

// ============================================================================
// Cache
// ============================================================================

/// Process-lifetime bearer token, acquired on first use.
pub struct TokenCache {
    source: Box<dyn TokenSource>,
    token: OnceCell<String>,
}

impl TokenCache {
    pub fn new(source: Box<dyn TokenSource>) -> Self {
        Self {
            source,
            token: OnceCell::new(),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// The cached token, fetching it first if needed. A failed fetch leaves
    /// the cache empty so the next caller tries again.
    pub async fn bearer(&self) -> GraphResult<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                debug!(source = self.source.name(), "Acquiring access token");
                let token = self.source.fetch().await?;
                info!("Acquired access token via {}", self.source.name());
                Ok::<_, GraphError>(token)
            })
            .await?;
        Ok(token.as_str())
    }
}
