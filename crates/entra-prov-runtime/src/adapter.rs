use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Status code and decoded body of one directory call.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryResponse {
    pub status: u16,
    /// `Value::Null` for empty bodies (e.g. 204).
    pub body: Value,
}

impl DirectoryResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is one of `expected`.
    pub fn is(&self, expected: &[u16]) -> bool {
        expected.contains(&self.status)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    /// Human-readable failure reason: the OData error message when present,
    /// otherwise the raw body.
    pub fn error_message(&self) -> String {
        if let Some(message) = self
            .body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
        match &self.body {
            Value::Null => String::from("(empty response body)"),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Authenticated transport to the directory REST API.
///
/// Paths are relative to the API base (`/applications`, `/servicePrincipals/{id}`)
/// and may carry a query string. Errors mean no HTTP response was obtained;
/// any response, successful or not, is returned as a [`DirectoryResponse`].
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn get(&self, path: &str) -> anyhow::Result<DirectoryResponse>;

    async fn post(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse>;

    async fn patch(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse>;
}

#[async_trait]
impl<T: DirectoryClient + ?Sized> DirectoryClient for std::sync::Arc<T> {
    async fn get(&self, path: &str) -> anyhow::Result<DirectoryResponse> {
        (**self).get(path).await
    }

    async fn post(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse> {
        (**self).post(path, payload).await
    }

    async fn patch(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse> {
        (**self).patch(path, payload).await
    }
}
