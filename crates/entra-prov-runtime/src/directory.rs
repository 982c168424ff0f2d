//! Typed directory objects and request payloads.
//!
//! Responses are decoded into these structs at the seam so the orchestrator
//! never branches on loosely-typed JSON. Only the fields provisioning reads
//! are modelled; everything else the directory returns is ignored.

use entra_prov_core::ClaimSource;
use serde::{Deserialize, Serialize};

/// Expected status for object creation.
pub const CREATED: &[u16] = &[201];
/// Expected status for partial updates.
pub const UPDATED: &[u16] = &[204];
/// Expected status for reference adds; some directories answer 201.
pub const REFERENCE_ADDED: &[u16] = &[204, 201];
/// Expected status for queries.
pub const OK: &[u16] = &[200];

/// Collection response (`{"value": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    pub value: Vec<T>,
}

/// Application registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Object id.
    pub id: String,
    /// Client id, assigned at creation.
    pub app_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub identifier_uris: Vec<String>,
}

/// App role published by an application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRole {
    pub id: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Tenant-local instance of an application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    pub id: String,
    pub app_id: String,
    #[serde(default)]
    pub app_roles: Vec<AppRole>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub preferred_single_sign_on_mode: Option<String>,
}

impl ServicePrincipal {
    /// App role whose value or display name equals `name`.
    pub fn find_role(&self, name: &str) -> Option<&AppRole> {
        self.app_roles.iter().find(|role| {
            role.value.as_deref() == Some(name) || role.display_name.as_deref() == Some(name)
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCreate {
    pub display_name: String,
    pub sign_in_audience: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub web: WebSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifier_uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_claims: Option<OptionalClaims>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSettings {
    pub redirect_uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalClaims {
    pub saml2_token: Vec<OptionalClaim>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionalClaim {
    pub name: String,
    /// Serialized as `null` when unset.
    pub source: Option<ClaimSource>,
    pub essential: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierUrisUpdate {
    pub identifier_uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalCreate {
    pub app_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlModeUpdate {
    pub preferred_single_sign_on_mode: String,
    pub tags: Vec<String>,
}

/// Body of a `.../owners/$ref` call.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectReference {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleAssignmentCreate {
    /// The group being granted access.
    pub principal_id: String,
    /// The service principal exposing the role.
    pub resource_id: String,
    pub app_role_id: String,
}

/// Quote a value as an OData string literal body (single quotes doubled).
pub fn odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// `/{collection}?$filter=...` with the filter percent-encoded.
pub fn filter_path(collection: &str, filter: &str) -> String {
    format!("/{}?$filter={}", collection, urlencoding::encode(filter))
}
