//! # entra-prov-core
//!
//! Desired-state model for SAML enterprise application registrations.
//!
//! A manifest is loaded once per run and turned into an ordered list of
//! [`ManifestRecord`]s. Each record describes one application: its identity
//! (display name and SAML entity id), endpoints, emitted claims and the
//! relationships (owners or group role assignments) it should end up with.
//!
//! Two manifest shapes are understood, see [`config`]:
//!
//! - **current**: a YAML stream of `kind: SAMLServiceProvider` documents
//! - **legacy**: one document with a top-level `applications:` list

use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{ConfigError, load_manifest, parse_manifest};

/// Placeholder that may appear inside an entity id and is replaced with the
/// client id the directory assigns at creation.
pub const APP_ID_PLACEHOLDER: &str = "{appId}";

/// Which manifest shape a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestVariant {
    /// `kind: SAMLServiceProvider` documents. Relationships are group role assignments.
    Current,
    /// Top-level `applications:` list. Relationships are owners.
    Legacy,
}

/// Source attribute of an emitted claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimSource {
    User,
}

/// A claim emitted in the SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub name: String,
    /// `None` when the manifest leaves the source empty or unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ClaimSource>,
}

/// Grant of access to a directory group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    /// Directory object id of the group.
    pub group_id: String,
    /// App role id or role value; the default access role is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Signing certificate declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSpec {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<String>,
}

/// Immutable desired state of one SAML service provider.
///
/// `entity_id` and `assertion_consumer_service_url` are never empty once a
/// record has been produced by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub variant: ManifestVariant,

    /// Application display name, used as the primary lookup key.
    pub name: String,
    pub environment: Option<String>,
    pub description: Option<String>,

    /// SAML entity id, registered as the first identifier URI.
    pub entity_id: String,
    pub additional_identifier_uris: Vec<String>,

    /// Primary reply (ACS) URL.
    pub assertion_consumer_service_url: String,
    pub additional_reply_urls: Vec<String>,

    pub single_logout_service_url: Option<String>,
    pub home_page_url: Option<String>,
    pub logo_url: Option<String>,

    pub name_id_format: Option<String>,
    pub signature_algorithm: Option<String>,
    pub certificate: Option<CertificateSpec>,

    pub claims: Vec<Claim>,
    pub group_assignments: Vec<GroupAssignment>,
    /// Owner object ids or principal names (legacy manifests only).
    pub owners: Vec<String>,
}

impl ManifestRecord {
    /// Whether the entity id embeds the server-assigned client id.
    pub fn entity_id_is_templated(&self) -> bool {
        self.entity_id.contains(APP_ID_PLACEHOLDER)
    }

    /// Identifier URIs the application should carry once `app_id` is known.
    pub fn identifier_uris_for(&self, app_id: &str) -> Vec<String> {
        std::iter::once(&self.entity_id)
            .chain(self.additional_identifier_uris.iter())
            .map(|uri| uri.replace(APP_ID_PLACEHOLDER, app_id))
            .collect()
    }

    /// Identifier URIs that can be sent before the client id exists.
    ///
    /// Templated URIs are left out; they are converged after creation.
    pub fn concrete_identifier_uris(&self) -> Vec<String> {
        std::iter::once(&self.entity_id)
            .chain(self.additional_identifier_uris.iter())
            .filter(|uri| !uri.contains(APP_ID_PLACEHOLDER))
            .cloned()
            .collect()
    }

    /// All reply URLs, ACS first.
    pub fn reply_urls(&self) -> Vec<String> {
        std::iter::once(&self.assertion_consumer_service_url)
            .chain(self.additional_reply_urls.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> ManifestRecord {
    ManifestRecord {
        variant: ManifestVariant::Current,
        name: "Test App".to_string(),
        environment: None,
        description: None,
        entity_id: "api://test".to_string(),
        additional_identifier_uris: Vec::new(),
        assertion_consumer_service_url: "https://test.com/acs".to_string(),
        additional_reply_urls: Vec::new(),
        single_logout_service_url: None,
        home_page_url: None,
        logo_url: None,
        name_id_format: None,
        signature_algorithm: None,
        certificate: None,
        claims: Vec::new(),
        group_assignments: Vec::new(),
        owners: Vec::new(),
    }
}
