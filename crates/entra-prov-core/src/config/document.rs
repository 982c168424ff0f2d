//! `kind: SAMLServiceProvider` manifest documents.
//!
//! ```yaml
//! apiVersion: entra.provisioner/v1
//! kind: SAMLServiceProvider
//! metadata:
//!   name: Payroll
//!   environment: prod
//! spec:
//!   entityId: https://payroll.example.com/saml
//!   assertionConsumerServiceUrl: https://payroll.example.com/saml/acs
//!   claims:
//!     - name: email
//!       source: user
//!   groupAssignments:
//!     - groupId: 6f1c2f0e-8a57-4c61-9b55-2f1c4b3f3a10
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    CertificateSpec, Claim, ClaimSource, GroupAssignment, ManifestRecord, ManifestVariant,
};

/// Value of `kind` that marks a document as a service provider definition.
pub const SERVICE_PROVIDER_KIND: &str = "SAMLServiceProvider";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderDocument {
    #[serde(default)]
    pub api_version: Option<String>,
    pub kind: String,
    pub metadata: DocumentMetadata,
    pub spec: ServiceProviderSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderSpec {
    pub entity_id: String,
    pub assertion_consumer_service_url: String,
    #[serde(default)]
    pub single_logout_service_url: Option<String>,
    #[serde(default)]
    pub name_id_format: Option<String>,
    #[serde(default)]
    pub signature_algorithm: Option<String>,
    #[serde(default)]
    pub certificate: Option<CertificateSpec>,
    #[serde(default)]
    pub claims: Option<Vec<ClaimEntry>>,
    #[serde(default)]
    pub group_assignments: Option<Vec<GroupAssignmentEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEntry {
    pub name: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignmentEntry {
    pub group_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl ServiceProviderDocument {
    pub fn into_record(self) -> ManifestRecord {
        let spec = self.spec;

        let claims = spec
            .claims
            .unwrap_or_default()
            .into_iter()
            .map(|entry| Claim {
                name: entry.name,
                // The schema only admits "user" or an empty source.
                source: match entry.source.as_deref() {
                    Some("user") => Some(ClaimSource::User),
                    _ => None,
                },
            })
            .collect();

        let group_assignments = spec
            .group_assignments
            .unwrap_or_default()
            .into_iter()
            .map(|entry| GroupAssignment {
                group_id: entry.group_id,
                role: entry.role.filter(|r| !r.trim().is_empty()),
            })
            .collect();

        ManifestRecord {
            variant: ManifestVariant::Current,
            name: self.metadata.name,
            environment: self.metadata.environment,
            description: self.metadata.description,
            entity_id: spec.entity_id,
            additional_identifier_uris: Vec::new(),
            assertion_consumer_service_url: spec.assertion_consumer_service_url,
            additional_reply_urls: Vec::new(),
            single_logout_service_url: non_empty(spec.single_logout_service_url),
            home_page_url: None,
            logo_url: None,
            name_id_format: spec.name_id_format,
            signature_algorithm: spec.signature_algorithm,
            certificate: spec.certificate,
            claims,
            group_assignments,
            owners: Vec::new(),
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
