//! Legacy manifest shape: one document with an `applications:` list.
//!
//! ```yaml
//! applications:
//!   - name: Payroll
//!     identifier_uris: ["https://payroll.example.com/saml"]
//!     reply_urls: ["https://payroll.example.com/saml/acs"]
//!     owners: ["3f1a9c7e-0000-4000-8000-000000000001"]
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::document::non_empty;
use crate::{ManifestRecord, ManifestVariant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyManifest {
    pub applications: Vec<LegacyApplication>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyApplication {
    pub name: String,
    #[serde(default)]
    pub identifier_uris: Vec<String>,
    #[serde(default)]
    pub reply_urls: Vec<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub sign_on_url: Option<String>,
    #[serde(default)]
    pub logout_url: Option<String>,
}

impl LegacyManifest {
    /// Convert every application entry; `document` is the 1-based position in the stream.
    pub fn into_records(self, document: usize) -> Result<Vec<ManifestRecord>, ConfigError> {
        self.applications
            .into_iter()
            .map(|app| app.into_record(document))
            .collect()
    }
}

impl LegacyApplication {
    fn into_record(self, document: usize) -> Result<ManifestRecord, ConfigError> {
        let mut identifier_uris = self.identifier_uris.into_iter();
        let entity_id = identifier_uris.next().ok_or_else(|| ConfigError::Invalid {
            document,
            message: format!("application '{}' has no identifier_uris", self.name),
        })?;

        let mut reply_urls = self.reply_urls.into_iter();
        let acs = reply_urls.next().ok_or_else(|| ConfigError::Invalid {
            document,
            message: format!("application '{}' has no reply_urls", self.name),
        })?;

        Ok(ManifestRecord {
            variant: ManifestVariant::Legacy,
            name: self.name,
            environment: None,
            description: None,
            entity_id,
            additional_identifier_uris: identifier_uris.collect(),
            assertion_consumer_service_url: acs,
            additional_reply_urls: reply_urls.collect(),
            single_logout_service_url: non_empty(self.logout_url),
            home_page_url: non_empty(self.sign_on_url),
            logo_url: non_empty(self.logo_url),
            name_id_format: None,
            signature_algorithm: None,
            certificate: None,
            claims: Vec::new(),
            group_assignments: Vec::new(),
            owners: self.owners,
        })
    }
}
