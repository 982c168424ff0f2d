//! Manifest loading.
//!
//! A manifest file is a YAML stream. Each document is converted to JSON,
//! validated against the embedded JSON Schema for its shape and only then
//! deserialized into typed documents:
//!
//! - `kind: SAMLServiceProvider` documents yield one record each
//! - a document with a top-level `applications:` list is the legacy shape
//!   and yields one record per entry
//! - documents of any other kind are skipped
//!
//! Any failure here is fatal for the whole run; nothing is provisioned from
//! a manifest that does not load cleanly.

pub mod document;
pub mod legacy;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use document::{SERVICE_PROVIDER_KIND, ServiceProviderDocument};
pub use legacy::{LegacyApplication, LegacyManifest};

use crate::ManifestRecord;

/// Embedded JSON schemas, compiled into the binary.
mod embedded_schemas {
    pub const SERVICE_PROVIDER: &str =
        include_str!("../../../../schemas/SAMLServiceProvider.schema.json");
    pub const LEGACY_APPLICATIONS: &str =
        include_str!("../../../../schemas/LegacyApplications.schema.json");
}

/// Error type for manifest loading.
///
/// Document positions are 1-based.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document {document} failed schema validation: {}", errors.join("; "))]
    Schema { document: usize, errors: Vec<String> },

    #[error("document {document}: {message}")]
    Invalid { document: usize, message: String },

    #[error("manifest contains no SAMLServiceProvider documents or applications")]
    Empty,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Load and validate a manifest file.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<Vec<ManifestRecord>, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&content)
}

/// Parse and validate manifest content, returning records in manifest order.
pub fn parse_manifest(content: &str) -> Result<Vec<ManifestRecord>, ConfigError> {
    let validators = Validators::compile()?;
    let mut records: Vec<(usize, ManifestRecord)> = Vec::new();

    for (index, de) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let document = index + 1;
        let value = JsonValue::deserialize(de)?;

        match DocumentShape::of(&value) {
            DocumentShape::Blank => continue,
            DocumentShape::ServiceProvider => {
                validators.service_provider.check(document, &value)?;
                let doc: ServiceProviderDocument = serde_json::from_value(value)?;
                records.push((document, doc.into_record()));
            }
            DocumentShape::Legacy => {
                validators.legacy.check(document, &value)?;
                let manifest: LegacyManifest = serde_json::from_value(value)?;
                for record in manifest.into_records(document)? {
                    records.push((document, record));
                }
            }
            DocumentShape::OtherKind(kind) => {
                debug!(document, kind = %kind, "Skipping manifest document of unrelated kind");
            }
            DocumentShape::Unrecognized => {
                warn!(document, "Skipping manifest document without a kind");
            }
        }
    }

    if records.is_empty() {
        return Err(ConfigError::Empty);
    }

    ensure_unique_names(&records)?;

    Ok(records.into_iter().map(|(_, record)| record).collect())
}

/// Two records with the same display name would be indistinguishable at lookup time.
fn ensure_unique_names(records: &[(usize, ManifestRecord)]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (document, record) in records {
        if !seen.insert(record.name.as_str()) {
            return Err(ConfigError::Invalid {
                document: *document,
                message: format!("duplicate application name '{}'", record.name),
            });
        }
    }
    Ok(())
}

enum DocumentShape {
    Blank,
    ServiceProvider,
    Legacy,
    OtherKind(String),
    Unrecognized,
}

impl DocumentShape {
    fn of(value: &JsonValue) -> Self {
        if value.is_null() {
            return Self::Blank;
        }
        match value.get("kind").and_then(JsonValue::as_str) {
            Some(SERVICE_PROVIDER_KIND) => Self::ServiceProvider,
            Some(other) => Self::OtherKind(other.to_string()),
            None if value.get("applications").is_some() => Self::Legacy,
            // A kind that is present but not a string still goes through the
            // schema so the user gets a precise error.
            None if value.get("kind").is_some() => Self::ServiceProvider,
            None => Self::Unrecognized,
        }
    }
}

struct SchemaCheck {
    validator: jsonschema::Validator,
}

impl SchemaCheck {
    fn compile(name: &str, source: &str) -> Result<Self, ConfigError> {
        let schema: JsonValue = serde_json::from_str(source)
            .map_err(|e| ConfigError::Config(format!("Failed to parse embedded schema {name}: {e}")))?;
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            ConfigError::Config(format!("Failed to compile embedded schema {name}: {e}"))
        })?;
        Ok(Self { validator })
    }

    fn check(&self, document: usize, value: &JsonValue) -> Result<(), ConfigError> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(value)
            .map(|error| {
                let path = error.instance_path().to_string();
                let location = if path.is_empty() { "(root)".to_string() } else { path };
                format!("{location}: {error}")
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Schema { document, errors })
        }
    }
}

struct Validators {
    service_provider: SchemaCheck,
    legacy: SchemaCheck,
}

impl Validators {
    fn compile() -> Result<Self, ConfigError> {
        Ok(Self {
            service_provider: SchemaCheck::compile(
                "SAMLServiceProvider",
                embedded_schemas::SERVICE_PROVIDER,
            )?,
            legacy: SchemaCheck::compile(
                "LegacyApplications",
                embedded_schemas::LEGACY_APPLICATIONS,
            )?,
        })
    }
}
