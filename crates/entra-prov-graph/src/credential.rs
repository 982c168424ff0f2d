use std::path::PathBuf;

use crate::error::{GraphError, GraphResult};

/// How the client authenticates to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Discover credentials from the environment: client secret variables,
    /// then managed identity, then the Azure CLI login.
    Ambient,
    /// App registration authenticating with a certificate.
    Certificate {
        client_id: String,
        tenant_id: String,
        certificate_path: PathBuf,
    },
}

impl Credential {
    /// Select a credential from optional certificate parameters.
    ///
    /// All three present selects [`Credential::Certificate`], none selects
    /// [`Credential::Ambient`]. Anything in between is rejected.
    pub fn from_parts(
        client_id: Option<String>,
        tenant_id: Option<String>,
        certificate_path: Option<PathBuf>,
    ) -> GraphResult<Self> {
        match (client_id, tenant_id, certificate_path) {
            (Some(client_id), Some(tenant_id), Some(certificate_path)) => {
                Ok(Credential::Certificate {
                    client_id,
                    tenant_id,
                    certificate_path,
                })
            }
            (None, None, None) => Ok(Credential::Ambient),
            (client_id, tenant_id, certificate_path) => {
                let missing: Vec<&str> = [
                    ("client id", client_id.is_none()),
                    ("tenant id", tenant_id.is_none()),
                    ("certificate path", certificate_path.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(GraphError::Credential(format!(
                    "certificate authentication needs a client id, tenant id and certificate path; missing {}",
                    missing.join(", ")
                )))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Ambient => "ambient",
            Credential::Certificate { .. } => "certificate",
        }
    }
}
