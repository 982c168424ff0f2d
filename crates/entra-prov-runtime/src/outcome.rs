//! Per-record results and the step failure policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Steps of a provisioning pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    ResolveApplication,
    CreateApplication,
    ConvergeIdentifierUris,
    ResolveServicePrincipal,
    CreateServicePrincipal,
    ConfigureSamlMode,
    AssignOwner,
    ResolveRole,
    AssignGroup,
}

/// What a failed step does to the rest of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Logged and skipped; later steps still run.
    Warning,
    /// Aborts the remaining steps for this record.
    Fatal,
}

impl ProvisionStep {
    /// Failure policy.
    ///
    /// | Step                      | On failure |
    /// |---------------------------|------------|
    /// | resolve / create app      | fatal      |
    /// | converge identifier URIs  | warning    |
    /// | resolve / create SP       | fatal      |
    /// | configure SAML mode       | warning    |
    /// | assign owner              | warning    |
    /// | resolve role              | warning    |
    /// | assign group              | warning    |
    pub fn on_failure(self) -> Severity {
        match self {
            ProvisionStep::ResolveApplication
            | ProvisionStep::CreateApplication
            | ProvisionStep::ResolveServicePrincipal
            | ProvisionStep::CreateServicePrincipal => Severity::Fatal,
            ProvisionStep::ConvergeIdentifierUris
            | ProvisionStep::ConfigureSamlMode
            | ProvisionStep::AssignOwner
            | ProvisionStep::ResolveRole
            | ProvisionStep::AssignGroup => Severity::Warning,
        }
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::ResolveApplication => "resolve application",
            ProvisionStep::CreateApplication => "create application",
            ProvisionStep::ConvergeIdentifierUris => "converge identifier URIs",
            ProvisionStep::ResolveServicePrincipal => "resolve service principal",
            ProvisionStep::CreateServicePrincipal => "create service principal",
            ProvisionStep::ConfigureSamlMode => "configure SAML mode",
            ProvisionStep::AssignOwner => "assign owner",
            ProvisionStep::ResolveRole => "resolve role",
            ProvisionStep::AssignGroup => "assign group",
        };
        f.write_str(name)
    }
}

/// A recoverable step failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWarning {
    pub step: ProvisionStep,
    /// What the step acted on (object id, owner id, group id, role name).
    pub target: String,
    /// HTTP status, absent when the request itself failed.
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for StepWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} [{}]: HTTP {}: {}", self.step, self.target, status, self.message),
            None => write!(f, "{} [{}]: {}", self.step, self.target, self.message),
        }
    }
}

/// Stable identity of a provisioned application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResult {
    /// Client id assigned by the directory.
    pub app_id: String,
    /// Application object id.
    pub object_id: String,
    pub service_principal_id: String,
}

impl fmt::Display for ProvisionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appId={} objectId={} servicePrincipalId={}",
            self.app_id, self.object_id, self.service_principal_id
        )
    }
}

/// Everything one provisioning pass produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub result: ProvisionResult,
    pub application_created: bool,
    pub service_principal_created: bool,
    pub warnings: Vec<StepWarning>,
}
