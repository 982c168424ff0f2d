use std::fmt;
use std::str::FromStr;

use entra_prov_core::ManifestRecord;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapter::{DirectoryClient, DirectoryResponse};
use crate::directory::{
    AppRoleAssignmentCreate, Application, ApplicationCreate, CREATED, Collection,
    IdentifierUrisUpdate, OK, ObjectReference, OptionalClaim, OptionalClaims, REFERENCE_ADDED,
    SamlModeUpdate, ServicePrincipal, ServicePrincipalCreate, UPDATED, WebSettings, filter_path,
    odata_literal,
};
use crate::error::{ObjectKind, ProvisionError};
use crate::outcome::{ProvisionOutcome, ProvisionResult, ProvisionStep, Severity, StepWarning};

pub const DEFAULT_SIGN_IN_AUDIENCE: &str = "AzureADMyOrg";
/// Tag that makes a non-gallery application show up as a custom SAML app.
pub const CUSTOM_SSO_TAG: &str = "WindowsAzureActiveDirectoryCustomSingleSignOnApplication";
pub const SAML_MODE: &str = "saml";
pub const DEFAULT_DIRECTORY_OBJECT_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Which `web` field the manifest's single logout URL is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogoutUrlField {
    #[default]
    LogoutUrl,
    HomePageUrl,
    Both,
}

impl FromStr for LogoutUrlField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logout-url" | "logoutUrl" => Ok(LogoutUrlField::LogoutUrl),
            "home-page-url" | "homePageUrl" => Ok(LogoutUrlField::HomePageUrl),
            "both" => Ok(LogoutUrlField::Both),
            other => Err(format!(
                "unknown logout URL field '{other}' (expected logout-url, home-page-url or both)"
            )),
        }
    }
}

impl fmt::Display for LogoutUrlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoutUrlField::LogoutUrl => write!(f, "logout-url"),
            LogoutUrlField::HomePageUrl => write!(f, "home-page-url"),
            LogoutUrlField::Both => write!(f, "both"),
        }
    }
}

/// Knobs for payload construction.
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub sign_in_audience: String,
    pub saml_tag: String,
    /// App role used for group assignments without a resolvable role.
    pub default_role_id: Uuid,
    pub logout_url_field: LogoutUrlField,
    /// Prefix of `@odata.id` references in owner adds.
    pub directory_object_base: String,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            sign_in_audience: DEFAULT_SIGN_IN_AUDIENCE.to_string(),
            saml_tag: CUSTOM_SSO_TAG.to_string(),
            default_role_id: Uuid::nil(),
            logout_url_field: LogoutUrlField::default(),
            directory_object_base: DEFAULT_DIRECTORY_OBJECT_BASE.to_string(),
        }
    }
}

pub struct Orchestrator<C: DirectoryClient> {
    client: C,
    settings: ProvisionSettings,
}

impl<C: DirectoryClient> Orchestrator<C> {
    pub fn new(client: C) -> Self {
        Self::with_settings(client, ProvisionSettings::default())
    }

    pub fn with_settings(client: C, settings: ProvisionSettings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create or reuse the application and service principal for `record`,
    /// then converge SAML configuration and relationships.
    ///
    /// Steps run strictly in order. Lookup-then-create is not atomic: two
    /// concurrent passes for the same record can both see "not found" and
    /// both create, so concurrent callers must serialize per entity id.
    #[instrument(skip(self, record), fields(app = %record.name, entity_id = %record.entity_id))]
    pub async fn provision(
        &self,
        record: &ManifestRecord,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let mut pass = Pass {
            client: &self.client,
            settings: &self.settings,
            record,
            warnings: Vec::new(),
        };

        let (application, application_created) = match pass.find_application().await? {
            Some(existing) => {
                info!(
                    object_id = %existing.id,
                    app_id = %existing.app_id,
                    "Reusing existing application"
                );
                (existing, false)
            }
            None => (pass.create_application().await?, true),
        };

        if application_created {
            pass.converge_identifier_uris(&application).await?;
        }

        let (service_principal, service_principal_created) =
            match pass.find_service_principal(&application).await? {
                Some(existing) => {
                    info!(sp_id = %existing.id, "Reusing existing service principal");
                    (existing, false)
                }
                None => (pass.create_service_principal(&application).await?, true),
            };

        pass.configure_saml_mode(&service_principal).await?;
        pass.assign_owners(&application, &service_principal).await?;
        pass.assign_groups(&service_principal).await?;

        Ok(ProvisionOutcome {
            result: ProvisionResult {
                app_id: application.app_id,
                object_id: application.id,
                service_principal_id: service_principal.id,
            },
            application_created,
            service_principal_created,
            warnings: pass.warnings,
        })
    }
}

enum Failure {
    Status { status: u16, message: String },
    Transport(anyhow::Error),
    Unresolved(String),
}

impl Failure {
    fn from_response(response: &DirectoryResponse) -> Self {
        Failure::Status {
            status: response.status,
            message: response.error_message(),
        }
    }
}

/// State of one provisioning pass over a single record.
struct Pass<'a, C: ?Sized> {
    client: &'a C,
    settings: &'a ProvisionSettings,
    record: &'a ManifestRecord,
    warnings: Vec<StepWarning>,
}

impl<'a, C: DirectoryClient + ?Sized> Pass<'a, C> {
    // =========================================================================
    // Step 1: application
    // =========================================================================

    async fn find_application(&mut self) -> Result<Option<Application>, ProvisionError> {
        let record = self.record;

        let by_name = format!("displayName eq '{}'", odata_literal(&record.name));
        if let Some(found) = self
            .find_one(ProvisionStep::ResolveApplication, ObjectKind::Application, "applications", by_name)
            .await?
        {
            return Ok(Some(found));
        }

        if record.entity_id_is_templated() {
            return Ok(None);
        }

        let by_uri = format!(
            "identifierUris/any(x:x eq '{}')",
            odata_literal(&record.entity_id)
        );
        self.find_one(ProvisionStep::ResolveApplication, ObjectKind::Application, "applications", by_uri)
            .await
    }

    async fn create_application(&mut self) -> Result<Application, ProvisionError> {
        let record = self.record;
        let slo = record.single_logout_service_url.clone();
        let home = record.home_page_url.clone();

        let (logout_url, home_page_url) = match self.settings.logout_url_field {
            LogoutUrlField::LogoutUrl => (slo, home),
            LogoutUrlField::HomePageUrl => (None, home.or(slo)),
            LogoutUrlField::Both => (slo.clone(), home.or(slo)),
        };

        let optional_claims = (!record.claims.is_empty()).then(|| OptionalClaims {
            saml2_token: record
                .claims
                .iter()
                .map(|claim| OptionalClaim {
                    name: claim.name.clone(),
                    source: claim.source,
                    essential: false,
                })
                .collect(),
        });

        if record.name_id_format.is_some()
            || record.signature_algorithm.is_some()
            || record.certificate.is_some()
            || record.logo_url.is_some()
        {
            debug!("Name ID format, signature algorithm, certificate and logo are not applied");
        }

        let payload = to_payload(&ApplicationCreate {
            display_name: record.name.clone(),
            sign_in_audience: self.settings.sign_in_audience.clone(),
            description: record.description.clone(),
            web: WebSettings {
                redirect_uris: record.reply_urls(),
                logout_url,
                home_page_url,
            },
            identifier_uris: record.concrete_identifier_uris(),
            optional_claims,
        })?;

        info!("Creating application: {}", record.name);
        let sent = self.client.post("/applications", &payload).await;
        let response = self.require(ProvisionStep::CreateApplication, &record.name, sent, CREATED)?;
        let created: Application = parse(&response, ObjectKind::Application)?;

        info!(
            object_id = %created.id,
            app_id = %created.app_id,
            "Created application registration"
        );
        Ok(created)
    }

    // =========================================================================
    // Step 2: identifier URIs
    // =========================================================================

    async fn converge_identifier_uris(&mut self, app: &Application) -> Result<(), ProvisionError> {
        let desired = self.record.identifier_uris_for(&app.app_id);
        if desired.iter().all(|uri| app.identifier_uris.contains(uri)) {
            debug!("Identifier URIs already converged");
            return Ok(());
        }

        info!(identifier_uris = ?desired, "Converging identifier URIs");
        let payload = to_payload(&IdentifierUrisUpdate {
            identifier_uris: desired,
        })?;
        let sent = self
            .client
            .patch(&format!("/applications/{}", app.id), &payload)
            .await;
        self.check(ProvisionStep::ConvergeIdentifierUris, &app.id, sent, UPDATED)?;
        Ok(())
    }

    // =========================================================================
    // Step 3: service principal
    // =========================================================================

    async fn find_service_principal(
        &mut self,
        app: &Application,
    ) -> Result<Option<ServicePrincipal>, ProvisionError> {
        let by_app_id = format!("appId eq '{}'", odata_literal(&app.app_id));
        self.find_one(
            ProvisionStep::ResolveServicePrincipal,
            ObjectKind::ServicePrincipal,
            "servicePrincipals",
            by_app_id,
        )
        .await
    }

    async fn create_service_principal(
        &mut self,
        app: &Application,
    ) -> Result<ServicePrincipal, ProvisionError> {
        let payload = to_payload(&ServicePrincipalCreate {
            app_id: app.app_id.clone(),
        })?;

        info!("Creating service principal for {}", self.record.name);
        let sent = self.client.post("/servicePrincipals", &payload).await;
        let response = self.require(ProvisionStep::CreateServicePrincipal, &app.app_id, sent, CREATED)?;
        let created: ServicePrincipal = parse(&response, ObjectKind::ServicePrincipal)?;

        info!(sp_id = %created.id, "Created service principal");
        Ok(created)
    }

    // =========================================================================
    // Step 4: SAML mode
    // =========================================================================

    async fn configure_saml_mode(&mut self, sp: &ServicePrincipal) -> Result<(), ProvisionError> {
        let mut tags = sp.tags.clone();
        if !tags.contains(&self.settings.saml_tag) {
            tags.push(self.settings.saml_tag.clone());
        }
        let payload = to_payload(&SamlModeUpdate {
            preferred_single_sign_on_mode: SAML_MODE.to_string(),
            tags,
        })?;

        info!("Configuring SAML mode for {}", self.record.name);
        let sent = self
            .client
            .patch(&format!("/servicePrincipals/{}", sp.id), &payload)
            .await;
        self.check(ProvisionStep::ConfigureSamlMode, &sp.id, sent, UPDATED)?;
        Ok(())
    }

    // =========================================================================
    // Step 5: owners
    // =========================================================================

    async fn assign_owners(
        &mut self,
        app: &Application,
        sp: &ServicePrincipal,
    ) -> Result<(), ProvisionError> {
        let record = self.record;
        let client = self.client;

        for owner in &record.owners {
            let payload = to_payload(&ObjectReference {
                odata_id: self.owner_reference(owner),
            })?;

            for (collection, object_id) in [("applications", &app.id), ("servicePrincipals", &sp.id)] {
                info!("Adding owner {owner} to {collection}/{object_id}");
                let path = format!("/{collection}/{object_id}/owners/$ref");
                let sent = client.post(&path, &payload).await;
                if already_present(&sent) {
                    info!("Owner {owner} already present on {collection}/{object_id}");
                    continue;
                }
                self.check(ProvisionStep::AssignOwner, owner, sent, REFERENCE_ADDED)?;
            }
        }
        Ok(())
    }

    /// Principal names are addressed through `users/`, object ids through `directoryObjects/`.
    fn owner_reference(&self, owner: &str) -> String {
        let base = self.settings.directory_object_base.trim_end_matches('/');
        if owner.contains('@') {
            format!("{base}/users/{owner}")
        } else {
            format!("{base}/directoryObjects/{owner}")
        }
    }

    // =========================================================================
    // Step 6: group role assignments
    // =========================================================================

    async fn assign_groups(&mut self, sp: &ServicePrincipal) -> Result<(), ProvisionError> {
        let record = self.record;
        let client = self.client;
        let path = format!("/servicePrincipals/{}/appRoleAssignedTo", sp.id);

        for assignment in &record.group_assignments {
            let app_role_id = self.resolve_role(sp, assignment.role.as_deref());
            let payload = to_payload(&AppRoleAssignmentCreate {
                principal_id: assignment.group_id.clone(),
                resource_id: sp.id.clone(),
                app_role_id: app_role_id.clone(),
            })?;

            info!(role = %app_role_id, "Assigning group {} to {}", assignment.group_id, record.name);
            let sent = client.post(&path, &payload).await;
            if already_present(&sent) {
                info!("Group {} already assigned", assignment.group_id);
                continue;
            }
            self.check(ProvisionStep::AssignGroup, &assignment.group_id, sent, CREATED)?;
        }
        Ok(())
    }

    fn resolve_role(&mut self, sp: &ServicePrincipal, role: Option<&str>) -> String {
        let default = self.settings.default_role_id.to_string();
        let Some(role) = role else {
            return default;
        };

        if let Ok(id) = Uuid::parse_str(role) {
            return id.to_string();
        }
        if let Some(found) = sp.find_role(role) {
            return found.id.clone();
        }

        self.warn(
            ProvisionStep::ResolveRole,
            role,
            Failure::Unresolved(format!(
                "no app role '{role}' on service principal {}, using default access role",
                sp.id
            )),
        );
        default
    }

    // =========================================================================
    // Shared
    // =========================================================================

    async fn find_one<T: DeserializeOwned>(
        &mut self,
        step: ProvisionStep,
        kind: ObjectKind,
        collection: &str,
        filter: String,
    ) -> Result<Option<T>, ProvisionError> {
        let path = filter_path(collection, &filter);
        debug!(%path, "Looking up existing {kind}");

        let sent = self.client.get(&path).await;
        let Some(response) = self.check(step, &filter, sent, OK)? else {
            return Ok(None);
        };

        let mut found = parse::<Collection<T>>(&response, kind)?.value;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(ProvisionError::AmbiguousState {
                kind,
                filter,
                count,
            }),
        }
    }

    /// Accept an expected response or apply the step's failure policy.
    ///
    /// `Ok(None)` means the failure was recoverable and has been recorded.
    fn check(
        &mut self,
        step: ProvisionStep,
        target: &str,
        sent: anyhow::Result<DirectoryResponse>,
        expected: &[u16],
    ) -> Result<Option<DirectoryResponse>, ProvisionError> {
        let failure = match sent {
            Ok(response) if response.is(expected) => return Ok(Some(response)),
            Ok(response) => Failure::from_response(&response),
            Err(err) => Failure::Transport(err),
        };

        match step.on_failure() {
            Severity::Fatal => Err(self.fatal(step, target, failure)),
            Severity::Warning => {
                self.warn(step, target, failure);
                Ok(None)
            }
        }
    }

    /// Like [`Self::check`] for steps whose result the pass cannot do without.
    fn require(
        &mut self,
        step: ProvisionStep,
        target: &str,
        sent: anyhow::Result<DirectoryResponse>,
        expected: &[u16],
    ) -> Result<DirectoryResponse, ProvisionError> {
        match sent {
            Ok(response) if response.is(expected) => Ok(response),
            Ok(response) => Err(self.fatal(step, target, Failure::from_response(&response))),
            Err(err) => Err(self.fatal(step, target, Failure::Transport(err))),
        }
    }

    fn fatal(&self, step: ProvisionStep, target: &str, failure: Failure) -> ProvisionError {
        let (status, message) = match failure {
            Failure::Transport(err) => return ProvisionError::Transport(err),
            Failure::Status { status, message } => (status, message),
            Failure::Unresolved(message) => (0, message),
        };

        match step {
            ProvisionStep::CreateApplication => ProvisionError::Creation {
                kind: ObjectKind::Application,
                name: self.record.name.clone(),
                status,
                message,
            },
            ProvisionStep::CreateServicePrincipal => ProvisionError::Creation {
                kind: ObjectKind::ServicePrincipal,
                name: self.record.name.clone(),
                status,
                message,
            },
            ProvisionStep::ResolveServicePrincipal => ProvisionError::Lookup {
                kind: ObjectKind::ServicePrincipal,
                filter: target.to_string(),
                status,
                message,
            },
            _ => ProvisionError::Lookup {
                kind: ObjectKind::Application,
                filter: target.to_string(),
                status,
                message,
            },
        }
    }

    fn warn(&mut self, step: ProvisionStep, target: &str, failure: Failure) {
        let (status, message) = match failure {
            Failure::Status { status, message } => (Some(status), message),
            Failure::Transport(err) => (None, format!("{err:#}")),
            Failure::Unresolved(message) => (None, message),
        };
        let warning = StepWarning {
            step,
            target: target.to_string(),
            status,
            message,
        };
        warn!(step = %step, object = %target, "Failed to {}", warning);
        self.warnings.push(warning);
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, ProvisionError> {
    serde_json::to_value(value).map_err(ProvisionError::Payload)
}

fn parse<T: DeserializeOwned>(
    response: &DirectoryResponse,
    kind: ObjectKind,
) -> Result<T, ProvisionError> {
    response
        .parse()
        .map_err(|source| ProvisionError::MalformedResponse { kind, source })
}

/// The directory rejected a reference or assignment because the edge exists.
fn already_present(sent: &anyhow::Result<DirectoryResponse>) -> bool {
    match sent {
        Ok(response) if matches!(response.status, 400 | 409) => response
            .error_message()
            .to_ascii_lowercase()
            .contains("already exist"),
        _ => false,
    }
}
