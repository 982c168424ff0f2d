//! In-memory directory used by the provisioning tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use entra_prov_core::{Claim, ClaimSource, GroupAssignment, ManifestRecord, ManifestVariant};
use entra_prov_runtime::{DirectoryClient, DirectoryResponse};
use serde_json::{Value, json};

/// One request seen by the fake.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub payload: Option<Value>,
}

type FailureRule = Box<dyn Fn(&Call) -> Option<FakeFailure> + Send + Sync>;

pub enum FakeFailure {
    Status(u16, &'static str),
    Transport(&'static str),
}

#[derive(Default)]
struct State {
    applications: Vec<Value>,
    service_principals: Vec<Value>,
    role_assignments: Vec<Value>,
    owner_refs: Vec<(String, String)>,
    calls: Vec<Call>,
    next_id: usize,
}

/// Directory that behaves like the Graph endpoints provisioning uses.
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<State>,
    failures: Vec<FailureRule>,
    app_roles: Vec<Value>,
    /// Drop `identifierUris` from creation responses, as when the directory
    /// defers them.
    omit_identifier_uris: bool,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application(self, id: &str, app_id: &str, display_name: &str, uris: &[&str]) -> Self {
        self.state.lock().unwrap().applications.push(json!({
            "id": id,
            "appId": app_id,
            "displayName": display_name,
            "identifierUris": uris,
        }));
        self
    }

    pub fn with_service_principal(self, id: &str, app_id: &str) -> Self {
        self.state.lock().unwrap().service_principals.push(json!({
            "id": id,
            "appId": app_id,
            "appRoles": self.app_roles.clone(),
            "tags": [],
        }));
        self
    }

    /// App roles published by service principals created afterwards.
    pub fn with_app_roles(mut self, roles: Value) -> Self {
        self.app_roles = roles.as_array().cloned().unwrap_or_default();
        self
    }

    pub fn omitting_identifier_uris(mut self) -> Self {
        self.omit_identifier_uris = true;
        self
    }

    pub fn fail_when(
        mut self,
        rule: impl Fn(&Call) -> Option<FakeFailure> + Send + Sync + 'static,
    ) -> Self {
        self.failures.push(Box::new(rule));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: &str, path_suffix: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path.split('?').next().unwrap().ends_with(path_suffix))
            .collect()
    }

    pub fn application_count(&self) -> usize {
        self.state.lock().unwrap().applications.len()
    }

    pub fn service_principal_count(&self) -> usize {
        self.state.lock().unwrap().service_principals.len()
    }

    pub fn application(&self, id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .applications
            .iter()
            .find(|a| a["id"] == id)
            .cloned()
    }

    pub fn service_principal(&self, id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .service_principals
            .iter()
            .find(|s| s["id"] == id)
            .cloned()
    }

    pub fn role_assignments(&self) -> Vec<Value> {
        self.state.lock().unwrap().role_assignments.clone()
    }

    pub fn owner_refs(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().owner_refs.clone()
    }

    fn handle(&self, call: Call) -> anyhow::Result<DirectoryResponse> {
        for rule in &self.failures {
            match rule(&call) {
                Some(FakeFailure::Status(status, message)) => {
                    self.state.lock().unwrap().calls.push(call);
                    return Ok(DirectoryResponse::new(
                        status,
                        json!({ "error": { "code": "Injected", "message": message } }),
                    ));
                }
                Some(FakeFailure::Transport(message)) => {
                    self.state.lock().unwrap().calls.push(call);
                    anyhow::bail!("{message}");
                }
                None => {}
            }
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());

        let (path, query) = match call.path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (call.path.clone(), None),
        };
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let payload = call.payload.clone().unwrap_or(Value::Null);

        let response = match (call.method, segments.as_slice()) {
            ("GET", [collection]) => {
                let filter = query
                    .as_deref()
                    .and_then(|q| q.strip_prefix("$filter="))
                    .map(|f| urlencoding::decode(f).unwrap().into_owned())
                    .unwrap_or_default();
                let items = match *collection {
                    "applications" => &state.applications,
                    "servicePrincipals" => &state.service_principals,
                    _ => return Ok(DirectoryResponse::new(404, Value::Null)),
                };
                let value: Vec<Value> = items.iter().filter(|i| matches_filter(i, &filter)).cloned().collect();
                DirectoryResponse::new(200, json!({ "value": value }))
            }
            ("POST", ["applications"]) => {
                state.next_id += 1;
                let n = state.next_id;
                let mut app = payload;
                app["id"] = json!(format!("app-obj-{n}"));
                app["appId"] = json!(format!("client-id-{n}"));
                if app.get("identifierUris").is_none() {
                    app["identifierUris"] = json!([]);
                }
                state.applications.push(app.clone());
                if self.omit_identifier_uris {
                    app["identifierUris"] = json!([]);
                }
                DirectoryResponse::new(201, app)
            }
            ("POST", ["servicePrincipals"]) => {
                state.next_id += 1;
                let n = state.next_id;
                let sp = json!({
                    "id": format!("sp-obj-{n}"),
                    "appId": payload["appId"],
                    "appRoles": self.app_roles.clone(),
                    "tags": [],
                });
                state.service_principals.push(sp.clone());
                DirectoryResponse::new(201, sp)
            }
            ("PATCH", [collection, id]) => {
                let items = match *collection {
                    "applications" => &mut state.applications,
                    "servicePrincipals" => &mut state.service_principals,
                    _ => return Ok(DirectoryResponse::new(404, Value::Null)),
                };
                match items.iter_mut().find(|i| i["id"] == *id) {
                    Some(item) => {
                        if let Some(fields) = payload.as_object() {
                            for (k, v) in fields {
                                item[k] = v.clone();
                            }
                        }
                        DirectoryResponse::new(204, Value::Null)
                    }
                    None => DirectoryResponse::new(404, Value::Null),
                }
            }
            ("POST", [_, id, "owners", "$ref"]) => {
                let owner = payload["@odata.id"].as_str().unwrap_or_default().to_string();
                let edge = (id.to_string(), owner);
                if state.owner_refs.contains(&edge) {
                    DirectoryResponse::new(
                        400,
                        json!({ "error": { "message": "One or more added object references already exist for the following modified properties: 'owners'." } }),
                    )
                } else {
                    state.owner_refs.push(edge);
                    DirectoryResponse::new(204, Value::Null)
                }
            }
            ("POST", ["servicePrincipals", _, "appRoleAssignedTo"]) => {
                let duplicate = state.role_assignments.iter().any(|a| {
                    a["principalId"] == payload["principalId"]
                        && a["resourceId"] == payload["resourceId"]
                        && a["appRoleId"] == payload["appRoleId"]
                });
                if duplicate {
                    DirectoryResponse::new(
                        400,
                        json!({ "error": { "message": "Permission being assigned already exists on the object" } }),
                    )
                } else {
                    state.role_assignments.push(payload.clone());
                    DirectoryResponse::new(201, payload)
                }
            }
            _ => DirectoryResponse::new(404, Value::Null),
        };

        Ok(response)
    }
}

fn matches_filter(item: &Value, filter: &str) -> bool {
    fn literal(s: &str) -> String {
        s.trim_end_matches(')')
            .trim_start_matches('\'')
            .trim_end_matches('\'')
            .replace("''", "'")
    }

    if let Some(rest) = filter.strip_prefix("displayName eq ") {
        item["displayName"] == literal(rest)
    } else if let Some(rest) = filter.strip_prefix("appId eq ") {
        item["appId"] == literal(rest)
    } else if let Some(rest) = filter.strip_prefix("identifierUris/any(x:x eq ") {
        let wanted = literal(rest);
        item["identifierUris"]
            .as_array()
            .map(|uris| uris.iter().any(|u| u == &wanted))
            .unwrap_or(false)
    } else {
        true
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn get(&self, path: &str) -> anyhow::Result<DirectoryResponse> {
        self.handle(Call {
            method: "GET",
            path: path.to_string(),
            payload: None,
        })
    }

    async fn post(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse> {
        self.handle(Call {
            method: "POST",
            path: path.to_string(),
            payload: Some(payload.clone()),
        })
    }

    async fn patch(&self, path: &str, payload: &Value) -> anyhow::Result<DirectoryResponse> {
        self.handle(Call {
            method: "PATCH",
            path: path.to_string(),
            payload: Some(payload.clone()),
        })
    }
}

/// The record used throughout the scenarios: one claim, one group.
pub fn test_app_record() -> ManifestRecord {
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
        claims: vec![Claim {
            name: "email".to_string(),
            source: Some(ClaimSource::User),
        }],
        group_assignments: vec![GroupAssignment {
            group_id: "group-guid".to_string(),
            role: None,
        }],
        owners: Vec::new(),
    }
}

pub fn named_record(name: &str) -> ManifestRecord {
    ManifestRecord {
        name: name.to_string(),
        entity_id: format!("api://{}", name.to_lowercase().replace(' ', "-")),
        claims: Vec::new(),
        group_assignments: Vec::new(),
        ..test_app_record()
    }
}
