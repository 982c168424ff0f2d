//! Error types for provisioning.

use std::fmt;

use thiserror::Error;

/// Directory object kinds the orchestrator creates or reuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Application,
    ServicePrincipal,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Application => write!(f, "application"),
            ObjectKind::ServicePrincipal => write!(f, "service principal"),
        }
    }
}

/// Errors that abort provisioning of a single record.
///
/// None of these stop a batch; the batch runner logs them against the
/// record name and moves on.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The directory refused to create an object.
    #[error("failed to create {kind} for '{name}': HTTP {status}: {message}")]
    Creation {
        kind: ObjectKind,
        name: String,
        status: u16,
        message: String,
    },

    /// An existence lookup matched more than one object.
    #[error("ambiguous directory state: {count} {kind} objects match {filter}")]
    AmbiguousState {
        kind: ObjectKind,
        filter: String,
        count: usize,
    },

    /// An existence lookup returned a non-success status.
    #[error("failed to look up {kind} ({filter}): HTTP {status}: {message}")]
    Lookup {
        kind: ObjectKind,
        filter: String,
        status: u16,
        message: String,
    },

    /// A success response did not carry the fields the next step needs.
    #[error("unexpected {kind} response shape: {source}")]
    MalformedResponse {
        kind: ObjectKind,
        #[source]
        source: serde_json::Error,
    },

    /// A request payload could not be encoded.
    #[error("failed to encode request payload: {0}")]
    Payload(#[source] serde_json::Error),

    /// The request never produced an HTTP response.
    #[error("directory request failed: {0}")]
    Transport(#[from] anyhow::Error),
}
