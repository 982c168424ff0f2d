//! # entra-prov-runtime
//!
//! Idempotent provisioning of SAML enterprise applications.
//!
//! For each [`ManifestRecord`](entra_prov_core::ManifestRecord) the
//! [`Orchestrator`] runs a fixed sequence of steps against a
//! [`DirectoryClient`]:
//!
//! 1. find the application by display name (then by entity id), or create it
//! 2. converge identifier URIs on a freshly created application
//! 3. find the service principal by client id, or create it
//! 4. switch the service principal to SAML single sign-on
//! 5. add owners (legacy manifests)
//! 6. assign groups to an app role
//!
//! Steps 1 and 3 are fatal for the record when they fail; every other step
//! degrades to a [`StepWarning`] (see [`ProvisionStep::on_failure`]). The
//! [`BatchRunner`] walks a manifest in order and never stops on a failed
//! record.

pub mod adapter;
pub mod batch;
pub mod directory;
pub mod error;
pub mod orchestrator;
pub mod outcome;

pub use adapter::{DirectoryClient, DirectoryResponse};
pub use batch::{BatchReport, BatchRunner, RecordOutcome};
pub use error::{ObjectKind, ProvisionError};
pub use orchestrator::{LogoutUrlField, Orchestrator, ProvisionSettings};
pub use outcome::{ProvisionOutcome, ProvisionResult, ProvisionStep, Severity, StepWarning};
