//! # entra-prov-graph
//!
//! Microsoft Graph implementation of the provisioning
//! [`DirectoryClient`](entra_prov_runtime::DirectoryClient).
//!
//! [`GraphClient`] sends JSON requests with a bearer token that is acquired
//! on the first call and reused for the rest of the process. The token comes
//! from a [`Credential`]: either ambient discovery (client secret variables,
//! managed identity, Azure CLI) or an app registration certificate.

pub mod certificate;
pub mod client;
pub mod credential;
pub mod error;
pub mod token;

pub use certificate::ClientCertificate;
pub use client::{GraphClient, GraphSettings};
pub use credential::Credential;
pub use error::{GraphError, GraphResult};
pub use token::{StaticToken, TokenCache, TokenSource};
