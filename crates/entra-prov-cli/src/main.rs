use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use entra_prov_graph::{Credential, GraphResult};
use entra_prov_runtime::LogoutUrlField;
use tracing_subscriber::EnvFilter;

mod provision;

#[derive(Parser, Debug)]
#[command(
    name = "entra-provision",
    version,
    about = "Provision Entra ID SAML applications from YAML"
)]
struct Cli {
    /// Path to the YAML manifest
    manifest: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// App registration used for certificate authentication
    #[arg(long, env = "ENTRA_PROVISION_CLIENT_ID")]
    client_id: Option<String>,

    /// Tenant for certificate authentication
    #[arg(long, env = "ENTRA_PROVISION_TENANT_ID")]
    tenant_id: Option<String>,

    /// PEM file holding the private key and certificate
    #[arg(long, env = "ENTRA_PROVISION_CERTIFICATE_PATH")]
    certificate_path: Option<PathBuf>,

    /// Which web field receives the single logout URL
    /// (logout-url, home-page-url or both)
    #[arg(long, default_value_t = LogoutUrlField::LogoutUrl)]
    logout_url_field: LogoutUrlField,

    /// Override the Graph API root
    #[arg(long, hide = true)]
    graph_url: Option<String>,

    /// Override the login authority host
    #[arg(long, hide = true)]
    authority_host: Option<String>,
}

impl Cli {
    fn credential(&self) -> GraphResult<Credential> {
        Credential::from_parts(
            self.client_id.clone(),
            self.tenant_id.clone(),
            self.certificate_path.clone(),
        )
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    provision::run(&cli).await
}
