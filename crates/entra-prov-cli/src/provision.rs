//! Load the manifest, build the Graph client and provision every record.

use std::process::ExitCode;

use entra_prov_core::load_manifest;
use entra_prov_graph::{GraphClient, GraphSettings};
use entra_prov_runtime::{BatchReport, BatchRunner, Orchestrator, ProvisionSettings};
use tracing::{error, info, warn};

use crate::Cli;

/// Exit code is 1 only when nothing could be attempted: an unloadable
/// manifest or unusable credentials. Failed records are logged and still
/// exit 0.
pub async fn run(cli: &Cli) -> ExitCode {
    info!("Loading configuration from {}", cli.manifest.display());
    let records = match load_manifest(&cli.manifest) {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Loaded {} application(s)", records.len());

    let credential = match cli.credential() {
        Ok(credential) => credential,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut graph_settings = GraphSettings::default();
    if let Some(url) = &cli.graph_url {
        graph_settings = graph_settings.with_base_url(url.clone());
    }
    if let Some(host) = &cli.authority_host {
        graph_settings.authority_host = host.clone();
    }
    let client = match GraphClient::with_settings(&credential, graph_settings) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create directory client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = ProvisionSettings {
        logout_url_field: cli.logout_url_field,
        directory_object_base: client.settings().base_url.trim_end_matches('/').to_string(),
        ..ProvisionSettings::default()
    };
    let runner = BatchRunner::new(Orchestrator::with_settings(client, settings));
    let report = runner.run_all(records).await;
    log_summary(&report);

    ExitCode::SUCCESS
}

fn log_summary(report: &BatchReport) {
    let total = report.outcomes.len();
    let failed = report.failed();
    let warnings = report.warnings();

    if failed == 0 && warnings == 0 {
        info!("Provisioned {total} of {total} application(s)");
    } else {
        warn!(
            failed,
            warnings,
            "Provisioned {} of {total} application(s)",
            report.succeeded()
        );
    }
}
