use entra_prov_core::ManifestRecord;
use tracing::{error, info, instrument};

use crate::adapter::DirectoryClient;
use crate::error::ProvisionError;
use crate::orchestrator::Orchestrator;
use crate::outcome::ProvisionOutcome;

/// Result of provisioning one manifest record.
#[derive(Debug)]
pub struct RecordOutcome {
    pub record: ManifestRecord,
    pub result: Result<ProvisionOutcome, ProvisionError>,
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a whole run, in manifest order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Recoverable step failures across all successful records.
    pub fn warnings(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|outcome| outcome.warnings.len())
            .sum()
    }
}

/// Provisions records one after another, isolating per-record failures.
pub struct BatchRunner<C: DirectoryClient> {
    orchestrator: Orchestrator<C>,
}

impl<C: DirectoryClient> BatchRunner<C> {
    pub fn new(orchestrator: Orchestrator<C>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator<C> {
        &self.orchestrator
    }

    /// Provision every record in order. A failed record is logged and the
    /// run moves on; nothing already applied is rolled back.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn run_all(&self, records: Vec<ManifestRecord>) -> BatchReport {
        let mut report = BatchReport::default();

        for record in records {
            info!("Provisioning application: {}", record.name);
            let result = self.orchestrator.provision(&record).await;

            match &result {
                Ok(outcome) if outcome.warnings.is_empty() => {
                    info!("Successfully provisioned {}: {}", record.name, outcome.result);
                }
                Ok(outcome) => {
                    info!(
                        warnings = outcome.warnings.len(),
                        "Provisioned {} with warnings: {}", record.name, outcome.result
                    );
                }
                Err(err) => {
                    error!("Error provisioning {}: {}", record.name, err);
                }
            }

            report.outcomes.push(RecordOutcome { record, result });
        }

        report
    }
}
