use liasse_core::Exercice;
use liasse_import::{ImportConfig, ImportInput, ImportOutcome, ImportPipeline};
use std::path::Path;

use crate::error::ServiceError;
use crate::kv::KeyValueStore;
use crate::repository::{BalanceRepository, ImportRecord};

/// Orchestrates: read file → load tenant history and N-1 balance → run the
/// pipeline. `commit` persists a reviewed outcome.
pub struct ImportService<S: KeyValueStore> {
    pipeline: ImportPipeline,
    repository: BalanceRepository<S>,
}

impl<S: KeyValueStore> ImportService<S> {
    pub fn new(config: ImportConfig, repository: BalanceRepository<S>) -> Self {
        Self {
            pipeline: ImportPipeline::new(config),
            repository,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        self.pipeline.config()
    }

    pub fn repository(&self) -> &BalanceRepository<S> {
        &self.repository
    }

    /// Import a file on disk.
    pub async fn import_file(
        &self,
        path: &Path,
        exercice: Exercice,
    ) -> Result<ImportOutcome, ServiceError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        self.import_bytes(&file_name, &bytes, exercice).await
    }

    /// Import raw bytes. Nothing is written to the store.
    pub async fn import_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
        exercice: Exercice,
    ) -> Result<ImportOutcome, ServiceError> {
        let history = self.repository.mapping_history().await?;
        let prior = self
            .repository
            .load_balance(exercice.previous())
            .await?
            .map(|stored| stored.entries)
            .unwrap_or_default();
        tracing::debug!(
            file = file_name,
            %exercice,
            history = history.len(),
            prior = prior.len(),
            "starting import"
        );

        let outcome = self.pipeline.run(ImportInput {
            file_name,
            bytes,
            history,
            prior,
        })?;
        Ok(outcome)
    }

    /// Persists a reviewed outcome and returns the new balance version.
    ///
    /// Three writes, in order: the balance version, the mappings learned in
    /// this session (merged into the stored history), then the import record.
    /// The store has no transactions, so a failure part-way leaves the earlier
    /// writes in place. The import record is written last: a version without
    /// a record is an unfinished commit, and committing again appends a new
    /// version.
    pub async fn commit(
        &self,
        exercice: Exercice,
        outcome: &ImportOutcome,
    ) -> Result<u32, ServiceError> {
        let version = self
            .repository
            .append_balance(exercice, &outcome.report.file_name, &outcome.entries)
            .await?;
        self.repository
            .record_mappings(&outcome.mapping.learned)
            .await?;
        self.repository
            .record_import(ImportRecord {
                exercice,
                version,
                report: outcome.report.clone(),
            })
            .await?;
        tracing::info!(
            tenant = self.repository.tenant(),
            %exercice,
            version,
            "import committed"
        );
        Ok(version)
    }
}
