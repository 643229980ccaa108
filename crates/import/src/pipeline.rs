use liasse_core::{BalanceEntry, Comparison, ImportedAccount, MappingHistoryEntry};
use std::path::Path;
use std::time::Instant;

use crate::classify::classify_all;
use crate::config::{ImportConfig, ImportFormat};
use crate::decode::{decode, DecodeOptions};
use crate::detect::{detect_structure, FileStructure};
use crate::error::ImportError;
use crate::mapping::{premap, MappingEngine, MappingSession};
use crate::normalize::normalize_rows;
use crate::report::{ImportReport, ReportContext};
use crate::validate::{validate_balance, BalanceCheck};
use crate::variance::compare_periods;

/// Everything one run needs besides the configuration.
#[derive(Debug, Clone, Default)]
pub struct ImportInput<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
    /// Learned mappings of the tenant.
    pub history: Vec<MappingHistoryEntry>,
    /// Stored N-1 balance, used when the file carries no prior-period columns.
    pub prior: Vec<BalanceEntry>,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub format: ImportFormat,
    pub structure: FileStructure,
    pub entries: Vec<BalanceEntry>,
    /// N-1 entries read from the file itself.
    pub prior_entries: Vec<BalanceEntry>,
    pub mapping: MappingSession,
    pub balance_check: BalanceCheck,
    /// Empty when no prior-period data was available.
    pub comparisons: Vec<Comparison>,
    pub report: ImportReport,
}

impl ImportOutcome {
    pub fn refresh_report(&mut self, config: &ImportConfig) {
        self.report.refresh_mapping(&self.mapping, &config.policy);
    }
}

pub struct ImportPipeline {
    config: ImportConfig,
    engine: MappingEngine,
}

impl ImportPipeline {
    pub fn new(config: ImportConfig) -> Self {
        let engine = MappingEngine::new(config.rules.clone(), config.policy.clone());
        Self { config, engine }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Declared format first, then the file extension, then the content.
    pub fn resolve_format(&self, file_name: &str, bytes: &[u8]) -> ImportFormat {
        self.config
            .format
            .or_else(|| ImportFormat::from_path(Path::new(file_name)))
            .unwrap_or_else(|| ImportFormat::sniff(bytes))
    }

    /// Runs every stage over an in-memory file. Decoding, structure and
    /// normalization failures abort the run; later anomalies are annotations.
    pub fn run(&self, input: ImportInput<'_>) -> Result<ImportOutcome, ImportError> {
        let started = Instant::now();
        let config = &self.config;
        let format = self.resolve_format(input.file_name, input.bytes);

        let matrix = decode(
            input.bytes,
            format,
            DecodeOptions {
                separator: config.separator,
                encoding: config.encoding.as_deref(),
            },
        )?;

        let structure = detect_structure(&matrix, &config.policy);
        if !structure.is_usable() {
            return Err(ImportError::UndetectableStructure(structure.headers));
        }
        let mut notices = Vec::new();
        if !structure.is_confident(&config.policy) {
            tracing::warn!(
                confidence = structure.detection_confidence,
                "low structure detection confidence"
            );
            notices.push(format!(
                "Column layout detected with {}% confidence; check the column mapping",
                structure.detection_confidence
            ));
        }

        let normalized = normalize_rows(&matrix, &structure, config.skip_total_rows)?;
        notices.extend(normalized.warnings);
        if normalized.skipped_rows > 0 {
            notices.push(format!(
                "{} row(s) skipped",
                normalized.skipped_rows
            ));
        }

        let mut accounts: Vec<ImportedAccount> = normalized
            .entries
            .iter()
            .cloned()
            .map(ImportedAccount::new)
            .collect();
        classify_all(&mut accounts);
        if config.prefix_premap {
            premap(&mut accounts);
        }
        let suggestions = self.engine.generate_suggestions(&accounts, &input.history);

        let balance_check = validate_balance(
            &mut accounts,
            config.tolerance,
            config.severity_threshold(),
        );

        let prior: &[BalanceEntry] = if normalized.prior_entries.is_empty() {
            &input.prior
        } else {
            &normalized.prior_entries
        };
        let comparisons = if prior.is_empty() {
            Vec::new()
        } else {
            compare_periods(
                &normalized.entries,
                prior,
                config.policy.variance_significance,
            )
        };

        let mapping = MappingSession::new(accounts, suggestions, input.history);
        let context = ReportContext {
            file_name: input.file_name.to_string(),
            format,
            structure_confidence: structure.detection_confidence,
            skipped_rows: normalized.skipped_rows,
            processing_time_ms: started.elapsed().as_millis() as u64,
            notices,
        };
        let report = ImportReport::build(
            context,
            &mapping,
            &balance_check,
            &comparisons,
            &config.policy,
        );

        tracing::info!(
            file = input.file_name,
            %format,
            accounts = report.total_accounts,
            balanced = report.is_balanced,
            pending = report.pending_suggestions,
            "balance import finished"
        );

        Ok(ImportOutcome {
            format,
            structure,
            entries: normalized.entries,
            prior_entries: normalized.prior_entries,
            mapping,
            balance_check,
            comparisons,
            report,
        })
    }
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}
