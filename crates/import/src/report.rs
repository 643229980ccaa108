use chrono::{DateTime, Utc};
use liasse_core::{Comparison, EntryStatus, ImportedAccount, Money};
use serde::{Deserialize, Serialize};

use crate::config::{ImportFormat, PolicyConfig};
use crate::mapping::MappingSession;
use crate::validate::BalanceCheck;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingStatistics {
    pub average_mapping_confidence: f32,
    pub auto_mapped_percentage: f32,
    pub manual_corrections: usize,
}

impl MappingStatistics {
    fn compute(
        accounts: &[ImportedAccount],
        manual_corrections: usize,
        auto_mapped_line: f32,
    ) -> Self {
        if accounts.is_empty() {
            return MappingStatistics {
                average_mapping_confidence: 0.0,
                auto_mapped_percentage: 0.0,
                manual_corrections,
            };
        }
        let n = accounts.len() as f32;
        let total: f32 = accounts.iter().map(|a| a.mapping_confidence.value()).sum();
        let auto = accounts
            .iter()
            .filter(|a| a.mapping_confidence.value() > auto_mapped_line)
            .count() as f32;
        MappingStatistics {
            average_mapping_confidence: total / n,
            auto_mapped_percentage: auto / n * 100.0,
            manual_corrections,
        }
    }
}

/// Snapshot of one import run, persisted as an import-history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    pub format: ImportFormat,
    pub processing_time_ms: u64,
    pub structure_confidence: u8,
    pub total_accounts: usize,
    pub imported_accounts: usize,
    pub mapped_accounts: usize,
    pub unmapped_accounts: usize,
    pub errors: usize,
    pub warnings: usize,
    pub pending_suggestions: usize,
    pub skipped_rows: usize,
    pub debit_total: Money,
    pub credit_total: Money,
    pub balance: Money,
    pub difference: Money,
    pub is_balanced: bool,
    pub significant_variances: usize,
    pub statistics: MappingStatistics,
    /// Run-level notices: low structure confidence, skipped or suspicious rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}

/// Run facts gathered before the report is assembled.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub file_name: String,
    pub format: ImportFormat,
    pub structure_confidence: u8,
    pub skipped_rows: usize,
    pub processing_time_ms: u64,
    pub notices: Vec<String>,
}

impl ImportReport {
    pub fn build(
        context: ReportContext,
        session: &MappingSession,
        check: &BalanceCheck,
        comparisons: &[Comparison],
        policy: &PolicyConfig,
    ) -> Self {
        let accounts = &session.accounts;
        let errors = accounts.iter().filter(|a| a.status == EntryStatus::Error).count();
        let mut report = ImportReport {
            timestamp: Utc::now(),
            file_name: context.file_name,
            format: context.format,
            processing_time_ms: context.processing_time_ms,
            structure_confidence: context.structure_confidence,
            total_accounts: accounts.len(),
            imported_accounts: accounts.len() - errors,
            mapped_accounts: 0,
            unmapped_accounts: 0,
            errors,
            warnings: accounts
                .iter()
                .filter(|a| a.status == EntryStatus::Warning)
                .count(),
            pending_suggestions: 0,
            skipped_rows: context.skipped_rows,
            debit_total: check.total_debit,
            credit_total: check.total_credit,
            balance: check.balance(),
            difference: check.difference,
            is_balanced: check.is_balanced,
            significant_variances: comparisons
                .iter()
                .filter(|c| c.alert.is_some())
                .count(),
            statistics: MappingStatistics::compute(&[], 0, policy.auto_mapped_threshold),
            notices: context.notices,
        };
        report.refresh_mapping(session, policy);
        report
    }

    /// Recomputes the mapping counts after suggestions were accepted,
    /// rejected or overridden.
    pub fn refresh_mapping(&mut self, session: &MappingSession, policy: &PolicyConfig) {
        let accounts = &session.accounts;
        self.mapped_accounts = accounts.iter().filter(|a| a.is_mapped()).count();
        self.unmapped_accounts = accounts.len() - self.mapped_accounts;
        self.pending_suggestions = session.pending.len();
        self.statistics = MappingStatistics::compute(
            accounts,
            session.manual_corrections,
            policy.auto_mapped_threshold,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SuggestionSet;
    use liasse_core::{BalanceEntry, Confidence, MappingSuggestion, SuggestionSource};
    use rust_decimal::Decimal;

    fn context() -> ReportContext {
        ReportContext {
            file_name: "balance.csv".to_string(),
            format: ImportFormat::Csv,
            structure_confidence: 100,
            skipped_rows: 1,
            processing_time_ms: 3,
            notices: Vec::new(),
        }
    }

    fn session() -> MappingSession {
        let mut mapped = ImportedAccount::new(
            BalanceEntry::new("411", "Clients").with_closing(Money::from(100), Money::zero()),
        );
        mapped.mapped_account = Some("411".to_string());
        mapped.mapping_confidence = Confidence::new(86.0);
        let mut flagged = ImportedAccount::new(
            BalanceEntry::new("ZZ", "Divers").with_closing(Money::zero(), Money::from(40)),
        );
        flagged.status = EntryStatus::Warning;
        let set = SuggestionSet {
            suggestions: vec![MappingSuggestion {
                source_account: "ZZ".to_string(),
                suggested_account: "471".to_string(),
                confidence: Confidence::new(70.0),
                reason: "test".to_string(),
                based_on: SuggestionSource::Rules,
            }],
            unmapped: Vec::new(),
        };
        MappingSession::new(vec![mapped, flagged], set, Vec::new())
    }

    fn check(session: &MappingSession) -> BalanceCheck {
        BalanceCheck::compute(session.accounts.iter().map(|a| &a.entry), Decimal::new(1, 2))
    }

    #[test]
    fn counts_and_totals() {
        let session = session();
        let check = check(&session);
        let report =
            ImportReport::build(context(), &session, &check, &[], &PolicyConfig::default());

        assert_eq!(report.total_accounts, 2);
        assert_eq!(report.imported_accounts, 2);
        assert_eq!(report.mapped_accounts, 1);
        assert_eq!(report.unmapped_accounts, 1);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.errors, 0);
        assert_eq!(report.pending_suggestions, 1);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.balance, Money::from(60));
        assert!(!report.is_balanced);
        assert_eq!(report.statistics.average_mapping_confidence, 43.0);
        assert_eq!(report.statistics.auto_mapped_percentage, 50.0);
    }

    #[test]
    fn refresh_after_accept_all() {
        let mut session = session();
        let policy = PolicyConfig::default();
        let check = check(&session);
        let mut report = ImportReport::build(context(), &session, &check, &[], &policy);

        session.accept_all();
        report.refresh_mapping(&session, &policy);
        assert_eq!(report.mapped_accounts, 2);
        assert_eq!(report.pending_suggestions, 0);
        assert_eq!(report.statistics.average_mapping_confidence, 78.0);
    }
}
