//! Output formatting for the `liasse` commands

use anyhow::Result;
use liasse_core::{Comparison, EntryStatus, Exercice, MappingSuggestion};
use liasse_import::{FileStructure, ImportOutcome, ImportReport};
use liasse_storage::ImportRecord;
use serde::Serialize;

/// JSON view of an import run.
#[derive(Serialize)]
struct OutcomeView<'a> {
    exercice: Exercice,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    report: &'a ImportReport,
    structure: &'a FileStructure,
    pending: &'a [MappingSuggestion],
    unmapped: &'a [String],
    comparisons: &'a [Comparison],
}

pub fn print_outcome(
    outcome: &ImportOutcome,
    exercice: Exercice,
    version: Option<u32>,
    json: bool,
) -> Result<()> {
    if json {
        let view = OutcomeView {
            exercice,
            version,
            report: &outcome.report,
            structure: &outcome.structure,
            pending: &outcome.mapping.pending,
            unmapped: &outcome.mapping.unmapped,
            comparisons: &outcome.comparisons,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let report = &outcome.report;
    println!("{} ({}), exercice {}", report.file_name, report.format, exercice);
    if let Some(version) = version {
        println!("  Stored as version {version}");
    }
    println!(
        "  Structure confidence: {}%  ({} data rows, {} skipped)",
        report.structure_confidence, outcome.structure.row_count, report.skipped_rows
    );
    println!(
        "  Accounts: {} imported, {} mapped, {} unmapped",
        report.imported_accounts, report.mapped_accounts, report.unmapped_accounts
    );
    println!(
        "  Debit {}  Credit {}  Difference {}  {}",
        report.debit_total,
        report.credit_total,
        report.difference,
        if report.is_balanced { "balanced" } else { "NOT BALANCED" }
    );
    println!(
        "  Mapping: {:.1}% average confidence, {:.1}% auto-mapped, {} manual",
        report.statistics.average_mapping_confidence,
        report.statistics.auto_mapped_percentage,
        report.statistics.manual_corrections
    );

    for notice in &report.notices {
        println!("  ! {notice}");
    }

    let flagged: Vec<_> = outcome
        .mapping
        .accounts
        .iter()
        .filter(|a| a.status != EntryStatus::Valid)
        .collect();
    if !flagged.is_empty() {
        println!();
        println!("Issues ({} errors, {} warnings):", report.errors, report.warnings);
        for account in flagged {
            for message in &account.messages {
                println!("  [{}] {}: {}", account.status, account.entry.compte, message);
            }
        }
    }

    if !outcome.mapping.pending.is_empty() {
        println!();
        println!("Pending suggestions:");
        for s in &outcome.mapping.pending {
            println!(
                "  {} -> {}  {} [{}] {}",
                s.source_account, s.suggested_account, s.confidence, s.based_on, s.reason
            );
        }
    }

    if !outcome.mapping.unmapped.is_empty() {
        println!();
        println!("Unmapped: {}", outcome.mapping.unmapped.join(", "));
    }

    let alerts: Vec<_> = outcome
        .comparisons
        .iter()
        .filter_map(|c| c.alert.map(|alert| (c, alert)))
        .collect();
    if !alerts.is_empty() {
        println!();
        println!("Variances against {}:", exercice.previous());
        for (c, alert) in alerts {
            println!(
                "  {:<12} {:>16} {:>16} {:>8.2}%  {}",
                c.account, c.previous_year, c.current_year, c.variation_percent, alert
            );
        }
    }

    Ok(())
}

pub fn print_history(records: &[ImportRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No imports recorded.");
        return Ok(());
    }

    for record in records {
        let report = &record.report;
        println!(
            "{}  {} v{}  {}  {} accounts, {} mapped{}",
            report.timestamp.format("%Y-%m-%d %H:%M"),
            record.exercice,
            record.version,
            report.file_name,
            report.imported_accounts,
            report.mapped_accounts,
            if report.is_balanced { "" } else { ", unbalanced" }
        );
    }
    Ok(())
}
