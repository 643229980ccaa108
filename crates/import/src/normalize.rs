use liasse_core::{BalanceEntry, Money};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::cell::{Cell, RawMatrix};
use crate::detect::FileStructure;
use crate::error::ImportError;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedBalance {
    pub entries: Vec<BalanceEntry>,
    /// N-1 entries read from prior-period columns of the same file.
    pub prior_entries: Vec<BalanceEntry>,
    pub skipped_rows: usize,
    pub warnings: Vec<String>,
}

/// Parses a locale-formatted amount. Empty or unparsable cells are zero.
pub fn parse_amount(cell: &Cell) -> Money {
    let decimal = match cell {
        Cell::Empty => None,
        Cell::Number(n) => Decimal::from_f64(*n),
        Cell::Text(s) => parse_amount_text(s),
    };
    decimal.map(Money::from_decimal).unwrap_or_default()
}

fn parse_amount_text(raw: &str) -> Option<Decimal> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner.to_string()),
        None => (false, s),
    };
    let s: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
        .collect();

    let commas = s.matches(',').count();
    let dots = s.matches('.').count();
    let normalized = match (commas, dots) {
        (0, 0) => s,
        // The separator appearing last is the decimal point.
        (c, d) if c > 0 && d > 0 => {
            if s.rfind(',') > s.rfind('.') {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (1, 0) => s.replace(',', "."),
        (_, 0) => s.replace(',', ""),
        (0, 1) => s,
        _ => s.replace('.', ""),
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Account key of a row: the cell text with all whitespace removed. Whole
/// numbers coming from numeric cells lose their fractional part.
pub fn account_key(cell: &Cell) -> Option<String> {
    let key: String = cell.to_string().chars().filter(|c| !c.is_whitespace()).collect();
    (!key.is_empty()).then_some(key)
}

/// Splits an amount column group into `(movement, closing)`.
fn split_group(matrix: &RawMatrix, row: usize, columns: &[usize]) -> (Money, Money) {
    match columns {
        [] => (Money::zero(), Money::zero()),
        [only] => (Money::zero(), parse_amount(matrix.cell(row, *only))),
        [first, .., last] => (
            parse_amount(matrix.cell(row, *first)),
            parse_amount(matrix.cell(row, *last)),
        ),
    }
}

/// Converts data rows into balance entries, in input order. Rows without an
/// account number are skipped, never rejected.
pub fn normalize_rows(
    matrix: &RawMatrix,
    structure: &FileStructure,
    skip_total_rows: bool,
) -> Result<NormalizedBalance, ImportError> {
    let columns = &structure.detected_columns;
    let number_col = columns.account_number.unwrap_or(0);
    let mut out = NormalizedBalance::default();

    for row in 0..matrix.rows.len() {
        let Some(compte) = account_key(matrix.cell(row, number_col)) else {
            out.skipped_rows += 1;
            continue;
        };
        if skip_total_rows && compte.to_lowercase().starts_with("total") {
            out.skipped_rows += 1;
            continue;
        }

        let label = columns
            .account_name
            .filter(|col| *col != number_col)
            .map(|col| matrix.cell(row, col).to_string().trim().to_string())
            .unwrap_or_default();
        let intitule = if label.is_empty() { compte.clone() } else { label };

        let (debit, solde_debit) = split_group(matrix, row, &columns.debit);
        let (credit, solde_credit) = split_group(matrix, row, &columns.credit);
        let entry = BalanceEntry::new(&compte, &intitule)
            .with_movements(debit, credit)
            .with_closing(solde_debit, solde_credit);

        if [debit, credit, solde_debit, solde_credit]
            .iter()
            .any(|m| m.is_negative())
        {
            out.warnings.push(format!(
                "Line {}: negative amount for account {}",
                row + 2,
                compte
            ));
        }

        if columns.has_prior_period() {
            let (prior_debit, prior_solde_debit) = split_group(matrix, row, &columns.prior_debit);
            let (prior_credit, prior_solde_credit) =
                split_group(matrix, row, &columns.prior_credit);
            let prior = BalanceEntry::new(&compte, &intitule)
                .with_movements(prior_debit, prior_credit)
                .with_closing(prior_solde_debit, prior_solde_credit);
            if !prior.is_blank() {
                out.prior_entries.push(prior);
            }
        }

        out.entries.push(entry);
    }

    if out.entries.is_empty() {
        return Err(ImportError::NoValidEntries {
            skipped: out.skipped_rows,
        });
    }

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for entry in &out.entries {
        *occurrences.entry(entry.compte.as_str()).or_default() += 1;
    }
    let mut duplicates: Vec<(&str, usize)> =
        occurrences.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    let duplicate_warnings: Vec<String> = duplicates
        .into_iter()
        .map(|(compte, n)| format!("Account {compte} appears {n} times"))
        .collect();
    out.warnings.extend(duplicate_warnings);

    if out.skipped_rows > 0 {
        tracing::debug!(skipped = out.skipped_rows, "rows without account number skipped");
    }
    Ok(out)
}
