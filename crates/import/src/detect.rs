use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::cell::{Cell, RawMatrix};
use crate::config::PolicyConfig;

/// Column indices resolved from the header row.
///
/// When a group holds two or more columns, the first is read as the period
/// movement and the last as the closing balance. A single column is the
/// closing balance and the movement is zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectedColumns {
    pub account_number: Option<usize>,
    pub account_name: Option<usize>,
    pub debit: Vec<usize>,
    pub credit: Vec<usize>,
    /// Debit columns explicitly labelled as prior period (N-1).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior_debit: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior_credit: Vec<usize>,
}

impl DetectedColumns {
    pub fn has_prior_period(&self) -> bool {
        !self.prior_debit.is_empty() || !self.prior_credit.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStructure {
    pub headers: Vec<String>,
    pub detected_columns: DetectedColumns,
    pub sample_data: Vec<Vec<Cell>>,
    pub row_count: usize,
    pub detection_confidence: u8,
}

impl FileStructure {
    pub fn is_confident(&self, policy: &PolicyConfig) -> bool {
        self.detection_confidence > policy.structure_warning_threshold
    }

    pub fn is_usable(&self) -> bool {
        !self.detected_columns.debit.is_empty() || !self.detected_columns.credit.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    AccountNumber,
    AccountName,
    Debit,
    Credit,
}

const NUMBER_TOKENS: &[&str] = &["compte", "account", "n°", "numéro", "numero"];
const NUMBER_EXACT: &[&str] = &["code", "cpte", "no"];
const NAME_TOKENS: &[&str] = &[
    "libellé",
    "libelle",
    "intitulé",
    "intitule",
    "label",
    "name",
    "désignation",
    "designation",
];
const DEBIT_TOKENS: &[&str] = &["débit", "debit"];
const CREDIT_TOKENS: &[&str] = &["crédit", "credit"];

fn prior_period_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)\bn\s*[-_.]?\s*1\b|pr[ée]c[ée]dent|ant[ée]rieur|previous|prior")
            .expect("static regex")
    })
}

fn classify(header: &str, number_claimed: bool, name_claimed: bool) -> Option<Role> {
    let contains_any = |tokens: &[&str]| tokens.iter().any(|t| header.contains(t));

    if !number_claimed && (contains_any(NUMBER_TOKENS) || NUMBER_EXACT.contains(&header)) {
        Some(Role::AccountNumber)
    } else if !name_claimed && contains_any(NAME_TOKENS) {
        Some(Role::AccountName)
    } else if contains_any(DEBIT_TOKENS) {
        Some(Role::Debit)
    } else if contains_any(CREDIT_TOKENS) {
        Some(Role::Credit)
    } else {
        None
    }
}

/// Locates the account, label and amount columns of a trial balance from
/// its header row and scores how much of the layout was recognised.
pub fn detect_structure(matrix: &RawMatrix, policy: &PolicyConfig) -> FileStructure {
    let mut columns = DetectedColumns::default();

    for (idx, raw) in matrix.headers.iter().enumerate() {
        let header = raw.trim().to_lowercase();
        if header.is_empty() {
            continue;
        }
        let role = classify(
            &header,
            columns.account_number.is_some(),
            columns.account_name.is_some(),
        );
        let prior = prior_period_marker().is_match(&header);
        match role {
            Some(Role::AccountNumber) => columns.account_number = Some(idx),
            Some(Role::AccountName) => columns.account_name = Some(idx),
            Some(Role::Debit) if prior => columns.prior_debit.push(idx),
            Some(Role::Debit) => columns.debit.push(idx),
            Some(Role::Credit) if prior => columns.prior_credit.push(idx),
            Some(Role::Credit) => columns.credit.push(idx),
            None => {}
        }
    }

    let confidence = score(&columns, policy);

    if columns.account_number.is_none() {
        columns.account_number = Some(0);
    }
    if columns.account_name.is_none() {
        columns.account_name = Some(1.min(matrix.headers.len().saturating_sub(1)));
    }

    tracing::debug!(?columns, confidence, "detected file structure");

    FileStructure {
        headers: matrix.headers.clone(),
        detected_columns: columns,
        sample_data: matrix.rows.iter().take(policy.sample_rows).cloned().collect(),
        row_count: matrix.rows.len(),
        detection_confidence: confidence,
    }
}

/// Base value plus one increment per resolved role. Fallback columns do not
/// count as resolved.
fn score(columns: &DetectedColumns, policy: &PolicyConfig) -> u8 {
    let mut confidence = u32::from(policy.structure_base_confidence);
    if columns.account_number.is_some() {
        confidence += u32::from(policy.account_number_increment);
    }
    if columns.account_name.is_some() {
        confidence += u32::from(policy.account_name_increment);
    }
    if !columns.debit.is_empty() {
        confidence += u32::from(policy.debit_increment);
    }
    if !columns.credit.is_empty() {
        confidence += u32::from(policy.credit_increment);
    }
    confidence.min(100) as u8
}
