use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::AccountCategory;
use crate::money::Money;

/// Canonical trial-balance line consumed by the fiscal-form generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub compte: String,
    pub intitule: String,
    /// Debit movements of the period.
    pub debit: Money,
    /// Credit movements of the period.
    pub credit: Money,
    pub solde_debit: Money,
    pub solde_credit: Money,
}

impl BalanceEntry {
    pub fn new(compte: &str, intitule: &str) -> Self {
        BalanceEntry {
            compte: compte.to_string(),
            intitule: intitule.to_string(),
            debit: Money::zero(),
            credit: Money::zero(),
            solde_debit: Money::zero(),
            solde_credit: Money::zero(),
        }
    }

    pub fn with_closing(mut self, solde_debit: Money, solde_credit: Money) -> Self {
        self.solde_debit = solde_debit;
        self.solde_credit = solde_credit;
        self
    }

    pub fn with_movements(mut self, debit: Money, credit: Money) -> Self {
        self.debit = debit;
        self.credit = credit;
        self
    }

    /// Signed closing balance, debit-positive.
    pub fn balance(&self) -> Money {
        self.solde_debit - self.solde_credit
    }

    pub fn is_blank(&self) -> bool {
        self.debit.is_zero()
            && self.credit.is_zero()
            && self.solde_debit.is_zero()
            && self.solde_credit.is_zero()
    }
}

/// Score in `0..=100` expressing certainty of a mapping or a detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f32);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const MAX: Confidence = Confidence(100.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Confidence::ZERO;
        }
        Confidence(value.clamp(0.0, 100.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn max(self, other: Confidence) -> Confidence {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    Valid,
    Warning,
    Error,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Valid => write!(f, "valid"),
            EntryStatus::Warning => write!(f, "warning"),
            EntryStatus::Error => write!(f, "error"),
        }
    }
}

/// A normalized entry together with everything the pipeline learned about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedAccount {
    pub entry: BalanceEntry,
    pub category: Option<AccountCategory>,
    pub mapped_account: Option<String>,
    pub mapping_confidence: Confidence,
    pub status: EntryStatus,
    pub messages: Vec<String>,
}

impl ImportedAccount {
    pub fn new(entry: BalanceEntry) -> Self {
        ImportedAccount {
            entry,
            category: None,
            mapped_account: None,
            mapping_confidence: Confidence::ZERO,
            status: EntryStatus::Valid,
            messages: Vec::new(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_account.is_some()
    }

    /// Raises the status to `status` (never lowers it) and records `message` once.
    pub fn annotate(&mut self, status: EntryStatus, message: String) {
        if status > self.status {
            self.status = status;
        }
        if !self.messages.contains(&message) {
            self.messages.push(message);
        }
    }
}
