use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse SYSCOHADA category derived from the class digit of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountCategory::Asset => write!(f, "asset"),
            AccountCategory::Liability => write!(f, "liability"),
            AccountCategory::Equity => write!(f, "equity"),
            AccountCategory::Income => write!(f, "income"),
            AccountCategory::Expense => write!(f, "expense"),
        }
    }
}

/// The eight classes of the SYSCOHADA chart of accounts, indexed by class digit.
pub const SYSCOHADA_CLASSES: &[(char, &str)] = &[
    ('1', "Comptes de ressources durables"),
    ('2', "Comptes d'actif immobilisé"),
    ('3', "Comptes de stocks"),
    ('4', "Comptes de tiers"),
    ('5', "Comptes de trésorerie"),
    ('6', "Comptes de charges des activités ordinaires"),
    ('7', "Comptes de produits des activités ordinaires"),
    ('8', "Comptes des autres charges et des autres produits"),
];

pub fn class_label(class_digit: char) -> Option<&'static str> {
    SYSCOHADA_CLASSES
        .iter()
        .find(|(digit, _)| *digit == class_digit)
        .map(|(_, label)| *label)
}
