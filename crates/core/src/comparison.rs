use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceAlert {
    SignificantIncrease,
    SignificantDecrease,
    NewAccount,
    MissingAccount,
}

impl fmt::Display for VarianceAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarianceAlert::SignificantIncrease => write!(f, "significant_increase"),
            VarianceAlert::SignificantDecrease => write!(f, "significant_decrease"),
            VarianceAlert::NewAccount => write!(f, "new_account"),
            VarianceAlert::MissingAccount => write!(f, "missing_account"),
        }
    }
}

/// Year-over-year (N vs N-1) line for one account key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub account: String,
    pub current_year: Money,
    pub previous_year: Money,
    pub variation: Money,
    pub variation_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<VarianceAlert>,
}
