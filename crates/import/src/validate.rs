use liasse_core::{BalanceEntry, EntryStatus, ImportedAccount, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Double-entry equilibrium of the closing balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub total_debit: Money,
    pub total_credit: Money,
    pub difference: Money,
    pub tolerance: Decimal,
    pub is_balanced: bool,
}

impl BalanceCheck {
    pub fn compute<'a>(
        entries: impl IntoIterator<Item = &'a BalanceEntry>,
        tolerance: Decimal,
    ) -> Self {
        let (total_debit, total_credit) = entries
            .into_iter()
            .fold((Money::zero(), Money::zero()), |(d, c), e| {
                (d + e.solde_debit, c + e.solde_credit)
            });
        let difference = (total_debit - total_credit).abs();
        BalanceCheck {
            total_debit,
            total_credit,
            difference,
            tolerance,
            is_balanced: difference.amount() <= tolerance,
        }
    }

    /// Signed total, debit-positive.
    pub fn balance(&self) -> Money {
        self.total_debit - self.total_credit
    }
}

/// Checks equilibrium and annotates entries in place. Safe to run repeatedly:
/// totals and flagged entries come out the same each time.
pub fn validate_balance(
    accounts: &mut [ImportedAccount],
    tolerance: Decimal,
    severity_threshold: Decimal,
) -> BalanceCheck {
    let check = BalanceCheck::compute(accounts.iter().map(|a| &a.entry), tolerance);

    if check.difference.amount() > severity_threshold {
        let message = format!("Balance out of equilibrium by {}", check.difference);
        for account in accounts.iter_mut() {
            account.annotate(EntryStatus::Error, message.clone());
        }
    }

    for account in accounts.iter_mut() {
        let e = &account.entry;
        if !e.solde_debit.is_zero() && !e.solde_credit.is_zero() {
            account.annotate(
                EntryStatus::Warning,
                "Both debit and credit closing balances are set".to_string(),
            );
        }
    }

    if check.is_balanced {
        tracing::debug!(total = %check.total_debit, "balance is in equilibrium");
    } else {
        tracing::warn!(
            debit = %check.total_debit,
            credit = %check.total_credit,
            difference = %check.difference,
            "balance is out of equilibrium"
        );
    }
    check
}
