use liasse_core::{BalanceEntry, Comparison, Money, VarianceAlert};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// Signed closing balance per account key, duplicates summed, in first-seen order.
fn balances_by_account(entries: &[BalanceEntry]) -> Vec<(&str, Money)> {
    let mut order: Vec<(&str, Money)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        match index.get(entry.compte.as_str()).copied() {
            Some(i) => order[i].1 = order[i].1 + entry.balance(),
            None => {
                index.insert(entry.compte.as_str(), order.len());
                order.push((entry.compte.as_str(), entry.balance()));
            }
        }
    }
    order
}

fn variation_percent(current: Money, previous: Money) -> f64 {
    if previous.is_zero() {
        return if current.is_zero() { 0.0 } else { 100.0 };
    }
    let variation = current.amount().checked_sub(previous.amount());
    let pct = variation
        .and_then(|v| v.checked_div(previous.amount().abs()))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
    match pct {
        Some(pct) => pct.round_dp(2).to_f64().unwrap_or(0.0),
        // Out of decimal range: fall back to floating point.
        None => {
            let current = current.amount().to_f64().unwrap_or(0.0);
            let previous = previous.amount().to_f64().unwrap_or(0.0);
            ((current - previous) / previous.abs() * 10_000.0).round() / 100.0
        }
    }
}

/// N vs N-1 comparison. Every account key of either period appears exactly
/// once: current accounts first in their order, then accounts only present
/// in the prior period. `significance` is the absolute percentage from which
/// a change on a matched account raises an alert.
pub fn compare_periods(
    current: &[BalanceEntry],
    prior: &[BalanceEntry],
    significance: f64,
) -> Vec<Comparison> {
    let current = balances_by_account(current);
    let prior = balances_by_account(prior);
    let prior_index: HashMap<&str, Money> = prior.iter().copied().collect();

    let mut comparisons = Vec::with_capacity(current.len() + prior.len());
    for (account, current_year) in &current {
        let comparison = match prior_index.get(account) {
            Some(&previous_year) => {
                let pct = variation_percent(*current_year, previous_year);
                let alert = if pct >= significance {
                    Some(VarianceAlert::SignificantIncrease)
                } else if pct <= -significance {
                    Some(VarianceAlert::SignificantDecrease)
                } else {
                    None
                };
                Comparison {
                    account: account.to_string(),
                    current_year: *current_year,
                    previous_year,
                    variation: *current_year - previous_year,
                    variation_percent: pct,
                    alert,
                }
            }
            None => Comparison {
                account: account.to_string(),
                current_year: *current_year,
                previous_year: Money::zero(),
                variation: *current_year,
                variation_percent: 100.0,
                alert: Some(VarianceAlert::NewAccount),
            },
        };
        comparisons.push(comparison);
    }

    let current_keys: HashSet<&str> = current.iter().map(|(k, _)| *k).collect();
    for (account, previous_year) in prior.iter().filter(|(k, _)| !current_keys.contains(k)) {
        comparisons.push(Comparison {
            account: account.to_string(),
            current_year: Money::zero(),
            previous_year: *previous_year,
            variation: -*previous_year,
            variation_percent: -100.0,
            alert: Some(VarianceAlert::MissingAccount),
        });
    }

    tracing::debug!(
        accounts = comparisons.len(),
        alerts = comparisons.iter().filter(|c| c.alert.is_some()).count(),
        "period comparison done"
    );
    comparisons
}
