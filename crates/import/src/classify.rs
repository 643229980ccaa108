use liasse_core::{AccountCategory, ImportedAccount};

/// Category hint from the SYSCOHADA class digit. Never authoritative.
pub fn classify_account(compte: &str) -> Option<AccountCategory> {
    match compte.trim().chars().next()? {
        '1' => Some(AccountCategory::Equity),
        '2' | '3' | '5' => Some(AccountCategory::Asset),
        '4' => Some(AccountCategory::Liability),
        '6' => Some(AccountCategory::Expense),
        '7' => Some(AccountCategory::Income),
        _ => None,
    }
}

pub fn classify_all(accounts: &mut [ImportedAccount]) {
    for account in accounts {
        account.category = classify_account(&account.entry.compte);
    }
}
