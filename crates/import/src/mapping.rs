use liasse_core::{
    class_label, record_mapping, Confidence, ImportedAccount, MappingHistoryEntry,
    MappingSuggestion, SuggestionSource,
};
use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::error::MappingError;
use crate::rules::{KeywordRule, KeywordRuleEngine};

fn leading_digits(compte: &str) -> usize {
    compte.chars().take_while(char::is_ascii_digit).count()
}

/// Maps every account with at least three leading digits onto its
/// three-digit prefix. Longer account numbers earn more confidence.
pub fn premap(accounts: &mut [ImportedAccount]) {
    for account in accounts.iter_mut() {
        let compte = &account.entry.compte;
        if leading_digits(compte) < 3 {
            continue;
        }
        let len = compte.chars().count().min(6) as f32;
        account.mapped_account = Some(compte[..3].to_string());
        account.mapping_confidence = Confidence::new(80.0 + len * 2.0);
    }
}

/// Output of one pass of the suggestion cascade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<MappingSuggestion>,
    /// Accounts for which no rule produced a target.
    pub unmapped: Vec<String>,
}

/// Ordered, first-match-wins cascade: learned history, label keywords, then
/// the numeric SYSCOHADA prefix.
pub struct MappingEngine {
    rules: KeywordRuleEngine,
    policy: PolicyConfig,
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self {
            rules: KeywordRuleEngine::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl MappingEngine {
    pub fn new(rules: Vec<KeywordRule>, policy: PolicyConfig) -> Self {
        Self {
            rules: KeywordRuleEngine::new(rules),
            policy,
        }
    }

    pub fn needs_review(&self, account: &ImportedAccount) -> bool {
        !account.is_mapped()
            || account.mapping_confidence.value() < self.policy.reevaluation_threshold
    }

    pub fn generate_suggestions(
        &self,
        accounts: &[ImportedAccount],
        history: &[MappingHistoryEntry],
    ) -> SuggestionSet {
        let mut set = SuggestionSet::default();
        for account in accounts.iter().filter(|a| self.needs_review(a)) {
            match self.suggest(account, history) {
                Some(suggestion) => set.suggestions.push(suggestion),
                None => set.unmapped.push(account.entry.compte.clone()),
            }
        }
        tracing::debug!(
            suggestions = set.suggestions.len(),
            unmapped = set.unmapped.len(),
            "mapping suggestions generated"
        );
        set
    }

    pub fn suggest(
        &self,
        account: &ImportedAccount,
        history: &[MappingHistoryEntry],
    ) -> Option<MappingSuggestion> {
        self.from_history(account, history)
            .or_else(|| self.from_keywords(account))
            .or_else(|| self.from_prefix(account))
    }

    fn from_history(
        &self,
        account: &ImportedAccount,
        history: &[MappingHistoryEntry],
    ) -> Option<MappingSuggestion> {
        let entry = &account.entry;
        // Most frequent pair wins; ties keep the earliest recorded.
        let best = history
            .iter()
            .filter(|h| h.matches(&entry.compte, &entry.intitule))
            .fold(None::<&MappingHistoryEntry>, |best, h| match best {
                Some(b) if b.frequency >= h.frequency => Some(b),
                _ => Some(h),
            })?;
        let confidence = self.policy.history_base_confidence + best.frequency as f32 / 10.0;
        Some(MappingSuggestion {
            source_account: entry.compte.clone(),
            suggested_account: best.target.clone(),
            confidence: Confidence::new(confidence),
            reason: format!("Mapped to {} {} time(s) before", best.target, best.frequency),
            based_on: SuggestionSource::History,
        })
    }

    fn from_keywords(&self, account: &ImportedAccount) -> Option<MappingSuggestion> {
        let rule = self.rules.find_matching_rule(&account.entry.intitule)?;
        Some(MappingSuggestion {
            source_account: account.entry.compte.clone(),
            suggested_account: rule.target.clone(),
            confidence: Confidence::new(rule.confidence),
            reason: rule.describe(),
            based_on: SuggestionSource::Ai,
        })
    }

    fn from_prefix(&self, account: &ImportedAccount) -> Option<MappingSuggestion> {
        let compte = &account.entry.compte;
        if leading_digits(compte) < 3 {
            return None;
        }
        let class = compte.chars().next()?;
        let label = class_label(class)?;
        Some(MappingSuggestion {
            source_account: compte.clone(),
            suggested_account: compte[..3].to_string(),
            confidence: Confidence::new(self.policy.prefix_rule_confidence),
            reason: format!("SYSCOHADA class {class}: {label}"),
            based_on: SuggestionSource::Rules,
        })
    }
}

/// Review state of the mapping step: entries, pending suggestions and the
/// history that accepted decisions are written back to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingSession {
    pub accounts: Vec<ImportedAccount>,
    pub pending: Vec<MappingSuggestion>,
    pub unmapped: Vec<String>,
    /// History loaded for this run, updated as decisions are made.
    pub history: Vec<MappingHistoryEntry>,
    /// `(source, target)` pairs decided during this session, in order.
    /// These are what gets merged into the stored history.
    #[serde(default)]
    pub learned: Vec<(String, String)>,
    pub manual_corrections: usize,
}

impl MappingSession {
    pub fn new(
        accounts: Vec<ImportedAccount>,
        set: SuggestionSet,
        history: Vec<MappingHistoryEntry>,
    ) -> Self {
        Self {
            accounts,
            pending: set.suggestions,
            unmapped: set.unmapped,
            history,
            learned: Vec::new(),
            manual_corrections: 0,
        }
    }

    /// Applies the first pending suggestion for `source_account` and removes
    /// exactly that suggestion. Confidence never decreases.
    pub fn accept(&mut self, source_account: &str) -> Result<MappingSuggestion, MappingError> {
        let idx = self
            .pending
            .iter()
            .position(|s| s.source_account == source_account)
            .ok_or_else(|| MappingError::NoPendingSuggestion(source_account.to_string()))?;
        let suggestion = self.pending.remove(idx);
        self.apply(&suggestion);
        Ok(suggestion)
    }

    /// Applies every pending suggestion. Returns how many were applied.
    pub fn accept_all(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        for suggestion in &pending {
            self.apply(suggestion);
        }
        pending.len()
    }

    /// Discards the first pending suggestion for `source_account`; the entry
    /// keeps its current mapping.
    pub fn reject(&mut self, source_account: &str) -> Result<MappingSuggestion, MappingError> {
        let idx = self
            .pending
            .iter()
            .position(|s| s.source_account == source_account)
            .ok_or_else(|| MappingError::NoPendingSuggestion(source_account.to_string()))?;
        Ok(self.pending.remove(idx))
    }

    /// User-chosen target. Resolves any pending suggestion for the account.
    pub fn map_manually(&mut self, compte: &str, target: &str) -> Result<(), MappingError> {
        let target = target.trim();
        if target.is_empty() || !target.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MappingError::InvalidTarget(target.to_string()));
        }
        let mut found = false;
        for account in self.accounts.iter_mut().filter(|a| a.entry.compte == compte) {
            account.mapped_account = Some(target.to_string());
            account.mapping_confidence = Confidence::MAX;
            found = true;
        }
        if !found {
            return Err(MappingError::UnknownAccount(compte.to_string()));
        }
        self.pending.retain(|s| s.source_account != compte);
        self.unmapped.retain(|c| c != compte);
        self.manual_corrections += 1;
        self.learn(compte, target);
        tracing::debug!(compte, target, "manual mapping");
        Ok(())
    }

    fn learn(&mut self, source: &str, target: &str) {
        record_mapping(&mut self.history, source, target);
        self.learned.push((source.to_string(), target.to_string()));
    }

    fn apply(&mut self, suggestion: &MappingSuggestion) {
        for account in self
            .accounts
            .iter_mut()
            .filter(|a| a.entry.compte == suggestion.source_account)
        {
            account.mapped_account = Some(suggestion.suggested_account.clone());
            account.mapping_confidence = account.mapping_confidence.max(suggestion.confidence);
        }
        self.learn(&suggestion.source_account, &suggestion.suggested_account);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liasse_core::BalanceEntry;

    fn account(compte: &str, intitule: &str) -> ImportedAccount {
        ImportedAccount::new(BalanceEntry::new(compte, intitule))
    }

    #[test]
    fn premap_uses_length_based_confidence() {
        let mut accounts = vec![account("411", "Clients"), account("40110000", "X"), account("CLI01", "Y")];
        premap(&mut accounts);
        assert_eq!(accounts[0].mapped_account.as_deref(), Some("411"));
        assert_eq!(accounts[0].mapping_confidence.value(), 86.0);
        assert_eq!(accounts[1].mapped_account.as_deref(), Some("401"));
        assert_eq!(accounts[1].mapping_confidence.value(), 92.0);
        assert!(!accounts[2].is_mapped());
    }

    #[test]
    fn history_takes_precedence_over_keywords() {
        let engine = MappingEngine::default();
        let history = vec![MappingHistoryEntry::new("CLI01", "4111", 25)];
        let s = engine.suggest(&account("CLI01", "Clients export"), &history).unwrap();
        assert_eq!(s.suggested_account, "4111");
        assert_eq!(s.based_on, SuggestionSource::History);
        assert_eq!(s.confidence.value(), 92.5);
    }

    #[test]
    fn history_confidence_is_capped() {
        let engine = MappingEngine::default();
        let history = vec![MappingHistoryEntry::new("caisse principale", "571", 500)];
        let s = engine.suggest(&account("C1", "Caisse Principale"), &history).unwrap();
        assert_eq!(s.confidence, Confidence::MAX);
    }

    #[test]
    fn keyword_then_prefix_then_unmapped() {
        let engine = MappingEngine::default();
        let set = engine.generate_suggestions(
            &[
                account("FRN", "Fournisseurs locaux"),
                account("6241", "Entretien"),
                account("ZZ", "Divers"),
                account("901", "Analytique"),
            ],
            &[],
        );
        assert_eq!(set.suggestions.len(), 2);
        assert_eq!(set.suggestions[0].suggested_account, "401");
        assert_eq!(set.suggestions[0].based_on, SuggestionSource::Ai);
        assert_eq!(set.suggestions[0].confidence.value(), 87.0);
        assert_eq!(set.suggestions[1].suggested_account, "624");
        assert_eq!(set.suggestions[1].based_on, SuggestionSource::Rules);
        assert_eq!(set.suggestions[1].confidence.value(), 70.0);
        assert_eq!(set.unmapped, vec!["ZZ".to_string(), "901".to_string()]);
    }

    #[test]
    fn confident_mappings_are_not_reevaluated() {
        let engine = MappingEngine::default();
        let mut accounts = vec![account("411000", "Clients")];
        premap(&mut accounts);
        let set = engine.generate_suggestions(&accounts, &[]);
        assert!(set.suggestions.is_empty());
        assert!(set.unmapped.is_empty());
    }

    #[test]
    fn accept_is_monotonic_and_removes_one_suggestion() {
        let engine = MappingEngine::default();
        let mut accounts = vec![account("BQ1", "Banque SGBCI"), account("CA1", "Caisse")];
        accounts[0].mapping_confidence = Confidence::new(90.0);
        let set = SuggestionSet {
            suggestions: vec![
                engine.suggest(&accounts[0], &[]).unwrap(),
                engine.suggest(&accounts[1], &[]).unwrap(),
            ],
            unmapped: Vec::new(),
        };
        let mut session = MappingSession::new(accounts, set, Vec::new());

        let accepted = session.accept("BQ1").unwrap();
        assert_eq!(accepted.suggested_account, "521");
        assert_eq!(session.pending.len(), 1);
        assert_eq!(session.pending[0].source_account, "CA1");
        assert_eq!(session.accounts[0].mapped_account.as_deref(), Some("521"));
        // 90 existing beats the 86 suggestion.
        assert_eq!(session.accounts[0].mapping_confidence.value(), 90.0);
        assert_eq!(session.history, vec![MappingHistoryEntry::new("BQ1", "521", 1)]);

        assert_eq!(
            session.accept("BQ1"),
            Err(MappingError::NoPendingSuggestion("BQ1".to_string()))
        );
    }

    #[test]
    fn reject_leaves_entry_untouched() {
        let engine = MappingEngine::default();
        let accounts = vec![account("V1", "Ventes export")];
        let set = engine.generate_suggestions(&accounts, &[]);
        let mut session = MappingSession::new(accounts, set, Vec::new());
        session.reject("V1").unwrap();
        assert!(session.pending.is_empty());
        assert!(!session.accounts[0].is_mapped());
        assert!(session.history.is_empty());
        assert!(session.learned.is_empty());
    }

    #[test]
    fn accept_all_applies_everything_and_learns() {
        let engine = MappingEngine::default();
        let accounts = vec![account("E1", "Emprunt BOAD"), account("A1", "Achats divers")];
        let set = engine.generate_suggestions(&accounts, &[]);
        let mut session = MappingSession::new(
            accounts,
            set,
            vec![MappingHistoryEntry::new("A1", "601", 3)],
        );
        assert_eq!(session.accept_all(), 2);
        assert!(session.pending.is_empty());
        assert!(session.accounts.iter().all(|a| a.is_mapped()));
        assert_eq!(session.history[0].frequency, 4);
        assert_eq!(session.history[1], MappingHistoryEntry::new("E1", "162", 1));
        // Only this session's decisions are carried to the store.
        assert_eq!(
            session.learned,
            vec![
                ("E1".to_string(), "162".to_string()),
                ("A1".to_string(), "601".to_string())
            ]
        );
    }

    #[test]
    fn manual_mapping_counts_as_correction() {
        let engine = MappingEngine::default();
        let accounts = vec![account("ZZ", "Divers"), account("C9", "Clients douteux")];
        let set = engine.generate_suggestions(&accounts, &[]);
        let mut session = MappingSession::new(accounts, set, Vec::new());

        session.map_manually("ZZ", "471").unwrap();
        session.map_manually("C9", "416").unwrap();
        assert_eq!(session.manual_corrections, 2);
        assert!(session.pending.is_empty());
        assert!(session.unmapped.is_empty());
        assert_eq!(session.accounts[1].mapping_confidence, Confidence::MAX);

        assert_eq!(
            session.map_manually("NOPE", "471"),
            Err(MappingError::UnknownAccount("NOPE".to_string()))
        );
        assert_eq!(
            session.map_manually("ZZ", " "),
            Err(MappingError::InvalidTarget(String::new()))
        );
    }
}
