use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entry::Confidence;

/// Which rule of the mapping cascade produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    History,
    Ai,
    Rules,
    Manual,
}

impl fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionSource::History => write!(f, "history"),
            SuggestionSource::Ai => write!(f, "ai"),
            SuggestionSource::Rules => write!(f, "rules"),
            SuggestionSource::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub source_account: String,
    pub suggested_account: String,
    pub confidence: Confidence,
    pub reason: String,
    pub based_on: SuggestionSource,
}

/// One learned `source -> target` pair. `source` is either an account number
/// or an account label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingHistoryEntry {
    pub source: String,
    pub target: String,
    pub frequency: u32,
}

impl MappingHistoryEntry {
    pub fn new(source: &str, target: &str, frequency: u32) -> Self {
        MappingHistoryEntry {
            source: source.to_string(),
            target: target.to_string(),
            frequency,
        }
    }

    pub fn matches(&self, compte: &str, intitule: &str) -> bool {
        self.source == compte || self.source.to_lowercase() == intitule.to_lowercase()
    }
}

/// Records that `source` was mapped to `target` once more: bumps the
/// frequency of an existing pair or appends a new one.
pub fn record_mapping(history: &mut Vec<MappingHistoryEntry>, source: &str, target: &str) {
    match history
        .iter_mut()
        .find(|h| h.source == source && h.target == target)
    {
        Some(existing) => existing.frequency = existing.frequency.saturating_add(1),
        None => history.push(MappingHistoryEntry::new(source, target, 1)),
    }
}
