use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::util::similarity;

/// Maps account labels matching `pattern` onto a target SYSCOHADA account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub target: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl KeywordRule {
    pub fn contains(name: &str, pattern: &str, target: &str, confidence: f32) -> Self {
        KeywordRule {
            name: name.to_string(),
            priority: 0,
            pattern: pattern.to_string(),
            match_type: MatchType::Contains,
            target: target.to_string(),
            confidence,
            reason: None,
        }
    }

    pub fn describe(&self) -> String {
        match &self.reason {
            Some(reason) => reason.clone(),
            None => format!("Label matches keyword \"{}\"", self.pattern),
        }
    }

    /// Rejects rules that could never match or would yield an out-of-range score.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidRule {
            name: self.name.clone(),
            message,
        };
        if self.pattern.trim().is_empty() {
            return Err(invalid("empty pattern".to_string()));
        }
        if self.target.trim().is_empty() {
            return Err(invalid("empty target account".to_string()));
        }
        if !(0.0..=100.0).contains(&self.confidence) {
            return Err(invalid(format!("confidence {} outside 0..=100", self.confidence)));
        }
        match &self.match_type {
            MatchType::Regex => {
                regex::Regex::new(&self.pattern).map_err(|e| invalid(e.to_string()))?;
            }
            MatchType::Fuzzy { threshold } if !(0.0..=1.0).contains(threshold) => {
                return Err(invalid(format!("fuzzy threshold {threshold} outside 0..=1")));
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
    Fuzzy {
        threshold: f32,
    },
}

/// The ordered label heuristic: capital, clients, suppliers, bank, cash,
/// borrowings, purchases, sales.
pub fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::contains("capital", "capital", "101", 85.0),
        KeywordRule::contains("clients", "client", "411", 88.0),
        KeywordRule::contains("fournisseurs", "fournisseur", "401", 87.0),
        KeywordRule::contains("banque", "banque", "521", 86.0),
        KeywordRule::contains("caisse", "caisse", "571", 86.0),
        KeywordRule::contains("emprunts", "emprunt", "162", 85.0),
        KeywordRule::contains("achats", "achat", "601", 85.0),
        KeywordRule::contains("ventes", "vente", "701", 85.0),
    ]
}

struct CompiledRule {
    rule: KeywordRule,
    compiled_regex: Option<regex::Regex>,
}

pub struct KeywordRuleEngine {
    rules: Vec<CompiledRule>,
}

impl KeywordRuleEngine {
    /// Rules are tried by descending priority; equal priorities keep list order.
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if let MatchType::Regex = &rule.match_type {
                    regex::RegexBuilder::new(&rule.pattern)
                        .case_insensitive(true)
                        .build()
                        .ok()
                } else {
                    None
                };
                CompiledRule { rule, compiled_regex }
            })
            .collect();
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: compiled }
    }

    pub fn find_matching_rule(&self, label: &str) -> Option<&KeywordRule> {
        let text = label.trim().to_lowercase();
        self.rules
            .iter()
            .find(|cr| rule_matches(cr, &text))
            .map(|cr| &cr.rule)
    }
}

impl Default for KeywordRuleEngine {
    fn default() -> Self {
        Self::new(default_keyword_rules())
    }
}

fn rule_matches(cr: &CompiledRule, text: &str) -> bool {
    let pattern = cr.rule.pattern.to_lowercase();
    match &cr.rule.match_type {
        MatchType::Contains => text.contains(&pattern),
        MatchType::Exact => text == pattern,
        MatchType::Regex => cr.compiled_regex.as_ref().is_some_and(|re| re.is_match(text)),
        MatchType::Fuzzy { threshold } => similarity(text, &pattern) >= *threshold,
    }
}
