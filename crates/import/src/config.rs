use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ImportError};
use crate::rules::{default_keyword_rules, KeywordRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Excel,
    Csv,
    Xml,
    Json,
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFormat::Excel => write!(f, "excel"),
            ImportFormat::Csv => write!(f, "csv"),
            ImportFormat::Xml => write!(f, "xml"),
            ImportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ImportFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "excel" | "xlsx" | "xls" | "xlsb" | "ods" => Ok(ImportFormat::Excel),
            "csv" | "txt" | "tsv" => Ok(ImportFormat::Csv),
            "xml" => Ok(ImportFormat::Xml),
            "json" => Ok(ImportFormat::Json),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ImportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }

    /// Guesses the format from the leading bytes of the file.
    pub fn sniff(data: &[u8]) -> Self {
        const ZIP: &[u8] = b"PK\x03\x04";
        const CFB: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

        if data.starts_with(ZIP) || data.starts_with(CFB) {
            return ImportFormat::Excel;
        }
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        match data.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => ImportFormat::Xml,
            Some(b'[') | Some(b'{') => ImportFormat::Json,
            _ => ImportFormat::Csv,
        }
    }
}

/// Policy constants carried over from production behaviour. Changing any of
/// these changes the meaning of stored confidences and alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub structure_base_confidence: u8,
    pub account_number_increment: u8,
    pub account_name_increment: u8,
    pub debit_increment: u8,
    pub credit_increment: u8,
    /// Structures at or below this confidence are surfaced with a warning.
    pub structure_warning_threshold: u8,
    pub sample_rows: usize,
    /// Absolute variation percentage from which an N/N-1 change is significant.
    pub variance_significance: f64,
    /// Imbalances beyond `tolerance * severity_factor` annotate every entry.
    pub severity_factor: Decimal,
    /// Mappings at or above this confidence are never re-evaluated.
    pub reevaluation_threshold: f32,
    /// Mappings strictly above this confidence count as auto-mapped.
    pub auto_mapped_threshold: f32,
    pub history_base_confidence: f32,
    pub prefix_rule_confidence: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            structure_base_confidence: 50,
            account_number_increment: 15,
            account_name_increment: 15,
            debit_increment: 10,
            credit_increment: 10,
            structure_warning_threshold: 90,
            sample_rows: 5,
            variance_significance: 50.0,
            severity_factor: Decimal::from(1000),
            reevaluation_threshold: 80.0,
            auto_mapped_threshold: 80.0,
            history_base_confidence: 90.0,
            prefix_rule_confidence: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Declared format; guessed from the file name or content when absent.
    pub format: Option<ImportFormat>,
    pub separator: Option<char>,
    pub encoding: Option<String>,
    pub tolerance: Decimal,
    /// Pre-map accounts with at least three leading digits onto their
    /// three-digit SYSCOHADA prefix during normalization.
    pub prefix_premap: bool,
    /// Opt-in: skip rows whose account cell starts with "total".
    pub skip_total_rows: bool,
    pub policy: PolicyConfig,
    pub rules: Vec<KeywordRule>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            format: None,
            separator: None,
            encoding: None,
            tolerance: Decimal::new(1, 2),
            prefix_premap: true,
            skip_total_rows: false,
            policy: PolicyConfig::default(),
            rules: default_keyword_rules(),
        }
    }
}

impl ImportConfig {
    /// Parses a TOML document. Every `[[rules]]` entry is validated.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        for rule in &config.rules {
            rule.validate()?;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn severity_threshold(&self) -> Decimal {
        self.tolerance.saturating_mul(self.policy.severity_factor)
    }
}
