use thiserror::Error;

/// Fatal failures: the run stops and no report is produced.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("File is empty or contains no readable data")]
    EmptyFile,
    #[error("No data rows after the header row")]
    NoDataRows,
    #[error("Malformed {format} input: {message}")]
    Malformed { format: &'static str, message: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Excel(#[from] calamine::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not detect debit or credit columns in headers: {0:?}")]
    UndetectableStructure(Vec<String>),
    #[error("No valid balance line found ({skipped} rows skipped)")]
    NoValidEntries { skipped: usize },
}

impl ImportError {
    pub(crate) fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        ImportError::Malformed {
            format,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid rule '{name}': {message}")]
    InvalidRule { name: String, message: String },
}

/// Rejected user action on the mapping review; the session is left unchanged.
#[derive(Error, Debug, PartialEq)]
pub enum MappingError {
    #[error("No pending suggestion for account {0}")]
    NoPendingSuggestion(String),
    #[error("Unknown account {0}")]
    UnknownAccount(String),
    #[error("Invalid target account '{0}'")]
    InvalidTarget(String),
}
