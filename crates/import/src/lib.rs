pub mod cell;
pub mod classify;
pub mod config;
pub mod csv;
pub mod decode;
pub mod detect;
pub mod error;
pub mod excel;
pub mod json;
pub mod mapping;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod rules;
pub(crate) mod util;
pub mod validate;
pub mod variance;
pub mod xml;

pub use cell::{Cell, RawMatrix};
pub use classify::classify_account;
pub use config::{ImportConfig, ImportFormat, PolicyConfig};
pub use decode::{decode, DecodeOptions};
pub use detect::{detect_structure, DetectedColumns, FileStructure};
pub use error::{ConfigError, ImportError, MappingError};
pub use mapping::{premap, MappingEngine, MappingSession, SuggestionSet};
pub use normalize::{normalize_rows, parse_amount, NormalizedBalance};
pub use pipeline::{ImportInput, ImportOutcome, ImportPipeline};
pub use report::{ImportReport, MappingStatistics};
pub use rules::{default_keyword_rules, KeywordRule, KeywordRuleEngine, MatchType};
pub use validate::{validate_balance, BalanceCheck};
pub use variance::compare_periods;
