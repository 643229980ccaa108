pub mod account;
pub mod comparison;
pub mod entry;
pub mod mapping;
pub mod money;
pub mod period;

pub use account::{class_label, AccountCategory, SYSCOHADA_CLASSES};
pub use comparison::{Comparison, VarianceAlert};
pub use entry::{BalanceEntry, Confidence, EntryStatus, ImportedAccount};
pub use mapping::{record_mapping, MappingHistoryEntry, MappingSuggestion, SuggestionSource};
pub use money::Money;
pub use period::Exercice;
