pub mod error;
pub mod kv;
pub mod repository;
pub mod service;
pub mod sqlite;

pub use error::{ServiceError, StoreError};
pub use kv::{KeyValueStore, MemoryStore};
pub use repository::{BalanceRepository, ImportRecord, StoredBalance};
pub use service::ImportService;
pub use sqlite::{create_db, DbPool, SqliteStore};
