use chrono::{DateTime, Utc};
use liasse_core::{record_mapping, BalanceEntry, Exercice, MappingHistoryEntry};
use liasse_import::ImportReport;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::kv::KeyValueStore;

/// One committed version of a trial balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBalance {
    pub exercice: Exercice,
    pub version: u32,
    pub imported_at: DateTime<Utc>,
    pub source_file: String,
    pub entries: Vec<BalanceEntry>,
}

/// Import-history record: the report of a committed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub exercice: Exercice,
    pub version: u32,
    pub report: ImportReport,
}

/// Tenant-scoped view over a key/value store. Values are JSON documents under
/// `{tenant}/mapping_history`, `{tenant}/import_history` and
/// `{tenant}/balances/{exercice}/v{n}` with a `latest` pointer per exercice.
pub struct BalanceRepository<S: KeyValueStore> {
    store: S,
    tenant: String,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> BalanceRepository<S> {
    pub fn new(store: S, tenant: &str) -> Self {
        Self {
            store,
            tenant: tenant.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}/{}", self.tenant, suffix)
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    pub async fn mapping_history(&self) -> Result<Vec<MappingHistoryEntry>, StoreError> {
        Ok(self
            .read(&self.key("mapping_history"))
            .await?
            .unwrap_or_default())
    }

    /// Merges `(source, target)` decisions into the stored history: each pair
    /// bumps an existing frequency or is inserted with frequency 1. The read
    /// and the write happen under the repository write lock.
    pub async fn record_mappings(
        &self,
        learned: &[(String, String)],
    ) -> Result<Vec<MappingHistoryEntry>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut history = self.mapping_history().await?;
        if learned.is_empty() {
            return Ok(history);
        }
        for (source, target) in learned {
            record_mapping(&mut history, source, target);
        }
        self.write(&self.key("mapping_history"), &history).await?;
        Ok(history)
    }

    pub async fn latest_version(&self, exercice: Exercice) -> Result<Option<u32>, StoreError> {
        self.read(&self.key(&format!("balances/{exercice}/latest")))
            .await
    }

    pub async fn load_balance_version(
        &self,
        exercice: Exercice,
        version: u32,
    ) -> Result<Option<StoredBalance>, StoreError> {
        self.read(&self.key(&format!("balances/{exercice}/v{version}")))
            .await
    }

    /// Latest committed version for the exercice, if any.
    pub async fn load_balance(
        &self,
        exercice: Exercice,
    ) -> Result<Option<StoredBalance>, StoreError> {
        match self.latest_version(exercice).await? {
            Some(version) => self.load_balance_version(exercice, version).await,
            None => Ok(None),
        }
    }

    /// Stores `entries` as a new version; earlier versions stay readable.
    pub async fn append_balance(
        &self,
        exercice: Exercice,
        source_file: &str,
        entries: &[BalanceEntry],
    ) -> Result<u32, StoreError> {
        let _guard = self.write_lock.lock().await;
        let version = self.latest_version(exercice).await?.unwrap_or(0) + 1;
        let stored = StoredBalance {
            exercice,
            version,
            imported_at: Utc::now(),
            source_file: source_file.to_string(),
            entries: entries.to_vec(),
        };
        self.write(&self.key(&format!("balances/{exercice}/v{version}")), &stored)
            .await?;
        self.write(&self.key(&format!("balances/{exercice}/latest")), &version)
            .await?;
        tracing::debug!(tenant = %self.tenant, %exercice, version, "balance version stored");
        Ok(version)
    }

    pub async fn import_history(&self) -> Result<Vec<ImportRecord>, StoreError> {
        Ok(self
            .read(&self.key("import_history"))
            .await?
            .unwrap_or_default())
    }

    pub async fn record_import(&self, record: ImportRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut history = self.import_history().await?;
        history.push(record);
        self.write(&self.key("import_history"), &history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use liasse_core::Money;

    fn entries(amount: i64) -> Vec<BalanceEntry> {
        vec![BalanceEntry::new("601", "Achats").with_closing(Money::from(amount), Money::zero())]
    }

    #[tokio::test]
    async fn reimport_appends_a_new_version() {
        let repo = BalanceRepository::new(MemoryStore::new(), "acme");
        let exercice = Exercice::new(2024);
        assert_eq!(repo.load_balance(exercice).await.unwrap(), None);

        assert_eq!(repo.append_balance(exercice, "v1.csv", &entries(100)).await.unwrap(), 1);
        assert_eq!(repo.append_balance(exercice, "v2.csv", &entries(200)).await.unwrap(), 2);

        let latest = repo.load_balance(exercice).await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.entries, entries(200));
        let first = repo.load_balance_version(exercice, 1).await.unwrap().unwrap();
        assert_eq!(first.source_file, "v1.csv");
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let acme = BalanceRepository::new(store.clone(), "acme");
        let other = BalanceRepository::new(store.clone(), "other");

        let learned = [("CLT".to_string(), "411".to_string())];
        acme.record_mappings(&learned).await.unwrap();
        acme.record_mappings(&learned).await.unwrap();
        assert_eq!(acme.mapping_history().await.unwrap().len(), 1);
        assert!(other.mapping_history().await.unwrap().is_empty());
        assert_eq!(
            store.get("acme/mapping_history").await.unwrap().as_deref(),
            Some(r#"[{"source":"CLT","target":"411","frequency":2}]"#)
        );
    }

    #[tokio::test]
    async fn recorded_mappings_merge_with_stored_history() {
        let repo = BalanceRepository::new(MemoryStore::new(), "acme");
        repo.record_mappings(&[("CLT".to_string(), "411".to_string())])
            .await
            .unwrap();
        let merged = repo
            .record_mappings(&[
                ("FRN".to_string(), "401".to_string()),
                ("CLT".to_string(), "411".to_string()),
            ])
            .await
            .unwrap();
        assert_eq!(
            merged,
            vec![
                MappingHistoryEntry::new("CLT", "411", 2),
                MappingHistoryEntry::new("FRN", "401", 1),
            ]
        );
        assert_eq!(repo.mapping_history().await.unwrap(), merged);
    }

    #[tokio::test]
    async fn corrupt_value_is_reported_with_its_key() {
        let store = MemoryStore::new();
        store.set("acme/mapping_history", "not json".to_string()).await.unwrap();
        let repo = BalanceRepository::new(store, "acme");
        match repo.mapping_history().await {
            Err(StoreError::Corrupt { key, .. }) => assert_eq!(key, "acme/mapping_history"),
            other => panic!("expected corrupt value, got {other:?}"),
        }
    }
}
