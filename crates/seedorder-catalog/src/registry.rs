//! Active-seed registry
//!
//! Remembers, per `(table, kind)`, which seed file was last loaded and the
//! content hash it had at the time. The change gate compares against this
//! record to decide whether a table can be skipped.

use seedorder_core::{ActiveSeed, SeedFileRecord, SeedKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

/// Errors that can occur while reading or writing the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Store of active seed records
#[async_trait::async_trait]
pub trait SeedRegistry: Send + Sync {
    /// The file currently loaded for a table, if any
    async fn get_active_seed_info(
        &self,
        table: &str,
        kind: SeedKind,
    ) -> Result<Option<ActiveSeed>, RegistryError>;

    /// Record that `file_name` (with `content_hash`) is now loaded
    async fn log_seeded_file(
        &self,
        table: &str,
        kind: SeedKind,
        file_name: &str,
        content_hash: &str,
    ) -> Result<(), RegistryError>;

    /// Forget the active record of a table
    async fn clear_active_seed_info(&self, table: &str, kind: SeedKind)
        -> Result<(), RegistryError>;

    /// Every active record, ordered by table then kind
    async fn active_records(&self) -> Result<Vec<SeedFileRecord>, RegistryError>;
}

type RecordKey = (String, SeedKind);

fn key(table: &str, kind: SeedKind) -> RecordKey {
    (table.to_string(), kind)
}

/// In-process registry
///
/// Used by tests and by one-shot runs that do not need to persist
/// anything between invocations.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: RwLock<BTreeMap<RecordKey, SeedFileRecord>>,
    unavailable: bool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail, as if the backing store were down
    pub fn unavailable() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            unavailable: true,
        }
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.unavailable {
            Err(RegistryError::Unavailable(
                "Simulated registry failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl SeedRegistry for MemoryRegistry {
    async fn get_active_seed_info(
        &self,
        table: &str,
        kind: SeedKind,
    ) -> Result<Option<ActiveSeed>, RegistryError> {
        self.check()?;
        Ok(self
            .records
            .read()
            .await
            .get(&key(table, kind))
            .map(SeedFileRecord::active))
    }

    async fn log_seeded_file(
        &self,
        table: &str,
        kind: SeedKind,
        file_name: &str,
        content_hash: &str,
    ) -> Result<(), RegistryError> {
        self.check()?;
        let record = SeedFileRecord::new(table, kind, file_name, content_hash);
        self.records.write().await.insert(key(table, kind), record);
        Ok(())
    }

    async fn clear_active_seed_info(
        &self,
        table: &str,
        kind: SeedKind,
    ) -> Result<(), RegistryError> {
        self.check()?;
        self.records.write().await.remove(&key(table, kind));
        Ok(())
    }

    async fn active_records(&self) -> Result<Vec<SeedFileRecord>, RegistryError> {
        self.check()?;
        Ok(self.records.read().await.values().cloned().collect())
    }
}

/// Registry persisted as a JSON array of [`SeedFileRecord`]s
///
/// A missing file is an empty registry. Writes go to a sibling temporary
/// file that is then renamed over the registry.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,

    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<RecordKey, SeedFileRecord>, RegistryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(RegistryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let records: Vec<SeedFileRecord> =
            serde_json::from_str(&contents).map_err(|source| RegistryError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(records
            .into_iter()
            .map(|r| (key(&r.table, r.kind), r))
            .collect())
    }

    async fn store(&self, records: &BTreeMap<RecordKey, SeedFileRecord>) -> Result<(), RegistryError> {
        let write_err = |source| RegistryError::Write {
            path: self.path.clone(),
            source,
        };

        let list: Vec<&SeedFileRecord> = records.values().collect();
        let json = serde_json::to_string_pretty(&list)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let staging = self.path.with_extension("json.partial");
        tokio::fs::write(&staging, json).await.map_err(write_err)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SeedRegistry for JsonFileRegistry {
    async fn get_active_seed_info(
        &self,
        table: &str,
        kind: SeedKind,
    ) -> Result<Option<ActiveSeed>, RegistryError> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        Ok(records.get(&key(table, kind)).map(SeedFileRecord::active))
    }

    async fn log_seeded_file(
        &self,
        table: &str,
        kind: SeedKind,
        file_name: &str,
        content_hash: &str,
    ) -> Result<(), RegistryError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(
            key(table, kind),
            SeedFileRecord::new(table, kind, file_name, content_hash),
        );
        self.store(&records).await?;

        tracing::debug!(table, %kind, file = file_name, "recorded active seed");
        Ok(())
    }

    async fn clear_active_seed_info(
        &self,
        table: &str,
        kind: SeedKind,
    ) -> Result<(), RegistryError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(&key(table, kind)).is_some() {
            self.store(&records).await?;
            tracing::debug!(table, %kind, "cleared active seed");
        }
        Ok(())
    }

    async fn active_records(&self) -> Result<Vec<SeedFileRecord>, RegistryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_values().collect())
    }
}
