use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{Error, Result};

/// Key-value access to the shared tables. Values are JSON documents.
///
/// Every call may block on I/O; these are the only suspension points of the
/// solver apart from the worker queues.
pub trait RemoteTableClient: std::fmt::Debug + Send + Sync {
    fn get_value(&self, table: &str, key: &str) -> Result<Option<String>>;
    fn set_value(&self, table: &str, key: &str, value: &str) -> Result<()>;
    fn remove_key(&self, table: &str, key: &str) -> Result<()>;
    fn get_keys(&self, table: &str) -> Result<Vec<String>>;

    fn key_exists(&self, table: &str, key: &str) -> Result<bool> {
        Ok(self.get_value(table, key)?.is_some())
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    tables: HashMap<String, BTreeMap<String, String>>,
}

/// Process-local table store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTableStore {
    /// All tables are protected with a single lock.
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(table: &str) -> Error {
        Error::TableUnavailable(format!("lock for table '{}' is poisoned", table))
    }
}

impl RemoteTableClient for InMemoryTableStore {
    fn get_value(&self, table: &str, key: &str) -> Result<Option<String>> {
        let guard = self.inner.read().map_err(|_| Self::poisoned(table))?;
        Ok(guard.tables.get(table).and_then(|entries| entries.get(key)).cloned())
    }

    fn set_value(&self, table: &str, key: &str, value: &str) -> Result<()> {
        let mut guard = self.inner.write().map_err(|_| Self::poisoned(table))?;
        guard.tables.entry(table.to_string()).or_default().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_key(&self, table: &str, key: &str) -> Result<()> {
        let mut guard = self.inner.write().map_err(|_| Self::poisoned(table))?;
        if let Some(entries) = guard.tables.get_mut(table) {
            entries.remove(key);
        }
        Ok(())
    }

    fn get_keys(&self, table: &str) -> Result<Vec<String>> {
        let guard = self.inner.read().map_err(|_| Self::poisoned(table))?;
        Ok(guard.tables.get(table).map(|entries| entries.keys().cloned().collect()).unwrap_or_default())
    }
}

/// Tables persisted as one JSON object per file (`<root>/<table>.json`).
///
/// Used by the command line entry point. Each table file maps keys to JSON
/// documents; writes rewrite the whole file through a temporary file.
#[derive(Debug, Clone)]
pub struct DirectoryTableStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl DirectoryTableStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, write_lock: Arc::new(Mutex::new(())) })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.json", table))
    }

    fn read_table(&self, table: &str) -> Result<BTreeMap<String, serde_json::Value>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&path).map_err(|e| Error::TableUnavailable(format!("{}: {}", path.display(), e)))?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write_table(&self, table: &str, entries: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        let path = self.table_path(table);
        let tmp_path = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp_path, data).map_err(|e| Error::TableUnavailable(format!("{}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &path).map_err(|e| Error::TableUnavailable(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    fn modify<F>(&self, table: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, serde_json::Value>) -> Result<()>,
    {
        let _guard = self.write_lock.lock().map_err(|_| Error::TableUnavailable(format!("write lock for '{}' is poisoned", table)))?;
        let mut entries = self.read_table(table)?;
        change(&mut entries)?;
        self.write_table(table, &entries)
    }
}

impl RemoteTableClient for DirectoryTableStore {
    fn get_value(&self, table: &str, key: &str) -> Result<Option<String>> {
        let entries = self.read_table(table)?;
        match entries.get(key) {
            Some(value) => Ok(Some(serde_json::to_string(value)?)),
            None => Ok(None),
        }
    }

    fn set_value(&self, table: &str, key: &str, value: &str) -> Result<()> {
        let document: serde_json::Value = serde_json::from_str(value)?;
        self.modify(table, |entries| {
            entries.insert(key.to_string(), document);
            Ok(())
        })
    }

    fn remove_key(&self, table: &str, key: &str) -> Result<()> {
        self.modify(table, |entries| {
            entries.remove(key);
            Ok(())
        })
    }

    fn get_keys(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.read_table(table)?.into_keys().collect())
    }
}
