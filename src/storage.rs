use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// File name of the on-disk medium inside the data directory.
pub const STORE_FILE_NAME: &str = "store.json";

/// Key-value medium the data store persists into.
///
/// `set` and `remove` only stage a change; `save` makes everything staged
/// durable.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn save(&self) -> anyhow::Result<()>;
}

#[derive(Default)]
struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .lock()
            .map(|guard| guard.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.remove(key);
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// JSON object file mapping each key to its serialized value.
struct FileStore {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    fn open(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }

        let data = match fs::read_to_string(&path) {
            Ok(raw) => decode_file(&path, &raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("read store file {}", path.display()))
            }
        };
        debug!(
            target: "taskforge",
            event = "file_store_opened",
            path = %path.display(),
            keys = data.len()
        );

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }
}

fn decode_file(path: &Path, raw: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<BTreeMap<String, Value>>(raw) {
        Ok(entries) => entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) => (key, text),
                other => (key, other.to_string()),
            })
            .collect(),
        Err(err) => {
            warn!(
                target: "taskforge",
                event = "file_store_corrupt",
                path = %path.display(),
                error = %err
            );
            BTreeMap::new()
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .lock()
            .map(|guard| guard.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.remove(key);
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        let bytes = {
            let guard = self
                .data
                .lock()
                .map_err(|_| anyhow::anyhow!("store map poisoned"))?;
            serde_json::to_vec_pretty(&*guard).context("serialize store file")?
        };
        write_atomic(&self.path, &bytes)
            .with_context(|| format!("write store file {}", self.path.display()))
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so readers
/// see either the old contents or the new ones. The parent must already exist.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn KeyValueStore + Send + Sync>,
}

impl StoreHandle {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(MemoryStore::default()),
        }
    }

    /// Open (or create) `store.json` under `dir`.
    pub fn file(dir: &Path) -> anyhow::Result<Self> {
        let store = FileStore::open(dir.join(STORE_FILE_NAME))?;
        Ok(Self {
            inner: Arc::new(store),
        })
    }

    pub fn custom(store: Arc<dyn KeyValueStore + Send + Sync>) -> Self {
        Self { inner: store }
    }

    pub fn read(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn write(&self, key: &str, value: &str) {
        self.inner.set(key, value);
    }

    pub fn clear(&self, key: &str) {
        self.inner.remove(key);
    }

    pub fn persist(&self) -> anyhow::Result<()> {
        self.inner.save()
    }
}
