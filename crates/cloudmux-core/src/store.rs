//! Key/value store collaborator
//!
//! Connection configs and the NameId/SystemId mapping are the only state the
//! control plane persists. Storage is behind [`KvStore`]; values are JSON.
//!
//! [`FileKvStore`] keeps everything in `<dir>/store.json`. A write goes to
//! `store.json.tmp` first and is renamed over the store file, after the
//! previous file was copied to `store.json.backup`. Opening falls back to the
//! backup when the store file is missing.

use crate::error::{CoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

const STORE_VERSION: u32 = 1;
const STORE_FILE: &str = "store.json";
const STORE_BACKUP: &str = "store.json.backup";
const STORE_TMP: &str = "store.json.tmp";

/// Narrow storage interface the core depends on
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All entries whose key starts with `prefix`, ordered by key
    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>>;
}

/// Escapes a name for use as one key segment
pub fn escape(name: &str) -> String {
    name.replace('%', "%25").replace('/', "%2F")
}

pub fn unescape(segment: &str) -> String {
    segment.replace("%2F", "/").replace("%25", "%")
}

pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub(crate) async fn put_json<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    store.put(key, serde_json::to_string(value)?).await
}

pub(crate) async fn list_json<T: serde::de::DeserializeOwned>(
    store: &dyn KvStore,
    prefix: &str,
) -> Result<Vec<T>> {
    store
        .list(prefix)
        .await?
        .into_iter()
        .map(|(_, raw)| serde_json::from_str(&raw).map_err(CoreError::from))
        .collect()
}

fn range<'a>(
    entries: &'a BTreeMap<String, String>,
    prefix: &'a str,
) -> impl Iterator<Item = (String, String)> + 'a {
    entries
        .range(prefix.to_string()..)
        .take_while(move |(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
}

/// Process-local store; contents are lost on exit
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let entries = self.entries.read().await;
        Ok(range(&entries, prefix).collect())
    }
}

/// On-disk document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    updated_at: DateTime<Utc>,
    entries: BTreeMap<String, String>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            updated_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }
}

/// JSON file store for a single control plane process
#[derive(Debug)]
pub struct FileKvStore {
    dir: PathBuf,
    doc: Mutex<StoreDocument>,
}

async fn read_document(path: &Path) -> Result<StoreDocument> {
    let content = fs::read_to_string(path).await?;
    let doc: StoreDocument = serde_json::from_str(&content)?;

    // Version check
    if doc.version > STORE_VERSION {
        return Err(CoreError::Store(format!(
            "Store file version {} is newer than supported version {}",
            doc.version, STORE_VERSION
        )));
    }
    Ok(doc)
}

impl FileKvStore {
    /// Opens (or starts) the store in `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(STORE_FILE);
        let backup = dir.join(STORE_BACKUP);

        let doc = if path.exists() {
            let doc = read_document(&path).await?;
            tracing::debug!("Loaded store with {} entries", doc.entries.len());
            doc
        } else if backup.exists() {
            let doc = read_document(&backup).await?;
            tracing::warn!(
                "Store file missing, recovered {} entries from {}",
                doc.entries.len(),
                backup.display()
            );
            doc
        } else {
            tracing::debug!("Store file not found, starting empty");
            StoreDocument::default()
        };

        Ok(Self {
            dir,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    async fn save(&self, doc: &StoreDocument) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
            tracing::debug!("Created store directory: {}", self.dir.display());
        }

        let path = self.path();
        let tmp = self.dir.join(STORE_TMP);
        let backup = self.dir.join(STORE_BACKUP);

        let content = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, content).await?;

        // The store file stays in place until the rename replaces it
        if path.exists() {
            fs::copy(&path, &backup).await?;
        }
        fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved store with {} entries", doc.entries.len());
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.doc.lock().await.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        next.entries.insert(key.to_string(), value);
        next.updated_at = Utc::now();
        self.save(&next).await?;
        *doc = next;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut doc = self.doc.lock().await;
        if !doc.entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = doc.clone();
        next.entries.remove(key);
        next.updated_at = Utc::now();
        self.save(&next).await?;
        *doc = next;
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let doc = self.doc.lock().await;
        Ok(range(&doc.entries, prefix).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_escape_roundtrip() {
        assert_eq!(escape("a/b"), "a%2Fb");
        assert_eq!(unescape(&escape("50%/x")), "50%/x");
    }

    #[tokio::test]
    async fn test_memory_list_prefix() {
        let store = MemoryKvStore::new();
        store.put("/iid/c1/VPC/a", "1".into()).await.unwrap();
        store.put("/iid/c1/VPC/b", "2".into()).await.unwrap();
        store.put("/iid/c1/VPCX/c", "3".into()).await.unwrap();
        store.put("/iid/c2/VPC/a", "4".into()).await.unwrap();

        let listed = store.list("/iid/c1/VPC/").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0, "/iid/c1/VPC/a");

        assert!(store.delete("/iid/c1/VPC/a").await.unwrap());
        assert!(!store.delete("/iid/c1/VPC/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let temp_dir = tempdir().unwrap();

        let store = FileKvStore::open(temp_dir.path()).await.unwrap();
        store.put("/driver/mock", "{}".into()).await.unwrap();
        store.put("/driver/aws", "{}".into()).await.unwrap();
        assert!(temp_dir.path().join(STORE_BACKUP).exists());
        drop(store);

        let reopened = FileKvStore::open(temp_dir.path()).await.unwrap();
        assert_eq!(reopened.list("/driver/").await.unwrap().len(), 2);
        assert_eq!(reopened.get("/driver/mock").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_file_store_writes_leave_no_temp_file() {
        let temp_dir = tempdir().unwrap();

        let store = FileKvStore::open(temp_dir.path()).await.unwrap();
        store.put("/iid/a", "one".into()).await.unwrap();
        store.put("/iid/b", "two".into()).await.unwrap();

        assert!(store.path().exists());
        assert!(!temp_dir.path().join(STORE_TMP).exists());

        // The backup holds the state before the last write
        let backup = read_document(&temp_dir.path().join(STORE_BACKUP)).await.unwrap();
        assert_eq!(backup.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_recovers_from_backup() {
        let temp_dir = tempdir().unwrap();

        let store = FileKvStore::open(temp_dir.path()).await.unwrap();
        store.put("/iid/a", "one".into()).await.unwrap();
        store.put("/iid/b", "two".into()).await.unwrap();
        store.put("/iid/c", "three".into()).await.unwrap();
        std::fs::remove_file(store.path()).unwrap();
        drop(store);

        let reopened = FileKvStore::open(temp_dir.path()).await.unwrap();
        assert_eq!(reopened.get("/iid/a").await.unwrap().as_deref(), Some("one"));
        assert_eq!(reopened.get("/iid/b").await.unwrap().as_deref(), Some("two"));
        assert_eq!(reopened.get("/iid/c").await.unwrap(), None);

        // The next write restores the store file
        reopened.put("/iid/c", "three".into()).await.unwrap();
        assert!(reopened.path().exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_newer_version() {
        let temp_dir = tempdir().unwrap();
        let doc = serde_json::json!({
            "version": STORE_VERSION + 1,
            "updated_at": Utc::now(),
            "entries": {}
        });
        std::fs::write(temp_dir.path().join(STORE_FILE), doc.to_string()).unwrap();

        let result = FileKvStore::open(temp_dir.path()).await;
        assert!(matches!(result, Err(CoreError::Store(_))));
    }
}
