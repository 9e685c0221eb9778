//! Key/value stores used to memoize lookups.
//!
//! # Design
//! Keys have the shape `{namespace}:{rest}`. A store either supports
//! namespaces natively (`FileCache` keeps one directory per namespace) or
//! falls back to prefix matching (`MemoryCache`), so `flush_namespace` only
//! removes entries belonging to one user of a shared store. A key without a
//! separator belongs to no namespace and is never flushed. Entries never
//! expire.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use thiserror::Error;

pub const NAMESPACE_SEPARATOR: char = ':';

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("cache lock poisoned")]
    Poisoned,
}

pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    /// Stores `value` with no expiry.
    fn forever(&self, key: &str, value: &str) -> Result<(), CacheStoreError>;

    /// Removes every entry in `namespace`. Succeeds when nothing is stored.
    fn flush_namespace(&self, namespace: &str) -> Result<(), CacheStoreError>;
}

/// Splits `key` into its namespace, if any, and the remainder.
fn split_key(key: &str) -> (Option<&str>, &str) {
    match key.split_once(NAMESPACE_SEPARATOR) {
        Some((namespace, rest)) => (Some(namespace), rest),
        None => (None, key),
    }
}

// == Memory Cache ==
/// In-process store shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        let entries = self.entries.read().map_err(|_| CacheStoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn forever(&self, key: &str, value: &str) -> Result<(), CacheStoreError> {
        let mut entries = self.entries.write().map_err(|_| CacheStoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn flush_namespace(&self, namespace: &str) -> Result<(), CacheStoreError> {
        let mut entries = self.entries.write().map_err(|_| CacheStoreError::Poisoned)?;
        entries.retain(|key, _| split_key(key).0 != Some(namespace));
        Ok(())
    }
}

// == File Cache ==
/// Directory-backed store that survives process restarts.
///
/// Layout: `{root}/{namespace}/{md5(rest)}.json`. Namespaces that are not
/// plain identifiers are hashed as well so they cannot escape `root`; the
/// `~` prefix keeps a hashed name apart from any plain one. Keys without a
/// namespace live directly in `root` as `{md5(key)}.json`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        let plain = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if plain {
            self.root.join(namespace)
        } else {
            self.root.join(format!("~{:x}", md5::compute(namespace.as_bytes())))
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let (namespace, rest) = split_key(key);
        let dir = match namespace {
            Some(namespace) => self.namespace_dir(namespace),
            None => self.root.clone(),
        };
        dir.join(format!("{:x}.json", md5::compute(rest.as_bytes())))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn forever(&self, key: &str, value: &str) -> Result<(), CacheStoreError> {
        let path = self.entry_path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        // Readers never observe a half-written entry.
        static NEXT_TMP: AtomicU64 = AtomicU64::new(0);
        let tmp = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            NEXT_TMP.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn flush_namespace(&self, namespace: &str) -> Result<(), CacheStoreError> {
        match fs::remove_dir_all(self.namespace_dir(namespace)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_namespaces(store: &dyn CacheStore) {
        store.forever("postcode-api:postcode.6545CA.29", "a").unwrap();
        store.forever("postcode-api:postcode.1011AB.1", "b").unwrap();
        store.forever("sessions:abc", "c").unwrap();
        store.forever("unprefixed", "d").unwrap();

        assert_eq!(
            store.get("postcode-api:postcode.6545CA.29").unwrap().as_deref(),
            Some("a")
        );

        store.flush_namespace("postcode-api").unwrap();

        assert_eq!(store.get("postcode-api:postcode.6545CA.29").unwrap(), None);
        assert_eq!(store.get("postcode-api:postcode.1011AB.1").unwrap(), None);
        assert_eq!(store.get("sessions:abc").unwrap().as_deref(), Some("c"));
        assert_eq!(store.get("unprefixed").unwrap().as_deref(), Some("d"));

        // idempotent
        store.flush_namespace("postcode-api").unwrap();
    }

    #[test]
    fn memory_cache_flushes_only_its_namespace() {
        let cache = MemoryCache::new();
        exercise_namespaces(&cache);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn memory_cache_overwrites() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        cache.forever("ns:key", "one").unwrap();
        cache.forever("ns:key", "two").unwrap();
        assert_eq!(cache.get("ns:key").unwrap().as_deref(), Some("two"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn file_cache_flushes_only_its_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        exercise_namespaces(&cache);
        assert!(!dir.path().join("postcode-api").exists());
        assert!(dir.path().join("sessions").exists());
    }

    #[test]
    fn file_cache_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FileCache::new(dir.path())
            .forever("postcode-api:postcode.6545CA.29", "{}")
            .unwrap();
        let reopened = FileCache::new(dir.path());
        assert_eq!(
            reopened.get("postcode-api:postcode.6545CA.29").unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn file_cache_flush_of_missing_root_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("never-created"));
        cache.flush_namespace("postcode-api").unwrap();
        assert_eq!(cache.get("postcode-api:anything").unwrap(), None);
    }

    #[test]
    fn file_cache_hashes_unsafe_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.forever("../escape:key", "x").unwrap();
        assert!(!dir.path().parent().unwrap().join("escape").exists());
        assert_eq!(cache.get("../escape:key").unwrap().as_deref(), Some("x"));
    }

    fn exercise_unscoped_keys(store: &dyn CacheStore) {
        store.forever("x", "bare").unwrap();
        store.forever("default:x", "scoped").unwrap();
        assert_eq!(store.get("x").unwrap().as_deref(), Some("bare"));
        assert_eq!(store.get("default:x").unwrap().as_deref(), Some("scoped"));

        store.flush_namespace("default").unwrap();
        assert_eq!(store.get("default:x").unwrap(), None);
        assert_eq!(store.get("x").unwrap().as_deref(), Some("bare"));

        store.flush_namespace("").unwrap();
        assert_eq!(store.get("x").unwrap().as_deref(), Some("bare"));
    }

    #[test]
    fn memory_cache_keeps_unscoped_keys_apart() {
        exercise_unscoped_keys(&MemoryCache::new());
    }

    #[test]
    fn file_cache_keeps_unscoped_keys_apart() {
        let dir = tempfile::tempdir().unwrap();
        exercise_unscoped_keys(&FileCache::new(dir.path()));
    }
}
