//! Origin-scoped key-value storage areas.
//!
//! Values are opaque strings. Both backends can be given a byte quota; a write
//! that would exceed it fails with [`StorageError::QuotaExceeded`] and leaves
//! the area untouched.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage document at {} is not valid JSON: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },
}

pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self { items: HashMap::new(), quota_bytes: Some(quota_bytes) }
    }

    fn used_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota_bytes {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

/// One JSON document per origin, holding a flat object of string values.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), quota_bytes: None }
    }

    /// Storage area for the origin of `server_url`. URLs that differ only
    /// in path, host case or an explicit default port share one file.
    pub fn for_origin(dir: &Path, server_url: &str) -> Self {
        Self::new(dir.join(format!("{}.json", sanitize_origin(&origin_of(server_url)))))
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(StorageError::Io { path: self.path.clone(), source }),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|source| StorageError::Document { path: self.path.clone(), source })
    }

    fn write_document(&self, doc: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string(doc)
            .map_err(|source| StorageError::Document { path: self.path.clone(), source })?;
        if let Some(limit) = self.quota_bytes {
            if content.len() > limit {
                return Err(StorageError::QuotaExceeded { needed: content.len(), limit });
            }
        }
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)
                    .map_err(|source| StorageError::Io { path: dir.to_path_buf(), source })?;
            }
        }
        fs::write(&self.path, content)
            .map_err(|source| StorageError::Io { path: self.path.clone(), source })
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut doc = self.read_document()?;
        doc.insert(key.to_owned(), value.to_owned());
        self.write_document(&doc)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let mut doc = self.read_document()?;
        if doc.remove(key).is_some() {
            self.write_document(&doc)?;
        }
        Ok(())
    }
}

/// `scheme://host[:port]` with a lowercased host and no default port.
/// Unparseable or opaque URLs are used as given.
pub fn origin_of(server_url: &str) -> String {
    let trimmed = server_url.trim();
    match reqwest::Url::parse(trimmed) {
        Ok(url) if url.origin().is_tuple() => url.origin().ascii_serialization(),
        _ => trimmed.to_string(),
    }
}

/// Turns `http://127.0.0.1:5000/` into `http_127.0.0.1_5000`.
pub fn sanitize_origin(origin: &str) -> String {
    let trimmed = origin.trim().trim_end_matches('/');
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_origin() {
        assert_eq!(sanitize_origin("http://127.0.0.1:5000/"), "http_127.0.0.1_5000");
        assert_eq!(sanitize_origin("https://recipes.example.com"), "https_recipes.example.com");
        assert_eq!(sanitize_origin("  "), "default");
    }

    #[test]
    fn test_origin_of_normalizes() {
        assert_eq!(origin_of("http://LOCALHOST:5000/app"), "http://localhost:5000");
        assert_eq!(origin_of("http://localhost:80"), "http://localhost");
        assert_eq!(origin_of("https://recipes.example.com:443/"), "https://recipes.example.com");
        assert_eq!(origin_of("not a url"), "not a url");
    }

    #[test]
    fn test_same_origin_urls_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = FileStorage::for_origin(dir.path(), "http://localhost:5000");
        for url in ["http://LOCALHOST:5000", "http://localhost:5000/app", "http://localhost:5000/"] {
            assert_eq!(FileStorage::for_origin(dir.path(), url).path(), base.path());
        }
        assert_eq!(
            FileStorage::for_origin(dir.path(), "http://localhost").path(),
            FileStorage::for_origin(dir.path(), "http://localhost:80").path(),
        );

        let mut writer = FileStorage::for_origin(dir.path(), "http://localhost:5000/app");
        writer.set_item("k", "v").unwrap();
        assert_eq!(base.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_quota_rejects_and_keeps_old_value() {
        let mut storage = MemoryStorage::with_quota(16);
        storage.set_item("k", "short").unwrap();
        let err = storage.set_item("k", "this value is far too long").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 16, .. }));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("short"));
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::for_origin(dir.path(), "http://localhost:5000");
        assert_eq!(storage.get_item("anything").unwrap(), None);
    }

    #[test]
    fn test_file_storage_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::for_origin(dir.path(), "http://localhost:5000");
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        storage.remove_item("a").unwrap();

        let reopened = FileStorage::for_origin(dir.path(), "http://localhost:5000");
        assert_eq!(reopened.get_item("a").unwrap(), None);
        assert_eq!(reopened.get_item("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_storage_origins_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut one = FileStorage::for_origin(dir.path(), "http://localhost:5000");
        let two = FileStorage::for_origin(dir.path(), "http://localhost:8080");
        one.set_item("k", "v").unwrap();
        assert_eq!(two.get_item("k").unwrap(), None);
    }
}
