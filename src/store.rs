//! object store abstraction consumed by the publisher and the builder
//!
//! the real store is an S3-like service owned by the excluded transport
//! layer; these traits capture the minimal surface the engine needs, with
//! an in-memory double for tests and dry runs and a directory-backed
//! implementation for local work.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hash::{digest_bytes, digest_file, ContentDigest};

/// write-side surface used by the publisher (its sole production caller)
pub trait ObjectStore {
    fn put(&mut self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()>;

    /// deleting an absent key is a no-op, so teardown is idempotent
    fn delete(&mut self, bucket: &str, key: &str) -> Result<()>;

    /// content digest of the stored object, or None if absent; this is the
    /// change-detection input for idempotent publishing
    fn digest(&self, bucket: &str, key: &str) -> Result<Option<ContentDigest>>;
}

/// read-side capability the package builder fetches declared sources from
pub trait SourceStore {
    fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// in-memory store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: BTreeMap<(String, String), Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<&[u8]> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|b| b.as_slice())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for MemoryStore {
    fn put(&mut self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        self.objects
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, bucket: &str, key: &str) -> Result<()> {
        self.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn digest(&self, bucket: &str, key: &str) -> Result<Option<ContentDigest>> {
        Ok(self.object(bucket, key).map(digest_bytes))
    }
}

impl SourceStore for MemoryStore {
    fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.object(bucket, key)
            .map(|b| b.to_vec())
            .ok_or_else(|| Error::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

/// directory-backed store: one directory per bucket, keys as relative paths
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    fn upload_error(bucket: &str, key: &str, source: std::io::Error) -> Error {
        Error::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: source.to_string(),
        }
    }
}

impl ObjectStore for DirStore {
    fn put(&mut self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::upload_error(bucket, key, e))?;
        }
        fs::write(&path, bytes).map_err(|e| Self::upload_error(bucket, key, e))
    }

    fn delete(&mut self, bucket: &str, key: &str) -> Result<()> {
        match fs::remove_file(self.object_path(bucket, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::upload_error(bucket, key, e)),
        }
    }

    fn digest(&self, bucket: &str, key: &str) -> Result<Option<ContentDigest>> {
        let path = self.object_path(bucket, key);
        if !path.is_file() {
            return Ok(None);
        }
        digest_file(&path).map(Some)
    }
}

impl SourceStore for DirStore {
    fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(Self::upload_error(bucket, key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();

        store.put("bucket", "path/to/key", b"payload").unwrap();
        assert!(store.contains("bucket", "path/to/key"));
        assert_eq!(
            store.digest("bucket", "path/to/key").unwrap(),
            Some(digest_bytes(b"payload"))
        );

        store.delete("bucket", "path/to/key").unwrap();
        assert!(!store.contains("bucket", "path/to/key"));
        assert_eq!(store.digest("bucket", "path/to/key").unwrap(), None);
    }

    #[test]
    fn test_memory_store_fetch_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.fetch("bucket", "missing"),
            Err(Error::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn test_dir_store_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::new(dir.path());

        store.put("bucket", "nested/key.bin", b"payload").unwrap();
        assert_eq!(
            store.digest("bucket", "nested/key.bin").unwrap(),
            Some(digest_bytes(b"payload"))
        );
        assert_eq!(store.fetch("bucket", "nested/key.bin").unwrap(), b"payload");

        store.delete("bucket", "nested/key.bin").unwrap();
        assert_eq!(store.digest("bucket", "nested/key.bin").unwrap(), None);
    }

    #[test]
    fn test_dir_store_delete_missing_is_noop() {
        let dir = tempdir().unwrap();
        let mut store = DirStore::new(dir.path());

        assert!(store.delete("bucket", "never-existed").is_ok());
    }

    #[test]
    fn test_dir_store_fetch_missing() {
        let dir = tempdir().unwrap();
        let store = DirStore::new(dir.path());

        assert!(matches!(
            store.fetch("bucket", "missing"),
            Err(Error::ObjectNotFound { .. })
        ));
    }
}
