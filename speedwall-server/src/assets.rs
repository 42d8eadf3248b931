//! Binary asset storage
//!
//! The [`AssetStore`] trait is the seam to the blob store collaborator:
//! the saga in [`crate::infractions`] only ever calls `put`, `delete` and
//! `url_for`, and treats every failure as an opaque reason string. The
//! production implementation writes to the local filesystem; tests inject
//! doubles that fail on demand.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use speedwall_common::{Error, Result};

/// Number of random characters appended to generated storage keys
const KEY_SUFFIX_LEN: usize = 8;

/// Blob store collaborator contract
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `key`; overwriting an existing key is an error
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    /// Remove the object stored under `key`
    async fn delete(&self, key: &str) -> Result<()>;

    /// Public URL a viewer can fetch the object from
    async fn url_for(&self, key: &str) -> Result<String>;
}

/// Generate a fresh storage key for an uploaded file
///
/// Time prefix keeps keys roughly sorted on disk; the random suffix makes
/// collisions between retries or same-millisecond captures impossible in
/// practice. The original extension is preserved so the filesystem store
/// serves sensible content types.
pub fn generate_storage_key(filename: &str, now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_SUFFIX_LEN)
        .map(char::from)
        .collect();
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}-{}{}", now.format("%Y%m%dT%H%M%S%3f"), suffix, extension)
}

/// Filesystem-backed asset store
///
/// Objects live as flat files under the asset directory and are served
/// statically under `/assets/{key}`.
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Keys are opaque but must stay inside the asset directory
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(Error::StorageFailure(format!("malformed storage key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        let path = self.object_path(key)?;
        if path.exists() {
            return Err(Error::StorageFailure(format!("key already exists: {key}")));
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::StorageFailure(format!("write {}: {e}", path.display())))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::StorageFailure(format!("delete {}: {e}", path.display())))
    }

    async fn url_for(&self, key: &str) -> Result<String> {
        self.object_path(key)?;
        Ok(format!("/assets/{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn storage_keys_carry_time_prefix_and_extension() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 10, 30, 0).unwrap();
        let key = generate_storage_key("Capture.JPG", now);
        assert!(key.starts_with("20260801T103000"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn storage_keys_are_unique_per_attempt() {
        let now = Utc::now();
        let a = generate_storage_key("a.jpg", now);
        let b = generate_storage_key("a.jpg", now);
        assert_ne!(a, b);
    }

    #[test]
    fn storage_keys_without_extension_have_no_trailing_dot() {
        let key = generate_storage_key("photo", Utc::now());
        assert!(!key.contains('.'));
    }

    #[tokio::test]
    async fn fs_store_round_trips_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path().to_path_buf()).unwrap();

        store.put("k1.jpg", b"bytes", "image/jpeg").await.unwrap();
        assert!(dir.path().join("k1.jpg").exists());
        assert_eq!(store.url_for("k1.jpg").await.unwrap(), "/assets/k1.jpg");

        store.delete("k1.jpg").await.unwrap();
        assert!(!dir.path().join("k1.jpg").exists());
    }

    #[tokio::test]
    async fn fs_store_rejects_duplicate_keys_and_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path().to_path_buf()).unwrap();

        store.put("k1.jpg", b"bytes", "image/jpeg").await.unwrap();
        assert!(matches!(
            store.put("k1.jpg", b"other", "image/jpeg").await,
            Err(Error::StorageFailure(_))
        ));
        assert!(matches!(
            store.put("../escape.jpg", b"x", "image/jpeg").await,
            Err(Error::StorageFailure(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_missing_key_is_a_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path().to_path_buf()).unwrap();
        assert!(matches!(
            store.delete("missing.jpg").await,
            Err(Error::StorageFailure(_))
        ));
    }
}
