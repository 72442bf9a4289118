use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::Visibility;
use crate::error::{ErrorKind, StoreError};
use crate::storage::ObjectStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocalMetadata {
    size: u64,
    stored_at: u64,
    visibility: Option<Visibility>,
}

/// [`ObjectStore`] over a directory tree, one subdirectory per bucket.
///
/// ```text
/// <root>/<bucket>/objects/<key>
/// <root>/<bucket>/meta/<key>.json
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn objects_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket).join("objects")
    }

    fn data_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.objects_dir(bucket).join(key)
    }

    fn meta_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join("meta").join(format!("{}.json", key))
    }

    // Outside `objects/` so half-written uploads never show up in listings.
    fn staging_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(format!(".upload-{}", key))
    }

    fn check_key(key: &str) -> Result<(), StoreError> {
        if key.is_empty() || key == "." || key.contains(['/', '\\']) || key == ".." {
            return Err(StoreError::new(
                ErrorKind::InvalidKey,
                format!("key `{key}` cannot be stored on the local filesystem"),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(self.objects_dir(bucket)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = prefix.unwrap_or("");
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(prefix) {
                keys.push(name);
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<u8>, StoreError> {
        Self::check_key(key)?;
        match fs::read(self.data_path(bucket, key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(key))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        visibility: Option<Visibility>,
    ) -> Result<(), StoreError> {
        Self::check_key(key)?;
        fs::create_dir_all(self.objects_dir(bucket)).await?;
        fs::create_dir_all(self.root.join(bucket).join("meta")).await?;

        let meta = LocalMetadata {
            size: body.len() as u64,
            stored_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            visibility,
        };

        // Metadata goes first and the body is renamed into place, so a
        // listed object always has both.
        fs::write(self.meta_path(bucket, key), serde_json::to_vec(&meta)?).await?;
        let staging = self.staging_path(bucket, key);
        fs::write(&staging, body).await?;
        if let Err(e) = fs::rename(&staging, self.data_path(bucket, key)).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), StoreError> {
        Self::check_key(key)?;
        for path in [self.data_path(bucket, key), self.meta_path(bucket, key)] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.list_objects("b", None).await.unwrap().is_empty());

        store.put_object("b", "beta.txt", b"2".to_vec(), None).await.unwrap();
        store
            .put_object("b", "alpha.txt", b"1".to_vec(), Some(Visibility::Private))
            .await
            .unwrap();
        store.put_object("other", "alpha.txt", b"x".to_vec(), None).await.unwrap();

        assert_eq!(
            store.list_objects("b", None).await.unwrap(),
            vec!["alpha.txt", "beta.txt"]
        );
        assert_eq!(store.list_objects("b", Some("be")).await.unwrap(), vec!["beta.txt"]);
        assert_eq!(store.get_object("b", "alpha.txt").await.unwrap(), b"1");

        let meta: LocalMetadata = serde_json::from_slice(
            &std::fs::read(dir.path().join("b/meta/alpha.txt.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(meta.size, 1);
        assert_eq!(meta.visibility, Some(Visibility::Private));

        store.delete_object("b", "alpha.txt").await.unwrap();
        let err = store.get_object("b", "alpha.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(store.get_object("other", "alpha.txt").await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_failed_metadata_write_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("b/meta/k.txt.json")).unwrap();

        assert!(store.put_object("b", "k.txt", b"x".to_vec(), None).await.is_err());
        assert!(!dir.path().join("b/objects/k.txt").exists());
        assert!(store.list_objects("b", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.put_object("b", "k.txt", b"one".to_vec(), None).await.unwrap();
        store.put_object("b", "k.txt", b"two".to_vec(), None).await.unwrap();

        assert!(!dir.path().join("b/.upload-k.txt").exists());
        assert_eq!(store.get_object("b", "k.txt").await.unwrap(), b"two");
        assert_eq!(store.list_objects("b", None).await.unwrap(), vec!["k.txt"]);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(store.delete_object("b", "never-written").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_keys_with_separators() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store
            .put_object("b", "../escape", b"x".to_vec(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidKey);
        assert!(!dir.path().join("escape").exists());
    }
}
