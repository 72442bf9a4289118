use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{BucketConfig, Visibility};
use crate::error::{ErrorKind, Result, StoreError};
use crate::events::{Event, EventSink, Level, TracingSink};
use crate::sanitize::sanitize_file_name;
use crate::storage::{ObjectStore, S3Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    fn success_text(self) -> &'static str {
        match self {
            Operation::List => "Files retrieved from S3 bucket",
            Operation::Get => "File content retrieved",
            Operation::Create => "File uploaded successfully",
            Operation::Update => "File updated successfully",
            Operation::Delete => "File deleted successfully",
        }
    }

    fn failure_text(self) -> &'static str {
        match self {
            Operation::List => "Error fetching files from S3 bucket",
            Operation::Get => "Error reading file",
            Operation::Create => "Error uploading file",
            Operation::Update => "Error updating file",
            Operation::Delete => "Error deleting file",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A write or delete that went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub operation: Operation,
    /// The name as the caller supplied it.
    pub file_name: String,
    /// The sanitized key that was sent to the store.
    pub key: String,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation.success_text(), self.file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    pub operation: Operation,
    pub file_name: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation.failure_text(), self.message)
    }
}

impl std::error::Error for OperationError {}

pub type OperationResult = std::result::Result<Confirmation, OperationError>;

/// CRUD over the objects of a single bucket.
///
/// Every method issues at most one call to the underlying [`ObjectStore`].
/// Failures are reported to the [`EventSink`] and then folded into the
/// return value; nothing panics or retries.
pub struct BucketManager {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    sink: Arc<dyn EventSink>,
    visibility: Option<Visibility>,
}

impl fmt::Debug for BucketManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketManager")
            .field("bucket", &self.bucket)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

impl BucketManager {
    /// Connects to S3 with the given credentials. Only an invalid config fails.
    pub fn new(config: BucketConfig) -> Result<Self> {
        let store = S3Store::new(&config)?;
        Ok(Self::with_store(config.bucket_name, Arc::new(store)))
    }

    pub fn with_store(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            sink: Arc::new(TracingSink),
            visibility: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Canned ACL sent with every upload.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility
    }

    /// Keys under `prefix`. Returns an empty list when the listing fails.
    pub async fn list_files(&self, prefix: Option<&str>) -> Vec<String> {
        self.try_list_files(prefix).await.unwrap_or_default()
    }

    /// Like [`list_files`](Self::list_files), but a failed listing is an
    /// `Err` rather than an empty list.
    pub async fn try_list_files(
        &self,
        prefix: Option<&str>,
    ) -> std::result::Result<Vec<String>, OperationError> {
        match self.store.list_objects(&self.bucket, prefix).await {
            Ok(keys) => {
                self.info(
                    Operation::List,
                    prefix.map(str::to_owned),
                    format!("{}: {}", Operation::List.success_text(), keys.join(", ")),
                );
                Ok(keys)
            }
            Err(err) => Err(self.fail(Operation::List, None, err)),
        }
    }

    /// Object body, or `None` on any failure including a missing key.
    pub async fn get_file(&self, file_name: &str) -> Option<Vec<u8>> {
        self.try_get_file(file_name).await.ok().flatten()
    }

    /// `Ok(None)` when the key does not exist, `Err` for every other failure.
    /// The failure is logged either way.
    pub async fn try_get_file(
        &self,
        file_name: &str,
    ) -> std::result::Result<Option<Vec<u8>>, OperationError> {
        let key = self.object_key(Operation::Get, file_name)?;
        match self.store.get_object(&self.bucket, &key).await {
            Ok(body) => {
                self.info(
                    Operation::Get,
                    Some(key),
                    format!("{}: {}", Operation::Get.success_text(), file_name),
                );
                Ok(Some(body))
            }
            Err(err) => {
                let not_found = err.kind == ErrorKind::NotFound;
                let err = self.fail(Operation::Get, Some(file_name), err);
                if not_found {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Uploads `content`, replacing any object already at the key.
    pub async fn create_file(&self, file_name: &str, content: impl Into<Vec<u8>>) -> OperationResult {
        self.put(Operation::Create, file_name, content.into()).await
    }

    /// Identical to [`create_file`](Self::create_file) apart from the wording.
    pub async fn update_file(&self, file_name: &str, content: impl Into<Vec<u8>>) -> OperationResult {
        self.put(Operation::Update, file_name, content.into()).await
    }

    /// Removes the object. A key that does not exist is still a success.
    pub async fn delete_file(&self, file_name: &str) -> OperationResult {
        let key = self.object_key(Operation::Delete, file_name)?;
        match self.store.delete_object(&self.bucket, &key).await {
            Ok(()) => Ok(self.confirm(Operation::Delete, file_name, key)),
            Err(err) => Err(self.fail(Operation::Delete, Some(file_name), err)),
        }
    }

    async fn put(&self, operation: Operation, file_name: &str, content: Vec<u8>) -> OperationResult {
        let key = self.object_key(operation, file_name)?;
        match self
            .store
            .put_object(&self.bucket, &key, content, self.visibility)
            .await
        {
            Ok(()) => Ok(self.confirm(operation, file_name, key)),
            Err(err) => Err(self.fail(operation, Some(file_name), err)),
        }
    }

    fn object_key(
        &self,
        operation: Operation,
        file_name: &str,
    ) -> std::result::Result<String, OperationError> {
        let key = sanitize_file_name(file_name);
        if key.is_empty() {
            let err = StoreError::new(
                ErrorKind::InvalidKey,
                format!("file name `{file_name}` is empty after sanitization"),
            );
            return Err(self.fail(operation, Some(file_name), err));
        }
        Ok(key)
    }

    fn confirm(&self, operation: Operation, file_name: &str, key: String) -> Confirmation {
        let confirmation = Confirmation {
            operation,
            file_name: file_name.to_string(),
            key,
        };
        self.info(operation, Some(confirmation.key.clone()), confirmation.to_string());
        confirmation
    }

    fn info(&self, operation: Operation, key: Option<String>, message: String) {
        self.sink.record(Event {
            level: Level::Info,
            operation,
            bucket: self.bucket.clone(),
            key,
            message,
        });
    }

    fn fail(&self, operation: Operation, file_name: Option<&str>, err: StoreError) -> OperationError {
        let error = OperationError {
            operation,
            file_name: file_name.map(str::to_owned),
            kind: err.kind,
            message: err.message,
        };
        self.sink.record(Event {
            level: Level::Error,
            operation,
            bucket: self.bucket.clone(),
            key: file_name.map(sanitize_file_name),
            message: error.to_string(),
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::storage::{MemoryStore, StoreCall};

    fn manager() -> (BucketManager, MemoryStore, MemorySink) {
        let store = MemoryStore::new();
        let sink = MemorySink::new();
        let manager = BucketManager::with_store("test-bucket", Arc::new(store.clone()))
            .with_sink(Arc::new(sink.clone()));
        (manager, store, sink)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = BucketConfig::new("", "key", "secret", "bucket");
        assert!(BucketManager::new(config).is_err());
    }

    #[test]
    fn test_new_uses_configured_bucket() {
        let config = BucketConfig::new("us-east-1", "key", "secret", "test-bucket");
        let manager = BucketManager::new(config).unwrap();
        assert_eq!(manager.bucket(), "test-bucket");
        assert_eq!(manager.visibility(), None);
    }

    #[tokio::test]
    async fn test_keys_are_sanitized_before_reaching_store() {
        let (manager, store, _) = manager();
        manager.create_file("../secret/../plan.txt", "x").await.unwrap();
        manager.get_file("..\\secretplan.txt").await;
        manager.delete_file("/secretplan.txt").await.unwrap();

        let keys: Vec<String> = store
            .calls()
            .into_iter()
            .map(|call| match call {
                StoreCall::Put { key, .. } | StoreCall::Get { key, .. } | StoreCall::Delete { key, .. } => key,
                StoreCall::List { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(keys, vec!["secretplan.txt"; 3]);
    }

    #[tokio::test]
    async fn test_confirmation_keeps_caller_name() {
        let (manager, _, sink) = manager();
        let confirmation = manager.create_file("a/b.txt", "x").await.unwrap();
        assert_eq!(confirmation.file_name, "a/b.txt");
        assert_eq!(confirmation.key, "ab.txt");
        assert_eq!(confirmation.to_string(), "File uploaded successfully: a/b.txt");
        assert_eq!(sink.events()[0].message, "File uploaded successfully: a/b.txt");
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected_without_store_call() {
        let (manager, store, sink) = manager();
        let err = manager.create_file("..", "x").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidKey);
        assert_eq!(manager.get_file("/").await, None);
        assert!(store.calls().is_empty());
        assert_eq!(sink.errors().len(), 2);
    }

    #[tokio::test]
    async fn test_visibility_is_sent_with_uploads() {
        let (manager, store, _) = manager();
        let manager = manager.with_visibility(Visibility::PublicRead);
        manager.update_file("f.txt", "x").await.unwrap();
        assert!(matches!(
            store.calls().as_slice(),
            [StoreCall::Put { visibility: Some(Visibility::PublicRead), .. }]
        ));
    }

    #[tokio::test]
    async fn test_try_get_file_separates_missing_from_failure() {
        let (manager, store, sink) = manager();
        assert_eq!(manager.try_get_file("nope.txt").await, Ok(None));
        assert_eq!(sink.errors().len(), 1);

        store.fail_with(StoreError::new(ErrorKind::AccessDenied, "Access Denied"));
        let err = manager.try_get_file("nope.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
        assert_eq!(err.to_string(), "Error reading file: Access Denied");
        assert_eq!(manager.get_file("nope.txt").await, None);
    }

    #[tokio::test]
    async fn test_try_list_files_reports_failure() {
        let (manager, store, _) = manager();
        store.fail_with(StoreError::new(ErrorKind::Network, "connection reset"));
        let err = manager.try_list_files(Some("logs")).await.unwrap_err();
        assert_eq!(err.operation, Operation::List);
        assert_eq!(err.file_name, None);
        assert_eq!(err.to_string(), "Error fetching files from S3 bucket: connection reset");
    }

    #[tokio::test]
    async fn test_write_failures_carry_operation_text() {
        let (manager, store, _) = manager();
        store.fail_with(StoreError::new(ErrorKind::Service, "boom"));

        let create = manager.create_file("f", "x").await.unwrap_err();
        let update = manager.update_file("f", "x").await.unwrap_err();
        let delete = manager.delete_file("f").await.unwrap_err();

        assert_eq!(create.to_string(), "Error uploading file: boom");
        assert_eq!(update.to_string(), "Error updating file: boom");
        assert_eq!(delete.to_string(), "Error deleting file: boom");
        assert_eq!(delete.file_name.as_deref(), Some("f"));
    }
}
