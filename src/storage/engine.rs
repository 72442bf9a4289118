use async_trait::async_trait;

use crate::config::Visibility;
use crate::error::StoreError;

/// The raw object operations a bucket manager sits on top of.
///
/// Implementations issue exactly one backend call per method and report
/// failures as [`StoreError`]; they never retry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Keys under `prefix`, in backend order. An empty bucket is `Ok(vec![])`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StoreError>;

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<u8>, StoreError>;

    /// Unconditionally replaces whatever is stored at `key`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        visibility: Option<Visibility>,
    ) -> Result<(), StoreError>;

    /// Succeeds whether or not `key` exists.
    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), StoreError>;
}
