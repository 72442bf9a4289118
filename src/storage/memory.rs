use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::Visibility;
use crate::error::StoreError;
use crate::storage::ObjectStore;

/// One call seen by a [`MemoryStore`], in the order it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List { bucket: String, prefix: Option<String> },
    Get { bucket: String, key: String },
    Put { bucket: String, key: String, body: Vec<u8>, visibility: Option<Visibility> },
    Delete { bucket: String, key: String },
}

#[derive(Debug, Default)]
struct Inner {
    buckets: HashMap<String, BTreeMap<String, Vec<u8>>>,
    calls: Vec<StoreCall>,
    failure: Option<StoreError>,
}

/// In-process [`ObjectStore`]. Keys list in lexicographic order, like S3.
///
/// Cloning yields a handle to the same objects, so a test can keep one
/// clone for inspection while the manager owns another.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object without recording a call.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.inner
            .write()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.inner
            .read()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.read().calls.clone()
    }

    /// Makes every subsequent call fail with `error` until cleared.
    pub fn fail_with(&self, error: StoreError) {
        self.inner.write().failure = Some(error);
    }

    pub fn clear_failure(&self) {
        self.inner.write().failure = None;
    }

    fn begin(&self, call: StoreCall) -> Result<parking_lot::RwLockWriteGuard<'_, Inner>, StoreError> {
        let mut inner = self.inner.write();
        inner.calls.push(call);
        if let Some(err) = inner.failure.clone() {
            return Err(err);
        }
        Ok(inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let inner = self.begin(StoreCall::List {
            bucket: bucket.to_string(),
            prefix: prefix.map(str::to_owned),
        })?;
        let prefix = prefix.unwrap_or("");
        Ok(inner
            .buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|key| key.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<u8>, StoreError> {
        let inner = self.begin(StoreCall::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        visibility: Option<Visibility>,
    ) -> Result<(), StoreError> {
        let mut inner = self.begin(StoreCall::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body.clone(),
            visibility,
        })?;
        inner
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body);
        Ok(())
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.begin(StoreCall::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        if let Some(objects) = inner.buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }
}
