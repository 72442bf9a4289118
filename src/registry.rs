use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::manager::BucketManager;
use crate::storage::{ObjectStore, S3Store};

/// Lookup name of the default manager.
pub const SERVICE_NAME: &str = "s3-bucket-manager";

/// Lookup name of the manager for one configured bucket entry.
pub fn bucket_service_name(bucket: &str) -> String {
    format!("{SERVICE_NAME}.{bucket}")
}

/// Named [`BucketManager`] instances shared with the rest of an application.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, Arc<BucketManager>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from settings, connecting every bucket to S3.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register_from_settings(settings)?;
        Ok(registry)
    }

    /// Replaces any manager already registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, manager: Arc<BucketManager>) {
        let name = name.into();
        tracing::debug!(service = %name, bucket = manager.bucket(), "registered bucket manager");
        self.services.insert(name, manager);
    }

    pub fn get(&self, name: &str) -> Option<Arc<BucketManager>> {
        self.services.get(name).cloned()
    }

    pub fn default_manager(&self) -> Option<Arc<BucketManager>> {
        self.get(SERVICE_NAME)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Registers one S3-backed manager per bucket entry, plus the default
    /// bucket under [`SERVICE_NAME`].
    pub fn register_from_settings(&mut self, settings: &Settings) -> Result<()> {
        self.register_with(settings, |config| {
            let store = match settings.aws.endpoint.as_deref() {
                Some(endpoint) => S3Store::with_endpoint(config, endpoint)?,
                None => S3Store::new(config)?,
            };
            Ok(Arc::new(store))
        })
    }

    /// Same as [`register_from_settings`](Self::register_from_settings) with a
    /// caller-supplied store factory. Nothing is registered unless every
    /// bucket entry builds.
    pub fn register_with<F>(&mut self, settings: &Settings, mut make_store: F) -> Result<()>
    where
        F: FnMut(&crate::config::BucketConfig) -> Result<Arc<dyn ObjectStore>>,
    {
        settings.bucket(&settings.default_bucket)?;

        let mut pending = Vec::with_capacity(settings.buckets.len() + 1);
        for (entry, bucket) in &settings.buckets {
            let config = settings.bucket_config(entry)?;
            config.validate()?;
            let store = make_store(&config)?;

            let mut manager = BucketManager::with_store(config.bucket_name.clone(), store);
            if let Some(visibility) = bucket.visibility {
                manager = manager.with_visibility(visibility);
            }
            let manager = Arc::new(manager);

            if *entry == settings.default_bucket {
                pending.push((SERVICE_NAME.to_string(), Arc::clone(&manager)));
            }
            pending.push((bucket_service_name(entry), manager));
        }

        for (name, manager) in pending {
            self.register(name, manager);
        }
        Ok(())
    }

    pub fn require(&self, name: &str) -> Result<Arc<BucketManager>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownBucket(name.to_string()))
    }
}
