//! Bucket-scoped object CRUD over Amazon S3.
//!
//! A [`BucketManager`] wraps one bucket of an [`ObjectStore`] and exposes
//! list / get / create / update / delete. Names are sanitized before they
//! become keys, and remote failures are logged through an [`EventSink`] and
//! returned as values instead of propagating.

pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod registry;
pub mod sanitize;
pub mod storage;

pub use config::{BucketConfig, Settings, Visibility};
pub use error::{Error, ErrorKind, Result, StoreError};
pub use events::{Event, EventSink, Level, MemorySink, TracingSink};
pub use manager::{BucketManager, Confirmation, Operation, OperationError, OperationResult};
pub use registry::{ServiceRegistry, SERVICE_NAME};
pub use sanitize::sanitize_file_name;
pub use storage::{LocalStore, MemoryStore, ObjectStore, S3Store};
