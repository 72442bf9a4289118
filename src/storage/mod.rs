pub mod engine;
pub mod local;
pub mod memory;
pub mod s3;

pub use engine::*;
pub use local::LocalStore;
pub use memory::{MemoryStore, StoreCall};
pub use s3::S3Store;
