//! Durable string key-value storage and the rate records kept in it

pub mod disk;
pub mod memory;
pub mod preferences;
pub mod rates;

use crate::core::error::Result;
use async_trait::async_trait;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use preferences::PairPreferences;
pub use rates::RateStore;

/// Get/set by string key. Writes replace the whole value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
}
