//! Module of MemStorage, the key/value store backing a node's owned keys.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
pub use crate::storage::memory::MemStorage;

/// Predicate selecting keys in [KvStorageInterface::take_where].
pub type KeyFilter<'a, K> = &'a (dyn Fn(&K) -> bool + Send + Sync);

/// Key value storage interface
#[async_trait]
pub trait KvStorageInterface<K, V> {
    /// Get an entry by `key`.
    async fn get(&self, key: &K) -> Result<Option<V>>;

    /// Put `value` under `key`, replacing any previous value.
    async fn put(&self, key: &K, value: &V) -> Result<()>;

    /// Copy of all entries.
    async fn get_all(&self) -> Result<Vec<(K, V)>>;

    /// Remove an entry by `key`.
    async fn remove(&self, key: &K) -> Result<()>;

    /// Remove and return every entry whose key matches `filter`.
    async fn take_where(&self, filter: KeyFilter<'_, K>) -> Result<Vec<(K, V)>>;

    /// Delete all values.
    async fn clear(&self) -> Result<()>;

    /// Get the current storage usage.
    async fn count(&self) -> Result<u32>;
}
